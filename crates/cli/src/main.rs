use anyhow::Context;
use chrono::{Duration, NaiveDate};
use clap::Parser;
use std::path::PathBuf;

use concilio_core::{CategorySuggester, LedgerGateway};
use concilio_engine::{OrderPool, Reconciler, RunConfig};
use concilio_import::{load_orders, RuleTable};
use concilio_lunchmoney::LunchMoneyClient;
use concilio_suggest::{OpenAiSuggester, SuggestConfig};

/// Reconcile a merchant order-history export against a Lunch Money ledger:
/// match charges to orders, assign categories, annotate with order ids.
#[derive(Debug, Parser)]
#[command(name = "concilio", version)]
struct Cli {
    /// Order-history export (delimited text) to reconcile against.
    #[arg(long)]
    file: PathBuf,

    /// Lunch Money API key.
    #[arg(long, env = "LUNCH_MONEY_API_KEY")]
    lunch_money_key: Option<String>,

    /// JSON mapping of category-path prefixes to ledger category names;
    /// replaces the bundled table. Declaration order is significant.
    #[arg(long)]
    mapping_file: Option<PathBuf>,

    /// Compute and log every update without touching the ledger.
    #[arg(long)]
    dry_run: bool,

    /// Account owner names; orders shipped to anyone else count as gifts.
    #[arg(long = "owner-names", num_args = 0..)]
    owner_names: Vec<String>,

    /// Name of the category the ledger's own rules park pending
    /// transactions in. Only transactions still carrying it are touched.
    #[arg(long)]
    default_category: String,

    /// Start of the ledger fetch window (default: earliest order date).
    #[arg(long)]
    start_date: Option<NaiveDate>,

    /// End of the ledger fetch window (default: latest order date plus two
    /// weeks, since card charges post after the order date).
    #[arg(long)]
    end_date: Option<NaiveDate>,
}

#[tokio::main]
async fn main() {
    init_logging();

    if let Err(err) = run(Cli::parse()).await {
        tracing::error!("{err:#}");
        std::process::exit(1);
    }
}

fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let api_key = cli.lunch_money_key.clone().context(
        "no Lunch Money API key; pass --lunch-money-key or set LUNCH_MONEY_API_KEY",
    )?;

    let gateway = LunchMoneyClient::new(api_key);
    let categories = gateway
        .categories()
        .await
        .context("fetching ledger categories")?;

    let default_category = categories
        .iter()
        .find(|c| c.name.eq_ignore_ascii_case(&cli.default_category))
        .map(|c| c.id)
        .with_context(|| format!("no ledger category named {:?}", cli.default_category))?;

    let table = match &cli.mapping_file {
        Some(path) => RuleTable::load(path)
            .with_context(|| format!("loading rule mapping {}", path.display()))?,
        None => RuleTable::builtin(),
    };
    tracing::debug!(rules = table.len(), "rule table ready");

    let orders = load_orders(&cli.file)
        .with_context(|| format!("loading order export {}", cli.file.display()))?;
    tracing::info!(orders = orders.len(), "order export loaded");

    let earliest = orders.iter().map(|o| o.order_date).min().context("empty order pool")?;
    let latest = orders.iter().map(|o| o.order_date).max().context("empty order pool")?;
    let (start, end) = fetch_window(earliest, latest, cli.start_date, cli.end_date);

    let suggester = std::env::var("OPENAI_API_KEY")
        .ok()
        .filter(|key| !key.is_empty())
        .map(|key| OpenAiSuggester::new(SuggestConfig::new(key)));
    match &suggester {
        Some(_) => tracing::info!("external categorizer enabled"),
        None => tracing::info!("no OPENAI_API_KEY, running on rules alone"),
    }

    let config = RunConfig {
        default_category,
        owner_names: cli.owner_names.clone(),
        dry_run: cli.dry_run,
        start,
        end,
    };

    let mut pool = OrderPool::new(orders);
    let reconciler = Reconciler::new(
        &gateway,
        &categories,
        &table,
        suggester.as_ref().map(|s| s as &dyn CategorySuggester),
        config,
    );
    let report = reconciler.run(&mut pool).await?;

    println!("{report}");
    Ok(())
}

fn fetch_window(
    earliest: NaiveDate,
    latest: NaiveDate,
    start_override: Option<NaiveDate>,
    end_override: Option<NaiveDate>,
) -> (NaiveDate, NaiveDate) {
    let start = start_override.unwrap_or(earliest);
    let end = end_override.unwrap_or(latest + Duration::days(14));
    (start, end)
}
