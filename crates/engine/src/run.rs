use chrono::NaiveDate;
use std::fmt;

use concilio_core::{
    Category, CategoryId, CategorySuggester, GatewayError, LedgerGateway, LedgerTransaction,
    OrderRecord, TransactionUpdate,
};
use concilio_import::RuleTable;

use crate::categorize::{categorize, Outcome};
use crate::matcher::OrderPool;
use crate::notes::compose_note;

pub const PAGE_SIZE: u64 = 100;

/// Sequential page producer over a ledger gateway.
///
/// Pages are fetched one at a time, in offset order; a page shorter than the
/// limit ends the sequence. Each run constructs a fresh pager, so the
/// sequence is restartable per call and testable against an in-memory
/// gateway.
pub struct TransactionPager<'a> {
    gateway: &'a dyn LedgerGateway,
    start: NaiveDate,
    end: NaiveDate,
    offset: u64,
    limit: u64,
    done: bool,
}

impl<'a> TransactionPager<'a> {
    pub fn new(gateway: &'a dyn LedgerGateway, start: NaiveDate, end: NaiveDate) -> Self {
        Self::with_page_size(gateway, start, end, PAGE_SIZE)
    }

    pub fn with_page_size(
        gateway: &'a dyn LedgerGateway,
        start: NaiveDate,
        end: NaiveDate,
        limit: u64,
    ) -> Self {
        Self {
            gateway,
            start,
            end,
            offset: 0,
            limit,
            done: false,
        }
    }

    pub async fn next_page(&mut self) -> Result<Option<Vec<LedgerTransaction>>, GatewayError> {
        if self.done {
            return Ok(None);
        }

        let page = self
            .gateway
            .transactions_page(self.start, self.end, self.offset, self.limit)
            .await?;

        if (page.len() as u64) < self.limit {
            self.done = true;
        }
        self.offset += page.len() as u64;

        if page.is_empty() {
            Ok(None)
        } else {
            Ok(Some(page))
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Only transactions still carrying this category are re-categorized.
    pub default_category: CategoryId,
    pub owner_names: Vec<String>,
    pub dry_run: bool,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Terminal-state counters for one pass over the ledger.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub fetched: usize,
    pub no_match: usize,
    pub already_categorized: usize,
    pub group_skipped: usize,
    pub applied: usize,
    pub apply_failed: usize,
    pub simulated: usize,
    pub unchanged: usize,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} fetched: {} applied, {} simulated, {} failed, {} unchanged, \
             {} unmatched, {} already categorized, {} group skips",
            self.fetched,
            self.applied,
            self.simulated,
            self.apply_failed,
            self.unchanged,
            self.no_match,
            self.already_categorized,
            self.group_skipped,
        )
    }
}

/// Drives one full pass: page through the ledger, and take each transaction
/// to a terminal state before the next one is looked at.
pub struct Reconciler<'a> {
    gateway: &'a dyn LedgerGateway,
    categories: &'a [Category],
    table: &'a RuleTable,
    suggester: Option<&'a dyn CategorySuggester>,
    config: RunConfig,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        gateway: &'a dyn LedgerGateway,
        categories: &'a [Category],
        table: &'a RuleTable,
        suggester: Option<&'a dyn CategorySuggester>,
        config: RunConfig,
    ) -> Self {
        Self {
            gateway,
            categories,
            table,
            suggester,
            config,
        }
    }

    pub async fn run(&self, pool: &mut OrderPool) -> Result<RunReport, GatewayError> {
        let mut report = RunReport::default();
        let mut pager = TransactionPager::new(self.gateway, self.config.start, self.config.end);

        while let Some(page) = pager.next_page().await? {
            for txn in &page {
                report.fetched += 1;
                self.process(pool, txn, &mut report).await;
            }
        }

        tracing::debug!(%report, "run complete");
        Ok(report)
    }

    async fn process(
        &self,
        pool: &mut OrderPool,
        txn: &LedgerTransaction,
        report: &mut RunReport,
    ) {
        // Matching comes first: the order is consumed by its transaction
        // even when a later check declines to touch the ledger.
        let Some(order) = pool.take_match(txn.amount, txn.date) else {
            tracing::info!(txn = %txn.id, payee = %txn.payee, amount = %txn.amount, "no matching order");
            report.no_match += 1;
            return;
        };
        tracing::debug!(txn = %txn.id, order = %order.order_id, "matched");

        if txn.category_id != Some(self.config.default_category) {
            tracing::info!(txn = %txn.id, order = %order.order_id, "already categorized, leaving as is");
            report.already_categorized += 1;
            return;
        }

        if txn.is_group || txn.group_id.is_some() {
            tracing::info!(txn = %txn.id, "group transaction, leaving as is");
            report.group_skipped += 1;
            return;
        }

        let outcome = categorize(
            &order,
            self.table,
            &self.config.owner_names,
            self.categories,
            self.suggester,
        )
        .await;
        let (category_id, summary) = self.resolve(&outcome, &order);

        let note = compose_note(txn.notes.as_deref(), &order.order_id, summary.as_deref());
        let update = TransactionUpdate {
            category_id,
            notes: note.should_write.then_some(note.text),
        };

        if update.is_empty() {
            tracing::debug!(txn = %txn.id, "nothing to change");
            report.unchanged += 1;
            return;
        }

        if self.config.dry_run {
            tracing::info!(
                txn = %txn.id,
                order = %order.order_id,
                category = ?update.category_id,
                "dry run, not updating"
            );
            report.simulated += 1;
            return;
        }

        match self.gateway.update_transaction(txn.id, &update).await {
            Ok(true) => {
                tracing::info!(txn = %txn.id, order = %order.order_id, "updated");
                report.applied += 1;
            }
            Ok(false) => {
                tracing::warn!(txn = %txn.id, "ledger did not accept the update");
                report.apply_failed += 1;
            }
            Err(err) => {
                tracing::warn!(txn = %txn.id, "update failed: {err}");
                report.apply_failed += 1;
            }
        }
    }

    /// Turn an outcome into the category to write and the summary to put in
    /// the note. `Gift` and `Rule` carry a category *name*; an unknown name
    /// is a record-level miss and the transaction gets a notes-only update.
    fn resolve(
        &self,
        outcome: &Outcome,
        order: &OrderRecord,
    ) -> (Option<CategoryId>, Option<String>) {
        match outcome {
            Outcome::Gift { target } | Outcome::Rule { target } => {
                let id = self
                    .categories
                    .iter()
                    .find(|c| c.name.eq_ignore_ascii_case(target))
                    .map(|c| c.id);
                if id.is_none() {
                    tracing::warn!(
                        order = %order.order_id,
                        category = %target,
                        "no ledger category named after the rule target"
                    );
                }
                (id, None)
            }
            Outcome::Suggested { category, summary } => (*category, Some(summary.clone())),
            Outcome::Unresolved => (None, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use concilio_core::{Money, TransactionId};
    use concilio_import::CategoryRule;
    use std::collections::HashSet;
    use std::sync::Mutex;

    struct StubGateway {
        transactions: Vec<LedgerTransaction>,
        updates: Mutex<Vec<(TransactionId, TransactionUpdate)>>,
        /// Transaction ids the ledger reports as not updated.
        reject: HashSet<i64>,
        /// Transaction ids whose update call errors outright.
        fail: HashSet<i64>,
    }

    impl StubGateway {
        fn new(transactions: Vec<LedgerTransaction>) -> Self {
            Self {
                transactions,
                updates: Mutex::new(Vec::new()),
                reject: HashSet::new(),
                fail: HashSet::new(),
            }
        }

        fn updates(&self) -> Vec<(TransactionId, TransactionUpdate)> {
            self.updates.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LedgerGateway for StubGateway {
        async fn categories(&self) -> Result<Vec<Category>, GatewayError> {
            Ok(Vec::new())
        }

        async fn transactions_page(
            &self,
            _start: NaiveDate,
            _end: NaiveDate,
            offset: u64,
            limit: u64,
        ) -> Result<Vec<LedgerTransaction>, GatewayError> {
            let from = (offset as usize).min(self.transactions.len());
            let to = (from + limit as usize).min(self.transactions.len());
            Ok(self.transactions[from..to].to_vec())
        }

        async fn update_transaction(
            &self,
            id: TransactionId,
            update: &TransactionUpdate,
        ) -> Result<bool, GatewayError> {
            if self.fail.contains(&id.0) {
                return Err(GatewayError::Transport("connection reset".to_string()));
            }
            self.updates.lock().unwrap().push((id, update.clone()));
            Ok(!self.reject.contains(&id.0))
        }
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn txn(id: i64, cents: i64, d: u32, category: Option<i64>) -> LedgerTransaction {
        LedgerTransaction {
            id: TransactionId(id),
            payee: "AMAZON MKTPLACE".to_string(),
            amount: Money::from_cents(cents),
            date: date(d),
            category_id: category.map(CategoryId),
            notes: None,
            is_group: false,
            group_id: None,
        }
    }

    fn order(id: &str, cents: i64, d: u32, category_path: &str) -> OrderRecord {
        OrderRecord {
            order_id: id.to_string(),
            items: "Building blocks".to_string(),
            category_path: category_path.to_string(),
            recipient: String::new(),
            order_date: date(d),
            total: Money::from_cents(cents),
            shipping: Money::zero(),
            refund: Money::zero(),
            tax: Money::zero(),
            gift: Money::zero(),
            payments: String::new(),
        }
    }

    fn category(id: i64, name: &str) -> Category {
        Category {
            id: CategoryId(id),
            name: name.to_string(),
            description: None,
            is_income: false,
            exclude_from_budget: false,
            archived: false,
            is_group: false,
        }
    }

    fn categories() -> Vec<Category> {
        vec![
            category(1, "Shopping"),
            category(5, "Gifts"),
            category(9, "Kids"),
        ]
    }

    fn table() -> RuleTable {
        RuleTable::new(vec![CategoryRule {
            prefix: "Toys & Games".to_string(),
            target: "Kids".to_string(),
        }])
    }

    fn config(dry_run: bool) -> RunConfig {
        RunConfig {
            default_category: CategoryId(1),
            owner_names: vec!["Alice".to_string()],
            dry_run,
            start: date(1),
            end: date(31),
        }
    }

    async fn run(
        gateway: &StubGateway,
        cats: &[Category],
        table: &RuleTable,
        pool: &mut OrderPool,
        cfg: RunConfig,
    ) -> RunReport {
        Reconciler::new(gateway, cats, table, None, cfg)
            .run(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn rule_match_applies_category_and_note() {
        let gateway = StubGateway::new(vec![txn(1, 4250, 10, Some(1))]);
        let cats = categories();
        let table = table();
        let mut pool = OrderPool::new(vec![order("O1", 4250, 9, "Toys & Games›Building Sets")]);

        let report = run(&gateway, &cats, &table, &mut pool, config(false)).await;

        assert_eq!(report.applied, 1);
        assert!(pool.is_empty());
        let updates = gateway.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].0, TransactionId(1));
        assert_eq!(updates[0].1.category_id, Some(CategoryId(9)));
        assert_eq!(updates[0].1.notes.as_deref(), Some("#O1"));
    }

    #[tokio::test]
    async fn dry_run_never_calls_update() {
        let gateway = StubGateway::new(vec![txn(1, 4250, 10, Some(1))]);
        let cats = categories();
        let table = table();
        let mut pool = OrderPool::new(vec![order("O1", 4250, 9, "Toys & Games›Building Sets")]);

        let report = run(&gateway, &cats, &table, &mut pool, config(true)).await;

        assert_eq!(report.simulated, 1);
        assert_eq!(report.applied, 0);
        assert!(gateway.updates().is_empty());
    }

    #[tokio::test]
    async fn already_categorized_is_reported_not_mutated() {
        // Carries "Groceries" (3) while the default is "Shopping" (1).
        let gateway = StubGateway::new(vec![txn(1, 4250, 10, Some(3))]);
        let cats = categories();
        let table = table();
        let mut pool = OrderPool::new(vec![order("O1", 4250, 9, "Toys & Games›Building Sets")]);

        let report = run(&gateway, &cats, &table, &mut pool, config(false)).await;

        assert_eq!(report.already_categorized, 1);
        assert!(gateway.updates().is_empty());
        // The order was still consumed by the pairing.
        assert!(pool.is_empty());
    }

    #[tokio::test]
    async fn group_transactions_are_never_mutated() {
        let mut grouped = txn(1, 4250, 10, Some(1));
        grouped.is_group = true;
        let gateway = StubGateway::new(vec![grouped]);
        let cats = categories();
        let table = table();
        let mut pool = OrderPool::new(vec![order("O1", 4250, 9, "Toys & Games›Building Sets")]);

        let report = run(&gateway, &cats, &table, &mut pool, config(false)).await;

        assert_eq!(report.group_skipped, 1);
        assert!(gateway.updates().is_empty());
    }

    #[tokio::test]
    async fn no_match_leaves_transaction_pending() {
        let gateway = StubGateway::new(vec![txn(1, 9999, 10, Some(1))]);
        let cats = categories();
        let table = table();
        let mut pool = OrderPool::new(vec![order("O1", 4250, 9, "Toys & Games›Building Sets")]);

        let report = run(&gateway, &cats, &table, &mut pool, config(false)).await;

        assert_eq!(report.no_match, 1);
        assert_eq!(pool.len(), 1);
        assert!(gateway.updates().is_empty());
    }

    #[tokio::test]
    async fn unresolved_outcome_still_writes_the_note() {
        let gateway = StubGateway::new(vec![txn(1, 4250, 10, Some(1))]);
        let cats = categories();
        let table = table();
        // No rule for this path, no suggester configured.
        let mut pool = OrderPool::new(vec![order("O1", 4250, 9, "Musical Instruments")]);

        let report = run(&gateway, &cats, &table, &mut pool, config(false)).await;

        assert_eq!(report.applied, 1);
        let updates = gateway.updates();
        assert_eq!(updates[0].1.category_id, None);
        assert_eq!(updates[0].1.notes.as_deref(), Some("#O1"));
    }

    #[tokio::test]
    async fn already_annotated_unresolved_transaction_is_unchanged() {
        let mut annotated = txn(1, 4250, 10, Some(1));
        annotated.notes = Some("#O1 last week".to_string());
        let gateway = StubGateway::new(vec![annotated]);
        let cats = categories();
        let table = table();
        let mut pool = OrderPool::new(vec![order("O1", 4250, 9, "Musical Instruments")]);

        let report = run(&gateway, &cats, &table, &mut pool, config(false)).await;

        assert_eq!(report.unchanged, 1);
        assert!(gateway.updates().is_empty());
    }

    #[tokio::test]
    async fn unknown_rule_target_falls_back_to_notes_only() {
        let gateway = StubGateway::new(vec![txn(1, 4250, 10, Some(1))]);
        // Ledger has no "Kids" category to resolve the rule target against.
        let cats = vec![category(1, "Shopping")];
        let table = table();
        let mut pool = OrderPool::new(vec![order("O1", 4250, 9, "Toys & Games›Building Sets")]);

        let report = run(&gateway, &cats, &table, &mut pool, config(false)).await;

        assert_eq!(report.applied, 1);
        let updates = gateway.updates();
        assert_eq!(updates[0].1.category_id, None);
        assert_eq!(updates[0].1.notes.as_deref(), Some("#O1"));
    }

    #[tokio::test]
    async fn gift_outcome_targets_the_gift_category() {
        let gateway = StubGateway::new(vec![txn(1, 4250, 10, Some(1))]);
        let cats = categories();
        let table = table();
        let mut gift_order = order("O1", 4250, 9, "Toys & Games›Building Sets");
        gift_order.recipient = "Grandma".to_string();
        let mut pool = OrderPool::new(vec![gift_order]);

        let report = run(&gateway, &cats, &table, &mut pool, config(false)).await;

        assert_eq!(report.applied, 1);
        assert_eq!(gateway.updates()[0].1.category_id, Some(CategoryId(5)));
    }

    #[tokio::test]
    async fn apply_failure_does_not_halt_the_batch() {
        let mut gateway = StubGateway::new(vec![
            txn(1, 4250, 10, Some(1)),
            txn(2, 1500, 11, Some(1)),
        ]);
        gateway.fail.insert(1);
        let cats = categories();
        let table = table();
        let mut pool = OrderPool::new(vec![
            order("O1", 4250, 9, "Toys & Games›Building Sets"),
            order("O2", 1500, 11, "Toys & Games›Puzzles"),
        ]);

        let report = run(&gateway, &cats, &table, &mut pool, config(false)).await;

        assert_eq!(report.apply_failed, 1);
        assert_eq!(report.applied, 1);
        assert_eq!(gateway.updates()[0].0, TransactionId(2));
    }

    #[tokio::test]
    async fn not_updated_reply_counts_as_failure() {
        let mut gateway = StubGateway::new(vec![txn(1, 4250, 10, Some(1))]);
        gateway.reject.insert(1);
        let cats = categories();
        let table = table();
        let mut pool = OrderPool::new(vec![order("O1", 4250, 9, "Toys & Games›Building Sets")]);

        let report = run(&gateway, &cats, &table, &mut pool, config(false)).await;

        assert_eq!(report.apply_failed, 1);
        assert_eq!(report.applied, 0);
    }

    #[tokio::test]
    async fn one_order_binds_at_most_one_transaction() {
        let gateway = StubGateway::new(vec![
            txn(1, 4250, 10, Some(1)),
            txn(2, 4250, 10, Some(1)),
        ]);
        let cats = categories();
        let table = table();
        let mut pool = OrderPool::new(vec![order("O1", 4250, 9, "Toys & Games›Building Sets")]);

        let report = run(&gateway, &cats, &table, &mut pool, config(false)).await;

        assert_eq!(report.applied, 1);
        assert_eq!(report.no_match, 1);
        assert_eq!(gateway.updates().len(), 1);
    }

    #[tokio::test]
    async fn pager_walks_pages_in_offset_order() {
        let gateway = StubGateway::new(vec![
            txn(1, 100, 10, Some(1)),
            txn(2, 100, 10, Some(1)),
            txn(3, 100, 10, Some(1)),
            txn(4, 100, 10, Some(1)),
            txn(5, 100, 10, Some(1)),
        ]);

        let mut pager = TransactionPager::with_page_size(&gateway, date(1), date(31), 2);
        let mut sizes = Vec::new();
        while let Some(page) = pager.next_page().await.unwrap() {
            sizes.push(page.len());
        }
        assert_eq!(sizes, vec![2, 2, 1]);
        assert!(pager.next_page().await.unwrap().is_none());

        // Restartable: a fresh pager produces the sequence again.
        let mut pager = TransactionPager::with_page_size(&gateway, date(1), date(31), 2);
        assert_eq!(pager.next_page().await.unwrap().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn pager_handles_exact_page_boundary() {
        let gateway = StubGateway::new(vec![txn(1, 100, 10, Some(1)), txn(2, 100, 10, Some(1))]);

        let mut pager = TransactionPager::with_page_size(&gateway, date(1), date(31), 2);
        assert_eq!(pager.next_page().await.unwrap().unwrap().len(), 2);
        // The follow-up fetch comes back empty and ends the sequence.
        assert!(pager.next_page().await.unwrap().is_none());
    }
}
