use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use concilio_core::{Money, OrderRecord};

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("missing required column: {0}")]
    MissingColumn(String),
    #[error("invalid date: {0}")]
    InvalidDate(String),
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("export contains no eligible order records")]
    NoEligibleRecords,
}

/// Column indices resolved from the normalized header row.
///
/// Header tokens are lowercased and have internal whitespace stripped before
/// matching, so "Order ID", "order id", and "OrderID" all map to `orderid`.
struct ColumnMap {
    order_id: usize,
    items: usize,
    category: usize,
    to: usize,
    date: usize,
    total: usize,
    shipping: usize,
    refund: usize,
    tax: usize,
    gift: usize,
    payments: usize,
}

impl ColumnMap {
    fn resolve(headers: &csv::StringRecord) -> Result<Self, ExportError> {
        let normalized: Vec<String> = headers.iter().map(normalize_header).collect();
        let find = |name: &str| -> Result<usize, ExportError> {
            normalized
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| ExportError::MissingColumn(name.to_string()))
        };

        Ok(ColumnMap {
            order_id: find("orderid")?,
            items: find("items")?,
            category: find("category")?,
            to: find("to")?,
            date: find("date")?,
            total: find("total")?,
            shipping: find("shipping")?,
            refund: find("refund")?,
            tax: find("tax")?,
            gift: find("gift")?,
            payments: find("payments")?,
        })
    }
}

fn normalize_header(h: &str) -> String {
    h.to_lowercase().split_whitespace().collect()
}

/// Read and parse an order-history export from disk.
pub fn load_orders(path: &Path) -> Result<Vec<OrderRecord>, ExportError> {
    let file = std::fs::File::open(path)?;
    parse_export(file)
}

/// Parse an order-history export.
///
/// Rows without an order id, rows that fail to parse, and rows with a zero
/// total and empty payments text are skipped (logged, never fatal). An export
/// that yields zero records after filtering is an error, as there is nothing to
/// reconcile against.
pub fn parse_export<R: Read>(data: R) -> Result<Vec<OrderRecord>, ExportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(data);

    let headers = reader.headers()?.clone();
    let cols = ColumnMap::resolve(&headers)?;

    let mut orders = Vec::new();
    for result in reader.records() {
        let record = result?;
        if record.is_empty() {
            continue;
        }

        let order_id = field(&record, cols.order_id).trim().to_string();
        if order_id.is_empty() {
            continue;
        }

        let order = match parse_row(&record, &cols, order_id) {
            Ok(order) => order,
            Err(err) => {
                tracing::warn!("skipping malformed export row: {err}");
                continue;
            }
        };

        if order.total.is_zero() && order.payments.trim().is_empty() {
            tracing::debug!(order_id = %order.order_id, "skipping order with no charge amounts");
            continue;
        }

        orders.push(order);
    }

    if orders.is_empty() {
        return Err(ExportError::NoEligibleRecords);
    }

    Ok(orders)
}

fn parse_row(
    record: &csv::StringRecord,
    cols: &ColumnMap,
    order_id: String,
) -> Result<OrderRecord, ExportError> {
    Ok(OrderRecord {
        order_id,
        items: field(record, cols.items).to_string(),
        category_path: field(record, cols.category).to_string(),
        recipient: field(record, cols.to).to_string(),
        order_date: parse_date(field(record, cols.date))?,
        total: parse_amount(field(record, cols.total))?,
        shipping: parse_amount(field(record, cols.shipping))?,
        refund: parse_amount(field(record, cols.refund))?,
        tax: parse_amount(field(record, cols.tax))?,
        gift: parse_amount(field(record, cols.gift))?,
        payments: field(record, cols.payments).to_string(),
    })
}

fn field<'a>(record: &'a csv::StringRecord, idx: usize) -> &'a str {
    record.get(idx).unwrap_or_default()
}

fn parse_date(s: &str) -> Result<NaiveDate, ExportError> {
    let s = s.trim();

    for fmt in &[
        "%Y-%m-%d", "%m/%d/%Y", "%m/%d/%y", "%d/%m/%Y", "%Y/%m/%d", "%m-%d-%Y",
    ] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(date);
        }
    }

    Err(ExportError::InvalidDate(s.to_string()))
}

/// Parse an export amount. Tolerates "$", thousands separators, and
/// accounting-style parentheses; an empty cell is a zero sub-amount.
fn parse_amount(s: &str) -> Result<Money, ExportError> {
    let s = s.trim();
    let (negative, s) = if s.starts_with('(') && s.ends_with(')') {
        (true, &s[1..s.len() - 1])
    } else {
        (false, s)
    };
    let s = s.replace([',', '$', ' '], "");
    if s.is_empty() {
        return Ok(Money::zero());
    }
    let mut dec =
        Decimal::from_str(&s).map_err(|_| ExportError::InvalidAmount(s.to_string()))?;
    if negative {
        dec = -dec;
    }
    Ok(Money::from_decimal(dec))
}
