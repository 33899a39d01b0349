use chrono::NaiveDate;

use super::money::Money;

/// A single purchase from the merchant's order-history export.
///
/// Parsed once per run; never modified afterwards. The matcher removes a
/// record from its working pool when a ledger transaction binds to it, so an
/// order is consumed by at most one transaction.
#[derive(Debug, Clone)]
pub struct OrderRecord {
    pub order_id: String,
    /// Semicolon-joined item titles as exported by the scraper.
    pub items: String,
    /// Merchant taxonomy path, e.g. "Toys & Games›Kids".
    pub category_path: String,
    /// Ship-to name. Empty or the literal "0" means unspecified.
    pub recipient: String,
    pub order_date: NaiveDate,
    pub total: Money,
    pub shipping: Money,
    pub refund: Money,
    pub tax: Money,
    pub gift: Money,
    /// Raw multi-payment text, an encoded sequence of (date, amount) pairs.
    /// Orders split across several card charges carry each charge amount
    /// somewhere in this string.
    pub payments: String,
}
