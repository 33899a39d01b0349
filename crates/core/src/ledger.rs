use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::money::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub i64);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryId(pub i64);

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A posted entry in the personal-finance ledger.
///
/// The ledger service is the source of truth; this is a read snapshot.
/// `category_id` and `notes` are the only fields the engine ever changes,
/// and only through an explicit update round-trip.
#[derive(Debug, Clone)]
pub struct LedgerTransaction {
    pub id: TransactionId,
    pub payee: String,
    pub amount: Money,
    pub date: NaiveDate,
    pub category_id: Option<CategoryId>,
    pub notes: Option<String>,
    pub is_group: bool,
    pub group_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    pub is_income: bool,
    pub exclude_from_budget: bool,
    pub archived: bool,
    pub is_group: bool,
}

impl Category {
    /// Whether this category may be offered to the external suggester or
    /// assigned by it. Income, archived, budget-excluded, and group
    /// categories are never assignment targets.
    pub fn is_assignable(&self) -> bool {
        !self.is_income && !self.exclude_from_budget && !self.archived && !self.is_group
    }
}
