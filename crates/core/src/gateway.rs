use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use super::ledger::{Category, CategoryId, LedgerTransaction, TransactionId};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("ledger API returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("could not decode ledger response: {0}")]
    Decode(String),
}

/// Partial update applied to one transaction. `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionUpdate {
    pub category_id: Option<CategoryId>,
    pub notes: Option<String>,
}

impl TransactionUpdate {
    pub fn is_empty(&self) -> bool {
        self.category_id.is_none() && self.notes.is_none()
    }
}

/// Abstraction over the ledger service.
///
/// The engine only ever reads through this trait and writes one transaction
/// at a time; tests supply an in-memory implementation.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    async fn categories(&self) -> Result<Vec<Category>, GatewayError>;

    /// One page of transactions dated within `[start, end]`, starting at
    /// `offset`. A page shorter than `limit` is the last page.
    async fn transactions_page(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<LedgerTransaction>, GatewayError>;

    /// Returns whether the ledger reported the transaction as updated.
    async fn update_transaction(
        &self,
        id: TransactionId,
        update: &TransactionUpdate,
    ) -> Result<bool, GatewayError>;
}
