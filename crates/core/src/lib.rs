pub mod gateway;
pub mod ledger;
pub mod money;
pub mod order;
pub mod suggest;

pub use gateway::{GatewayError, LedgerGateway, TransactionUpdate};
pub use ledger::{Category, CategoryId, LedgerTransaction, TransactionId};
pub use money::Money;
pub use order::OrderRecord;
pub use suggest::{CandidateCategory, CategorySuggester, SuggestError};
