use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use super::ledger::Category;

#[derive(Debug, Error)]
pub enum SuggestError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("suggestion service returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("could not decode suggestion response: {0}")]
    Decode(String),
    #[error("suggestion service returned an empty reply")]
    EmptyReply,
}

/// One entry of the candidate-category array sent to the suggester.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateCategory {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

impl CandidateCategory {
    pub fn from_category(c: &Category) -> Self {
        CandidateCategory {
            id: c.id.0,
            name: c.name.clone(),
            description: c.description.clone(),
        }
    }
}

/// Abstraction over the external category-suggestion service.
///
/// Implementations return the service's raw reply text; the engine owns
/// parsing it, and anything that is not the expected `{"id": …, "summary":
/// …}` object degrades to an unresolved outcome rather than an error.
#[async_trait]
pub trait CategorySuggester: Send + Sync {
    async fn suggest(
        &self,
        items: &str,
        candidates: &[CandidateCategory],
    ) -> Result<String, SuggestError>;
}
