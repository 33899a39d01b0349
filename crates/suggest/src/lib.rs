pub mod openai;

pub use openai::{OpenAiSuggester, SuggestConfig};
