//! Category suggestion via an OpenAI-compatible chat-completions endpoint.
//!
//! The suggester is handed the purchase's item text and the assignable
//! ledger categories, and is asked to reply with a bare JSON object
//! `{"id": <number>, "summary": "<string>"}`. Only the raw reply text is
//! returned here; the engine owns parsing and validation.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use concilio_core::{CandidateCategory, CategorySuggester, SuggestError};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone)]
pub struct SuggestConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl SuggestConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

pub struct OpenAiSuggester {
    config: SuggestConfig,
    client: Client,
}

impl OpenAiSuggester {
    pub fn new(config: SuggestConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }
}

fn build_prompt(items: &str, candidates: &[CandidateCategory]) -> String {
    let candidates_json = serde_json::json!(candidates).to_string();
    format!(
        "You assign a spending category to a purchase.\n\n\
         Purchase items:\n{items}\n\n\
         Candidate categories (JSON):\n{candidates_json}\n\n\
         Reply with only a JSON object of the form \
         {{\"id\": <category id number>, \"summary\": \"<what was bought, at most 80 characters>\"}} \
         and nothing else."
    )
}

fn extract_reply(response: ChatResponse) -> Result<String, SuggestError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(SuggestError::EmptyReply)
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ChatReplyMessage {
    content: Option<String>,
}

#[async_trait]
impl CategorySuggester for OpenAiSuggester {
    async fn suggest(
        &self,
        items: &str,
        candidates: &[CandidateCategory],
    ) -> Result<String, SuggestError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: build_prompt(items, candidates),
            }],
            temperature: 0.0,
        };

        let url = format!("{}/chat/completions", self.config.base_url);
        tracing::debug!(model = %self.config.model, "requesting category suggestion");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| SuggestError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SuggestError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(SuggestError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse =
            serde_json::from_str(&body).map_err(|e| SuggestError::Decode(e.to_string()))?;
        extract_reply(parsed)
    }
}
