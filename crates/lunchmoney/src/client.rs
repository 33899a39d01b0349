use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::de::DeserializeOwned;

use concilio_core::{
    Category, GatewayError, LedgerGateway, LedgerTransaction, TransactionId, TransactionUpdate,
};

use crate::types::{
    CategoriesResponse, TransactionsResponse, UpdateBody, UpdateRequest, UpdateResponse,
};

const DEFAULT_BASE_URL: &str = "https://dev.lunchmoney.app/v1";

/// Lunch Money REST client. One instance per run; all calls are sequential.
pub struct LunchMoneyClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl LunchMoneyClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Point the client at a different host (test servers).
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, GatewayError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .query(query)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        let body = response.text().await.map_err(transport)?;
        if !status.is_success() {
            return Err(GatewayError::Api {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

fn transport(err: reqwest::Error) -> GatewayError {
    GatewayError::Transport(err.to_string())
}

#[async_trait]
impl LedgerGateway for LunchMoneyClient {
    async fn categories(&self) -> Result<Vec<Category>, GatewayError> {
        let response: CategoriesResponse = self.get_json("/categories", &[]).await?;
        Ok(response.categories.into_iter().map(Into::into).collect())
    }

    async fn transactions_page(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<LedgerTransaction>, GatewayError> {
        tracing::debug!(%start, %end, offset, "fetching transactions page");
        let response: TransactionsResponse = self
            .get_json(
                "/transactions",
                &[
                    ("start_date", start.to_string()),
                    ("end_date", end.to_string()),
                    ("offset", offset.to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        response
            .transactions
            .into_iter()
            .map(|t| t.into_domain())
            .collect()
    }

    async fn update_transaction(
        &self,
        id: TransactionId,
        update: &TransactionUpdate,
    ) -> Result<bool, GatewayError> {
        let url = format!("{}/transactions/{}", self.base_url, id);
        let body = UpdateRequest {
            transaction: UpdateBody {
                category_id: update.category_id.map(|c| c.0),
                notes: update.notes.as_deref(),
            },
        };

        let response = self
            .client
            .put(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        let text = response.text().await.map_err(transport)?;
        if !status.is_success() {
            return Err(GatewayError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: UpdateResponse =
            serde_json::from_str(&text).map_err(|e| GatewayError::Decode(e.to_string()))?;
        Ok(parsed.updated)
    }
}
