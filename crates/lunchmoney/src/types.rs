//! Wire types for the Lunch Money REST API and their conversion into the
//! domain model. Amounts arrive as decimal strings ("42.5000").

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use concilio_core::{
    Category, CategoryId, GatewayError, LedgerTransaction, Money, TransactionId,
};

#[derive(Debug, Deserialize)]
pub(crate) struct CategoriesResponse {
    pub categories: Vec<ApiCategory>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiCategory {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_income: bool,
    #[serde(default)]
    pub exclude_from_budget: bool,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub is_group: bool,
}

impl From<ApiCategory> for Category {
    fn from(c: ApiCategory) -> Self {
        Category {
            id: CategoryId(c.id),
            name: c.name,
            description: c.description,
            is_income: c.is_income,
            exclude_from_budget: c.exclude_from_budget,
            archived: c.archived,
            is_group: c.is_group,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TransactionsResponse {
    pub transactions: Vec<ApiTransaction>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiTransaction {
    pub id: i64,
    pub date: NaiveDate,
    #[serde(default)]
    pub payee: String,
    pub amount: String,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub is_group: bool,
    #[serde(default)]
    pub group_id: Option<i64>,
}

impl ApiTransaction {
    pub(crate) fn into_domain(self) -> Result<LedgerTransaction, GatewayError> {
        let amount = Decimal::from_str(&self.amount).map_err(|_| {
            GatewayError::Decode(format!(
                "bad amount {:?} on transaction {}",
                self.amount, self.id
            ))
        })?;

        Ok(LedgerTransaction {
            id: TransactionId(self.id),
            payee: self.payee,
            amount: Money::from_decimal(amount),
            date: self.date,
            category_id: self.category_id.map(CategoryId),
            notes: self.notes,
            is_group: self.is_group,
            group_id: self.group_id,
        })
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct UpdateRequest<'a> {
    pub transaction: UpdateBody<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct UpdateBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpdateResponse {
    #[serde(default)]
    pub updated: bool,
}
