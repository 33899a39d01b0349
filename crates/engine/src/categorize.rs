use serde::Deserialize;

use concilio_core::{CandidateCategory, Category, CategoryId, CategorySuggester, OrderRecord};
use concilio_import::RuleTable;

use crate::gift::is_gift;

/// Target category name for gift purchases.
pub const GIFT_CATEGORY: &str = "Gifts";

/// How a matched order was categorized. Precedence is fixed: gift beats the
/// rule table, the rule table beats the external suggester.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Gift { target: String },
    Rule { target: String },
    /// The suggester replied. `category` is `None` when the suggested id is
    /// not an assignable ledger category; the summary is still usable.
    Suggested {
        category: Option<CategoryId>,
        summary: String,
    },
    Unresolved,
}

/// The wire shape the suggester must reply with.
#[derive(Debug, Deserialize)]
struct SuggesterReply {
    id: i64,
    summary: String,
}

/// Derive a categorization outcome for one matched order.
///
/// The suggester, when configured, is only consulted after the gift rule and
/// the prefix table both decline. A reply that does not parse as the expected
/// JSON object degrades to `Unresolved`: no retry, no second table pass.
pub async fn categorize(
    order: &OrderRecord,
    table: &RuleTable,
    owner_names: &[String],
    categories: &[Category],
    suggester: Option<&dyn CategorySuggester>,
) -> Outcome {
    if is_gift(order, owner_names) {
        return Outcome::Gift {
            target: GIFT_CATEGORY.to_string(),
        };
    }

    if let Some(target) = table.lookup(&order.category_path) {
        return Outcome::Rule {
            target: target.to_string(),
        };
    }

    let Some(suggester) = suggester else {
        return Outcome::Unresolved;
    };

    let candidates: Vec<CandidateCategory> = categories
        .iter()
        .filter(|c| c.is_assignable())
        .map(CandidateCategory::from_category)
        .collect();

    let reply = match suggester.suggest(&order.items, &candidates).await {
        Ok(reply) => reply,
        Err(err) => {
            tracing::warn!(order = %order.order_id, "category suggestion failed: {err}");
            return Outcome::Unresolved;
        }
    };

    match serde_json::from_str::<SuggesterReply>(reply.trim()) {
        Ok(parsed) => {
            let category = candidates
                .iter()
                .any(|c| c.id == parsed.id)
                .then_some(CategoryId(parsed.id));
            if category.is_none() {
                tracing::debug!(
                    order = %order.order_id,
                    suggested = parsed.id,
                    "suggested id is not an assignable category"
                );
            }
            Outcome::Suggested {
                category,
                summary: parsed.summary,
            }
        }
        Err(err) => {
            tracing::warn!(order = %order.order_id, "unparseable suggester reply: {err}");
            Outcome::Unresolved
        }
    }
}
