use std::path::Path;
use thiserror::Error;

/// One prefix rule: an order whose category path starts with `prefix` is
/// assigned the ledger category named `target`.
#[derive(Debug, Clone)]
pub struct CategoryRule {
    pub prefix: String,
    pub target: String,
}

#[derive(Error, Debug)]
pub enum RuleTableError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse rule mapping: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("rule mapping must be a flat JSON object")]
    NotAnObject,
    #[error("rule mapping value for {0:?} must be a string")]
    NonStringTarget(String),
}

/// Ordered prefix → category mapping. Declaration order is significant:
/// `lookup` returns the first declared prefix that matches, so a more
/// specific prefix must be listed before a broader one that also matches.
#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: Vec<CategoryRule>,
}

impl RuleTable {
    pub fn new(rules: Vec<CategoryRule>) -> Self {
        Self { rules }
    }

    /// The compiled-in default table, used when no mapping file is given.
    pub fn builtin() -> Self {
        Self::new(
            DEFAULT_RULES
                .iter()
                .map(|(prefix, target)| CategoryRule {
                    prefix: prefix.to_string(),
                    target: target.to_string(),
                })
                .collect(),
        )
    }

    /// Parse a flat JSON object of `{"<prefix>": "<target>"}` pairs,
    /// preserving declaration order.
    pub fn from_json(content: &str) -> Result<Self, RuleTableError> {
        let value: serde_json::Value = serde_json::from_str(content)?;
        let map = value.as_object().ok_or(RuleTableError::NotAnObject)?;

        let mut rules = Vec::with_capacity(map.len());
        for (prefix, target) in map {
            let target = target
                .as_str()
                .ok_or_else(|| RuleTableError::NonStringTarget(prefix.clone()))?;
            rules.push(CategoryRule {
                prefix: prefix.clone(),
                target: target.to_string(),
            });
        }

        Ok(Self::new(rules))
    }

    pub fn load(path: &Path) -> Result<Self, RuleTableError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// First-declared-match-wins prefix lookup.
    pub fn lookup(&self, category_path: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|r| category_path.starts_with(&r.prefix))
            .map(|r| r.target.as_str())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Default merchant-taxonomy → ledger-category mapping.
pub const DEFAULT_RULES: &[(&str, &str)] = &[
    ("Gift Card", "Gifts"),
    ("Grocery & Gourmet Food", "Groceries"),
    ("Health & Household", "Household"),
    ("Home & Kitchen", "Household"),
    ("Tools & Home Improvement", "Household"),
    ("Patio, Lawn & Garden", "Household"),
    ("Office Product", "Office Supplies"),
    ("Toys & Games", "Kids"),
    ("Baby Product", "Kids"),
    ("Clothing, Shoes & Jewelry", "Clothing"),
    ("Beauty & Personal Care", "Personal Care"),
    ("Pet Supplies", "Pets"),
    ("Electronics", "Electronics"),
    ("Computers & Accessories", "Electronics"),
    ("Books", "Books"),
    ("Kindle Store", "Books"),
    ("Digital Music", "Entertainment"),
    ("Movies & TV", "Entertainment"),
    ("Video Games", "Entertainment"),
    ("Sports & Outdoors", "Sports"),
    ("Automotive", "Auto"),
];
