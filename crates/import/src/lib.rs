pub mod export;
pub mod rules;

pub use export::{load_orders, parse_export, ExportError};
pub use rules::{CategoryRule, RuleTable, RuleTableError, DEFAULT_RULES};
