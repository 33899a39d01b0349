pub mod categorize;
pub mod gift;
pub mod matcher;
pub mod notes;
pub mod run;

pub use categorize::{categorize, Outcome, GIFT_CATEGORY};
pub use gift::is_gift;
pub use matcher::OrderPool;
pub use notes::{compose_note, ComposedNote, MAX_NOTE_LEN};
pub use run::{Reconciler, RunConfig, RunReport, TransactionPager, PAGE_SIZE};
