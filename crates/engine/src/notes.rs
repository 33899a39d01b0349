/// Hard cap on annotation length; the ledger service truncates longer notes.
pub const MAX_NOTE_LEN: usize = 350;

#[derive(Debug, Clone, PartialEq)]
pub struct ComposedNote {
    pub text: String,
    /// False when the existing notes already mention the order id, since writing
    /// again would duplicate the annotation on every run.
    pub should_write: bool,
}

/// Build the annotation for a matched transaction.
///
/// The order id is prepended to whatever notes the transaction already
/// carries, and the suggester's summary (when present) is appended as a
/// sentence. The result is capped at `MAX_NOTE_LEN` characters.
pub fn compose_note(
    existing: Option<&str>,
    order_id: &str,
    summary: Option<&str>,
) -> ComposedNote {
    let existing = existing.unwrap_or_default();

    let mut text = format!("#{order_id} {existing}").trim().to_string();
    if let Some(summary) = summary {
        text.push_str(". ");
        text.push_str(summary);
    }
    if text.chars().count() > MAX_NOTE_LEN {
        text = text.chars().take(MAX_NOTE_LEN).collect();
    }

    ComposedNote {
        text,
        should_write: !existing.contains(order_id),
    }
}
