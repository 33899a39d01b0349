use concilio_core::OrderRecord;

/// Whether an order was bought for someone other than the account owners.
///
/// With no owner names configured there is nothing to compare against, so
/// nothing is a gift. A recipient of `"0"` is a scraper artifact meaning
/// "unspecified" and is treated like an empty field. Comparison is trimmed
/// and case-insensitive.
pub fn is_gift(order: &OrderRecord, owner_names: &[String]) -> bool {
    if owner_names.is_empty() {
        return false;
    }

    let recipient = order.recipient.trim();
    if recipient.is_empty() || recipient == "0" {
        return false;
    }

    !owner_names
        .iter()
        .any(|name| name.trim().eq_ignore_ascii_case(recipient))
}
