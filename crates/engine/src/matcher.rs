use chrono::NaiveDate;

use concilio_core::{Money, OrderRecord};

/// Working pool of orders not yet bound to a ledger transaction.
///
/// The pool is exclusively owned by the matcher for the duration of a run.
/// `take_match` removes the record it returns, so an order can never be
/// handed out twice.
#[derive(Debug)]
pub struct OrderPool {
    orders: Vec<OrderRecord>,
}

impl OrderPool {
    pub fn new(orders: Vec<OrderRecord>) -> Self {
        Self { orders }
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Find the best order for a ledger amount and date, removing it from
    /// the pool.
    ///
    /// An order is a candidate when its total equals the amount (value
    /// equality on two-decimal normalized amounts), or when its payments
    /// text contains the two-decimal rendering of the amount; the latter
    /// covers orders split across several card charges. Among candidates the
    /// one closest in days to the transaction date wins; ties keep the
    /// export's original order (stable sort).
    pub fn take_match(&mut self, amount: Money, date: NaiveDate) -> Option<OrderRecord> {
        let needle = amount.plain();

        let mut candidates: Vec<&OrderRecord> = self
            .orders
            .iter()
            .filter(|o| o.total == amount || o.payments.contains(&needle))
            .collect();

        if candidates.is_empty() {
            return None;
        }

        candidates.sort_by_key(|o| (date - o.order_date).num_days().abs());

        let order_id = candidates[0].order_id.clone();
        let idx = self.orders.iter().position(|o| o.order_id == order_id)?;
        Some(self.orders.remove(idx))
    }
}
