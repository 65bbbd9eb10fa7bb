//! Local order books kept by the ladder controller.
//!
//! Neither survives a restart. `TrackedBuys` is the controller's view of
//! its own resting buys; `ExecutedBuys` remembers which buy orders have
//! already been turned into a paired sell.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;

use super::trade::OrderId;

/// Buy orders this controller placed and still considers live: id → price.
#[derive(Debug, Clone, Default)]
pub struct TrackedBuys {
    orders: HashMap<OrderId, Decimal>,
}

impl TrackedBuys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly placed buy.
    pub fn insert(&mut self, id: OrderId, price: Decimal) {
        self.orders.insert(id, price);
    }

    /// Forget a buy. Returns its price if it was tracked.
    pub fn remove(&mut self, id: &str) -> Option<Decimal> {
        self.orders.remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.orders.contains_key(id)
    }

    pub fn price_of(&self, id: &str) -> Option<Decimal> {
        self.orders.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Tracked ids, in no particular order.
    pub fn ids(&self) -> impl Iterator<Item = &OrderId> {
        self.orders.keys()
    }

    /// Drop every buy that has been converted and is no longer resting
    /// on the venue. Returns the removed ids.
    ///
    /// Partially filled buys are still open, so they stay tracked until
    /// they leave the open-orders snapshot.
    pub fn prune_converted(
        &mut self,
        open_ids: &HashSet<&str>,
        executed: &ExecutedBuys,
    ) -> Vec<OrderId> {
        let done: Vec<OrderId> = self
            .orders
            .keys()
            .filter(|id| executed.contains(id) && !open_ids.contains(id.as_str()))
            .cloned()
            .collect();
        for id in &done {
            self.orders.remove(id);
        }
        done
    }
}

/// Buy order ids already converted into a sell.
///
/// An id goes in before the sell is attempted and never comes out, so a
/// fill produces at most one sell placement even if that placement fails.
#[derive(Debug, Clone, Default)]
pub struct ExecutedBuys {
    ids: HashSet<OrderId>,
}

impl ExecutedBuys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an order as converted. Returns `false` if it already was.
    pub fn mark(&mut self, id: &str) -> bool {
        if self.ids.contains(id) {
            return false;
        }
        self.ids.insert(id.to_string())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
