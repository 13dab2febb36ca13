//! Ask (sell-side) order book
//!
//! Maintains sell orders sorted by price ascending (best ask first).
//! Uses BTreeMap for deterministic iteration order.

use std::collections::BTreeMap;
use types::ids::OrderId;
use types::numeric::Price;

use super::price_level::PriceLevel;

/// Ask (sell) side order book
///
/// Orders are sorted by price ascending, so the lowest ask is first.
/// At each price level, orders are maintained in FIFO order. Levels never
/// stay in the map once their last order leaves.
#[derive(Debug, Clone, Default)]
pub struct AskBook {
    /// Price levels sorted ascending (lowest price first)
    levels: BTreeMap<Price, PriceLevel>,
}

impl AskBook {
    /// Create a new empty ask book
    pub fn new() -> Self {
        Self {
            levels: BTreeMap::new(),
        }
    }

    /// Queue an order at the back of its price level, creating the level if needed
    pub fn insert(&mut self, order_id: OrderId, price: Price) {
        self.levels.entry(price).or_default().push_back(order_id);
    }

    /// Remove an order from the ask book
    ///
    /// Returns true if the order was found and removed
    pub fn remove(&mut self, order_id: OrderId, price: Price) -> bool {
        if let Some(level) = self.levels.get_mut(&price) {
            if level.remove(order_id) {
                if level.is_empty() {
                    self.levels.remove(&price);
                }
                return true;
            }
        }
        false
    }

    /// Send an order to the back of its level
    pub fn requeue(&mut self, order_id: OrderId, price: Price) -> bool {
        self.levels
            .get_mut(&price)
            .map_or(false, |level| level.requeue(order_id))
    }

    /// Queue position of an order within its level
    pub fn position(&self, order_id: OrderId, price: Price) -> Option<usize> {
        self.levels.get(&price)?.position(order_id)
    }

    /// Levels in priority order (lowest price first)
    pub fn levels(&self) -> impl Iterator<Item = (Price, &PriceLevel)> + '_ {
        self.levels.iter().map(|(price, level)| (*price, level))
    }

    /// The n-th best level (0 = best ask)
    pub fn nth_level(&self, n: usize) -> Option<(Price, &PriceLevel)> {
        self.levels().nth(n)
    }

    /// Get the best ask price
    pub fn best_ask_price(&self) -> Option<Price> {
        self.levels.keys().next().copied()
    }

    /// Check if the ask book is empty
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Get the total number of price levels
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }
}
