//! Bid (buy-side) order book
//!
//! Maintains buy orders sorted by price descending (best bid first).
//! Uses BTreeMap for deterministic iteration order.

use std::collections::BTreeMap;
use types::ids::OrderId;
use types::numeric::Price;

use super::price_level::PriceLevel;

/// Bid (buy) side order book
///
/// Orders are sorted by price descending, so the highest bid is first.
/// At each price level, orders are maintained in FIFO order.
#[derive(Debug, Clone, Default)]
pub struct BidBook {
    /// Price levels; BTreeMap is ascending so priority order is reversed
    levels: BTreeMap<Price, PriceLevel>,
}

impl BidBook {
    /// Create a new empty bid book
    pub fn new() -> Self {
        Self {
            levels: BTreeMap::new(),
        }
    }

    /// Queue an order at the back of its price level, creating the level if needed
    pub fn insert(&mut self, order_id: OrderId, price: Price) {
        self.levels.entry(price).or_default().push_back(order_id);
    }

    /// Remove an order from the bid book
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

    /// Levels in priority order (highest price first)
    pub fn levels(&self) -> impl Iterator<Item = (Price, &PriceLevel)> + '_ {
        self.levels.iter().rev().map(|(price, level)| (*price, level))
    }

    /// The n-th best level (0 = best bid)
    pub fn nth_level(&self, n: usize) -> Option<(Price, &PriceLevel)> {
        self.levels().nth(n)
    }

    /// Get the best bid price
    pub fn best_bid_price(&self) -> Option<Price> {
        // BTreeMap iter is ascending, so we need last()
        self.levels.keys().next_back().copied()
    }

    /// Check if the bid book is empty
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Get the total number of price levels
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }
}
