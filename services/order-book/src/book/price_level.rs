//! Price level implementation with FIFO queue
//!
//! A price level holds the identifiers of every order resting at one price
//! on one side, in arrival order. The registry owns the orders; a level only
//! records who is queued and in what sequence.

use std::collections::VecDeque;
use types::ids::OrderId;

/// A price level containing orders at a specific price
///
/// Maintains strict FIFO ordering for time-priority matching. An amend that
/// forfeits priority re-queues the order at the back.
#[derive(Debug, Clone, Default)]
pub struct PriceLevel {
    /// Queue of resting order ids (front = oldest)
    orders: VecDeque<OrderId>,
}

impl PriceLevel {
    /// Create a new empty price level
    pub fn new() -> Self {
        Self {
            orders: VecDeque::new(),
        }
    }

    /// Insert an order at the back of the queue (time priority)
    pub fn push_back(&mut self, order_id: OrderId) {
        self.orders.push_back(order_id);
    }

    /// Remove an order from the queue by OrderId
    ///
    /// Returns false if the order is not queued here
    pub fn remove(&mut self, order_id: OrderId) -> bool {
        match self.position(order_id) {
            Some(position) => self.orders.remove(position).is_some(),
            None => false,
        }
    }

    /// Move an order to the back of the queue, losing its time priority
    ///
    /// Returns false if the order is not queued here
    pub fn requeue(&mut self, order_id: OrderId) -> bool {
        if !self.remove(order_id) {
            return false;
        }
        self.orders.push_back(order_id);
        true
    }

    /// Zero-based position of an order in the queue
    pub fn position(&self, order_id: OrderId) -> Option<usize> {
        self.orders.iter().position(|id| *id == order_id)
    }

    /// Queued order ids, oldest first
    pub fn iter(&self) -> impl Iterator<Item = OrderId> + '_ {
        self.orders.iter().copied()
    }

    /// Check if the price level is empty
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Get the number of orders at this level
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }
}
