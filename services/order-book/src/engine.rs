//! Order book core
//!
//! Owns the registry and both sides of the book and implements the
//! lifecycle operations (new, amend, cancel) and the read-only queries.
//!
//! Requests that cannot apply (duplicate id, unknown or inactive target,
//! price refused by the validator) are dropped without touching the book.
//! They are logged at debug level and never surfaced to the caller.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info};
use types::errors::OrderError;
use types::ids::OrderId;
use types::numeric::{Price, Quantity};
use types::order::{Order, Side};

use crate::book::{AskBook, BidBook, PriceLevel};
use crate::config::BookConfig;
use crate::matching::{can_match, executor, MatchOutcome};
use crate::registry::OrderRegistry;
use crate::validation::{AcceptAll, PriceValidator};

/// Aggregate view of one price level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelSummary {
    pub price: Price,
    /// Sum of leaves quantity across the level
    pub quantity: Quantity,
    pub order_count: usize,
}

impl LevelSummary {
    /// Returned for a level index past the end of a side
    pub const EMPTY: LevelSummary = LevelSummary {
        price: Price::ZERO,
        quantity: Quantity::ZERO,
        order_count: 0,
    };

    pub fn is_empty(&self) -> bool {
        self.order_count == 0
    }
}

/// Top-of-book snapshot for presentation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSnapshot {
    pub bids: Vec<LevelSummary>,
    pub asks: Vec<LevelSummary>,
}

/// Broken book invariant found by `OrderBook::verify_invariants`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("Empty price level {price} on {side:?} side")]
    EmptyLevel { side: Side, price: Price },

    #[error("Order {order_id} is in the book but not in the registry")]
    UnknownOrder { order_id: OrderId },

    #[error("Order {order_id} is in the book but not active")]
    InactiveResting { order_id: OrderId },

    #[error("Order {order_id} rests at {side:?} {price}, which does not match the order")]
    WrongLevel { order_id: OrderId, side: Side, price: Price },

    #[error("Order {order_id} appears more than once in the book")]
    DuplicateEntry { order_id: OrderId },

    #[error("Active order {order_id} is not resting in the book")]
    NotResting { order_id: OrderId },

    #[error("Order {order_id} has inconsistent quantities or status")]
    QuantityMismatch { order_id: OrderId },

    #[error("Book is crossed: best bid {bid} >= best ask {ask}")]
    CrossedBook { bid: Price, ask: Price },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AmendEffect {
    /// Amended to at or below executed quantity
    Closed,
    PriorityLost,
    PriorityKept,
}

/// Single-instrument limit order book
pub struct OrderBook {
    config: BookConfig,
    validator: Box<dyn PriceValidator>,
    registry: OrderRegistry,
    bids: BidBook,
    asks: AskBook,
}

impl OrderBook {
    /// Create an empty book with default configuration
    pub fn new() -> Self {
        Self::with_config(BookConfig::default())
    }

    /// Create an empty book with custom configuration
    pub fn with_config(config: BookConfig) -> Self {
        Self::with_validator(config, AcceptAll)
    }

    /// Create an empty book with a custom price validator
    pub fn with_validator<V>(config: BookConfig, validator: V) -> Self
    where
        V: PriceValidator + 'static,
    {
        info!(display_depth = config.display_depth, "OrderBook initialized");

        Self {
            config,
            validator: Box::new(validator),
            registry: OrderRegistry::new(),
            bids: BidBook::new(),
            asks: AskBook::new(),
        }
    }

    pub fn config(&self) -> &BookConfig {
        &self.config
    }

    // ── Lifecycle operations ────────────────────────────────────────

    /// Submit a new limit order and match it against the opposite side
    ///
    /// Dropped without effect if the id was ever used before, or if the
    /// quantity is zero or the price is refused.
    pub fn new_order(&mut self, order_id: OrderId, side: Side, quantity: Quantity, price: Price) {
        if let Err(reason) = self.admit(order_id, quantity, price) {
            debug!(%order_id, %reason, "Dropping new order");
            return;
        }

        self.registry.insert(Order::new(order_id, side, price, quantity));
        match side {
            Side::Buy => self.bids.insert(order_id, price),
            Side::Sell => self.asks.insert(order_id, price),
        }

        match self.match_aggressor(order_id) {
            Ok(outcome) => debug!(
                %order_id,
                ?side,
                %price,
                %quantity,
                executed = %outcome.executed,
                completed = outcome.completed.len(),
                counterparties = ?outcome.touched,
                "Order accepted"
            ),
            Err(err) => error!(%order_id, error = %err, "Matching pass aborted"),
        }
    }

    /// Change the requested quantity of a resting order
    ///
    /// Amending up sends the order to the back of its level; amending down
    /// keeps its place. Amending to at or below the executed quantity closes
    /// the order as Filled. No matching pass runs after an amend.
    pub fn amend_order(&mut self, order_id: OrderId, quantity: Quantity) {
        match self.try_amend(order_id, quantity) {
            Ok(effect) => debug!(%order_id, %quantity, ?effect, "Order amended"),
            Err(reason) => debug!(%order_id, %reason, "Dropping amend"),
        }
    }

    /// Cancel a resting order; the registry keeps it as Canceled
    pub fn cancel_order(&mut self, order_id: OrderId) {
        match self.try_cancel(order_id) {
            Ok(()) => debug!(%order_id, "Order canceled"),
            Err(reason) => debug!(%order_id, %reason, "Dropping cancel"),
        }
    }

    fn admit(&self, order_id: OrderId, quantity: Quantity, price: Price) -> Result<(), OrderError> {
        if self.registry.contains(order_id) {
            return Err(OrderError::DuplicateOrderId {
                order_id: order_id.to_string(),
            });
        }
        if quantity.is_zero() {
            return Err(OrderError::InvalidQuantity(quantity.to_string()));
        }
        if price.is_zero() || !self.validator.validate_px(price) {
            return Err(OrderError::InvalidPrice(price.to_string()));
        }
        Ok(())
    }

    fn match_aggressor(&mut self, order_id: OrderId) -> Result<MatchOutcome, OrderError> {
        let side = self.active_order(order_id)?.side;
        let outcome = match side {
            Side::Buy => executor::execute(order_id, self.asks.levels(), &mut self.registry)?,
            Side::Sell => executor::execute(order_id, self.bids.levels(), &mut self.registry)?,
        };

        for completed in &outcome.completed {
            self.deactivate(*completed);
        }
        Ok(outcome)
    }

    fn try_amend(&mut self, order_id: OrderId, quantity: Quantity) -> Result<AmendEffect, OrderError> {
        let (side, price, requested, filled) = {
            let order = self.active_order(order_id)?;
            (order.side, order.price, order.quantity, order.filled_quantity)
        };

        if quantity <= filled {
            self.order_mut(order_id)?.mark_filled_by_amend()?;
            self.deactivate(order_id);
            return Ok(AmendEffect::Closed);
        }

        let effect = if quantity > requested {
            match side {
                Side::Buy => self.bids.requeue(order_id, price),
                Side::Sell => self.asks.requeue(order_id, price),
            };
            AmendEffect::PriorityLost
        } else {
            AmendEffect::PriorityKept
        };

        self.order_mut(order_id)?.amend_quantity(quantity)?;
        Ok(effect)
    }

    fn try_cancel(&mut self, order_id: OrderId) -> Result<(), OrderError> {
        self.active_order(order_id)?;
        self.order_mut(order_id)?.cancel()?;
        self.deactivate(order_id);
        Ok(())
    }

    /// Take an order off its price level
    fn deactivate(&mut self, order_id: OrderId) {
        let Some(order) = self.registry.get(order_id) else {
            return;
        };
        let removed = match order.side {
            Side::Buy => self.bids.remove(order_id, order.price),
            Side::Sell => self.asks.remove(order_id, order.price),
        };
        if !removed {
            error!(%order_id, "Deactivated order was not resting");
        }
    }

    fn active_order(&self, order_id: OrderId) -> Result<&Order, OrderError> {
        let order = self.registry.get(order_id).ok_or_else(|| OrderError::NotFound {
            order_id: order_id.to_string(),
        })?;
        if !order.is_active() {
            return Err(OrderError::NotActive {
                order_id: order_id.to_string(),
                status: order.status.to_string(),
            });
        }
        Ok(order)
    }

    fn order_mut(&mut self, order_id: OrderId) -> Result<&mut Order, OrderError> {
        self.registry.get_mut(order_id).ok_or_else(|| OrderError::NotFound {
            order_id: order_id.to_string(),
        })
    }

    // ── Queries ─────────────────────────────────────────────────────

    /// Look up any order the book has accepted, active or not
    pub fn get_order(&self, order_id: OrderId) -> Option<&Order> {
        self.registry.get(order_id)
    }

    /// All accepted orders in ascending id
    pub fn orders(&self) -> impl Iterator<Item = &Order> + '_ {
        self.registry.iter()
    }

    /// Summary of the `level`-th best price on `side` (0 = best)
    ///
    /// Returns `LevelSummary::EMPTY` when the side has fewer levels.
    pub fn get_level(&self, side: Side, level: usize) -> LevelSummary {
        let nth = match side {
            Side::Buy => self.bids.nth_level(level),
            Side::Sell => self.asks.nth_level(level),
        };
        nth.map_or(LevelSummary::EMPTY, |(price, level)| self.summarize(price, level))
    }

    /// Zero-based queue position of a resting order within its level
    ///
    /// `None` if the order is unknown or not resting.
    pub fn get_position(&self, order_id: OrderId) -> Option<usize> {
        let order = self.registry.get(order_id)?;
        if !order.is_active() {
            return None;
        }
        match order.side {
            Side::Buy => self.bids.position(order_id, order.price),
            Side::Sell => self.asks.position(order_id, order.price),
        }
    }

    pub fn best_bid(&self) -> Option<Price> {
        self.bids.best_bid_price()
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.asks.best_ask_price()
    }

    /// Best ask minus best bid, when both sides are populated
    pub fn spread(&self) -> Option<rust_decimal::Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask.as_decimal() - bid.as_decimal()),
            _ => None,
        }
    }

    /// Best `depth` levels of one side
    pub fn depth(&self, side: Side, depth: usize) -> Vec<LevelSummary> {
        match side {
            Side::Buy => self
                .bids
                .levels()
                .take(depth)
                .map(|(price, level)| self.summarize(price, level))
                .collect(),
            Side::Sell => self
                .asks
                .levels()
                .take(depth)
                .map(|(price, level)| self.summarize(price, level))
                .collect(),
        }
    }

    /// Both sides to the configured display depth
    pub fn snapshot(&self) -> BookSnapshot {
        BookSnapshot {
            bids: self.depth(Side::Buy, self.config.display_depth),
            asks: self.depth(Side::Sell, self.config.display_depth),
        }
    }

    fn summarize(&self, price: Price, level: &PriceLevel) -> LevelSummary {
        let quantity = level
            .iter()
            .filter_map(|order_id| self.registry.get(order_id))
            .map(Order::leaves_quantity)
            .sum();
        LevelSummary {
            price,
            quantity,
            order_count: level.order_count(),
        }
    }

    // ── Invariants ──────────────────────────────────────────────────

    /// Check registry and both sides against each other
    pub fn verify_invariants(&self) -> Result<(), InvariantViolation> {
        let mut resting = HashSet::new();

        let bid_levels = self.bids.levels().map(|(price, level)| (Side::Buy, price, level));
        let ask_levels = self.asks.levels().map(|(price, level)| (Side::Sell, price, level));
        for (side, price, level) in bid_levels.chain(ask_levels) {
            if level.is_empty() {
                return Err(InvariantViolation::EmptyLevel { side, price });
            }
            for order_id in level.iter() {
                let order = self
                    .registry
                    .get(order_id)
                    .ok_or(InvariantViolation::UnknownOrder { order_id })?;
                if !order.is_active() {
                    return Err(InvariantViolation::InactiveResting { order_id });
                }
                if order.side != side || order.price != price {
                    return Err(InvariantViolation::WrongLevel { order_id, side, price });
                }
                if !resting.insert(order_id) {
                    return Err(InvariantViolation::DuplicateEntry { order_id });
                }
            }
        }

        for order in self.registry.iter() {
            if !order.check_invariant() {
                return Err(InvariantViolation::QuantityMismatch {
                    order_id: order.order_id,
                });
            }
            if order.is_active() && !resting.contains(&order.order_id) {
                return Err(InvariantViolation::NotResting {
                    order_id: order.order_id,
                });
            }
        }

        if let (Some(bid), Some(ask)) = (self.best_bid(), self.best_ask()) {
            if can_match(bid, ask) {
                return Err(InvariantViolation::CrossedBook { bid, ask });
            }
        }

        Ok(())
    }
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::order::OrderStatus;

    fn id(raw: u64) -> OrderId {
        OrderId::new(raw)
    }

    fn qty(raw: u64) -> Quantity {
        Quantity::new(raw)
    }

    fn px(raw: &str) -> Price {
        raw.parse().unwrap()
    }

    #[test]
    fn test_new_order_rests() {
        let mut book = OrderBook::new();
        book.new_order(id(100000), Side::Sell, qty(1), px("1075"));

        let order = book.get_order(id(100000)).unwrap();
        assert_eq!(order.quantity, qty(1));
        assert_eq!(order.status, OrderStatus::New);
        assert_eq!(order.price, px("1075"));
        assert_eq!(book.best_ask(), Some(px("1075")));
        assert_eq!(book.get_position(id(100000)), Some(0));
        book.verify_invariants().unwrap();
    }

    #[test]
    fn test_new_order_duplicate_dropped() {
        let mut book = OrderBook::new();
        book.new_order(id(100000), Side::Sell, qty(1), px("1075"));
        book.new_order(id(100000), Side::Sell, qty(2), px("1075"));

        assert_eq!(book.get_order(id(100000)).unwrap().quantity, qty(1));
        assert_eq!(book.get_level(Side::Sell, 0).order_count, 1);
        book.verify_invariants().unwrap();
    }

    #[test]
    fn test_new_order_zero_quantity_dropped() {
        let mut book = OrderBook::new();
        book.new_order(id(1), Side::Buy, qty(0), px("10"));

        assert!(book.get_order(id(1)).is_none());
    }

    #[test]
    fn test_new_order_zero_price_dropped() {
        let mut book = OrderBook::new();
        book.new_order(id(1), Side::Buy, qty(5), Price::ZERO);

        assert!(book.get_order(id(1)).is_none());
        assert!(book.best_bid().is_none());
    }

    #[test]
    fn test_level_quantity_clamps_for_huge_orders() {
        let mut book = OrderBook::new();
        let huge = qty(i64::MAX as u64);
        for order_id in 1..=3 {
            book.new_order(id(order_id), Side::Buy, huge, px("10"));
        }

        let level = book.get_level(Side::Buy, 0);
        assert_eq!(level.quantity, qty(u64::MAX));
        assert_eq!(level.order_count, 3);
        assert_eq!(book.snapshot().bids, vec![level]);
        book.verify_invariants().unwrap();
    }

    #[test]
    fn test_validator_refusal_leaves_no_entry() {
        let mut book = OrderBook::with_validator(BookConfig::default(), |price: Price| {
            price < Price::from_u64(100)
        });
        book.new_order(id(1), Side::Buy, qty(5), px("150"));
        book.new_order(id(2), Side::Buy, qty(5), px("99.5"));

        assert!(book.get_order(id(1)).is_none());
        assert!(book.get_order(id(2)).is_some());

        // A refused id was never registered, so it may be submitted again
        book.new_order(id(1), Side::Buy, qty(5), px("50"));
        assert!(book.get_order(id(1)).is_some());
        book.verify_invariants().unwrap();
    }

    #[test]
    fn test_amend_up_changes_quantity() {
        let mut book = OrderBook::new();
        book.new_order(id(100001), Side::Sell, qty(1), px("1075"));
        book.amend_order(id(100001), qty(2));

        assert_eq!(book.get_order(id(100001)).unwrap().quantity, qty(2));
        assert_eq!(book.get_level(Side::Sell, 0).quantity, qty(2));
        book.verify_invariants().unwrap();
    }

    #[test]
    fn test_amend_missing_is_noop() {
        let mut book = OrderBook::new();
        book.amend_order(id(100001), qty(1075));

        assert!(book.get_order(id(100001)).is_none());
    }

    #[test]
    fn test_amend_down_keeps_position() {
        let mut book = OrderBook::new();
        book.new_order(id(10), Side::Sell, qty(5), px("1080"));
        book.new_order(id(11), Side::Sell, qty(3), px("1080"));
        book.amend_order(id(10), qty(2));

        assert_eq!(book.get_position(id(10)), Some(0));
        assert_eq!(book.get_order(id(10)).unwrap().quantity, qty(2));
        assert_eq!(book.get_level(Side::Sell, 0).quantity, qty(5));
    }

    #[test]
    fn test_amend_up_loses_position() {
        let mut book = OrderBook::new();
        book.new_order(id(10), Side::Sell, qty(2), px("1080"));
        book.new_order(id(11), Side::Sell, qty(3), px("1080"));
        book.amend_order(id(10), qty(5));

        assert_eq!(book.get_position(id(10)), Some(1));
        assert_eq!(book.get_position(id(11)), Some(0));
        book.verify_invariants().unwrap();
    }

    #[test]
    fn test_amend_same_quantity_keeps_position() {
        let mut book = OrderBook::new();
        book.new_order(id(10), Side::Buy, qty(2), px("99"));
        book.new_order(id(11), Side::Buy, qty(2), px("99"));
        book.amend_order(id(10), qty(2));

        assert_eq!(book.get_position(id(10)), Some(0));
    }

    #[test]
    fn test_amend_to_executed_closes_order() {
        let mut book = OrderBook::new();
        book.new_order(id(10), Side::Sell, qty(3), px("1075"));
        book.new_order(id(16), Side::Buy, qty(1), px("2000"));
        book.amend_order(id(10), qty(1));

        let order = book.get_order(id(10)).unwrap();
        assert_eq!(order.status, OrderStatus::Filled);
        assert_eq!(order.filled_quantity, qty(1));
        assert_eq!(order.leaves_quantity(), qty(0));
        assert!(book.best_ask().is_none());
        assert_eq!(book.get_position(id(10)), None);
        book.verify_invariants().unwrap();
    }

    #[test]
    fn test_amend_inactive_is_noop() {
        let mut book = OrderBook::new();
        book.new_order(id(1), Side::Buy, qty(3), px("10"));
        book.cancel_order(id(1));
        book.amend_order(id(1), qty(9));

        let order = book.get_order(id(1)).unwrap();
        assert_eq!(order.status, OrderStatus::Canceled);
        assert_eq!(order.quantity, qty(3));
        book.verify_invariants().unwrap();
    }

    #[test]
    fn test_cancel() {
        let mut book = OrderBook::new();
        book.new_order(id(100001), Side::Sell, qty(1), px("1075"));
        book.cancel_order(id(100001));

        assert_eq!(book.get_order(id(100001)).unwrap().status, OrderStatus::Canceled);
        assert_eq!(book.get_level(Side::Sell, 0), LevelSummary::EMPTY);
        book.verify_invariants().unwrap();
    }

    #[test]
    fn test_cancel_twice_is_noop() {
        let mut book = OrderBook::new();
        book.new_order(id(1), Side::Sell, qty(1), px("5"));
        book.cancel_order(id(1));
        book.cancel_order(id(1));
        book.cancel_order(id(2));

        assert_eq!(book.get_order(id(1)).unwrap().status, OrderStatus::Canceled);
        book.verify_invariants().unwrap();
    }

    #[test]
    fn test_spread_and_snapshot() {
        let mut book = OrderBook::new();
        book.new_order(id(1), Side::Buy, qty(100), px("12.30"));
        book.new_order(id(2), Side::Sell, qty(50), px("12.45"));

        assert_eq!(book.spread(), Some(px("0.15").as_decimal()));

        let snapshot = book.snapshot();
        assert_eq!(snapshot.bids.len(), 1);
        assert_eq!(snapshot.asks[0].quantity, qty(50));
    }

    #[test]
    fn test_snapshot_serialization() {
        let mut book = OrderBook::new();
        book.new_order(id(1003), Side::Buy, qty(200), px("12.40"));

        let json = serde_json::to_string(&book.snapshot()).unwrap();
        let restored: BookSnapshot = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, book.snapshot());
        assert!(restored.asks.is_empty());
    }

    #[test]
    fn test_verify_detects_corruption() {
        let mut book = OrderBook::new();
        book.new_order(id(1), Side::Buy, qty(1), px("10"));
        book.bids.insert(id(1), px("11"));

        assert!(book.verify_invariants().is_err());
    }
}
