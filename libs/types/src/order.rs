//! Order types and the order status state machine
//!
//! `New -> PartiallyFilled -> Filled`, with `Canceled` reachable from either
//! active state and `Rejected` reserved for validation failures.

use crate::errors::OrderError;
use crate::ids::OrderId;
use crate::numeric::{Price, Quantity};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order side (buyer or seller)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Buy order (bid)
    Buy,
    /// Sell order (ask)
    Sell,
}

impl Side {
    /// Get the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Accepted, nothing executed yet
    New,
    /// Partially executed, remainder still resting
    PartiallyFilled,
    /// Fully executed, or amended down to what was already executed (terminal)
    Filled,
    /// Canceled (terminal)
    Canceled,
    /// Failed validation (terminal)
    Rejected,
}

impl OrderStatus {
    /// Active orders rest in the book
    pub fn is_active(&self) -> bool {
        matches!(self, OrderStatus::New | OrderStatus::PartiallyFilled)
    }

    /// Check if status is terminal (no further transitions possible)
    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::New => "New",
            OrderStatus::PartiallyFilled => "PartiallyFilled",
            OrderStatus::Filled => "Filled",
            OrderStatus::Canceled => "Canceled",
            OrderStatus::Rejected => "Rejected",
        }
    }

    /// FIX OrdStatus (tag 39) value
    pub fn fix_code(&self) -> char {
        match self {
            OrderStatus::New => '0',
            OrderStatus::PartiallyFilled => '1',
            OrderStatus::Filled => '2',
            OrderStatus::Canceled => '4',
            OrderStatus::Rejected => '8',
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single limit order and its fill state
///
/// `filled_quantity <= quantity` holds after every transition, and `status`
/// always agrees with the two quantities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub side: Side,
    pub price: Price,
    /// Requested quantity
    pub quantity: Quantity,
    /// Cumulative executed quantity
    pub filled_quantity: Quantity,
    pub status: OrderStatus,
}

impl Order {
    /// Create a new order with nothing executed
    pub fn new(order_id: OrderId, side: Side, price: Price, quantity: Quantity) -> Self {
        Self {
            order_id,
            side,
            price,
            quantity,
            filled_quantity: Quantity::ZERO,
            status: OrderStatus::New,
        }
    }

    /// Remaining tradable quantity
    pub fn leaves_quantity(&self) -> Quantity {
        self.quantity.saturating_sub(self.filled_quantity)
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Check if order is completely filled
    pub fn is_filled(&self) -> bool {
        self.status == OrderStatus::Filled
    }

    /// Check quantity and status consistency
    pub fn check_invariant(&self) -> bool {
        if self.filled_quantity > self.quantity {
            return false;
        }
        match self.status {
            OrderStatus::New => self.filled_quantity.is_zero() && !self.quantity.is_zero(),
            OrderStatus::PartiallyFilled => {
                !self.filled_quantity.is_zero() && self.filled_quantity < self.quantity
            }
            OrderStatus::Filled => self.filled_quantity == self.quantity,
            OrderStatus::Canceled | OrderStatus::Rejected => true,
        }
    }

    fn ensure_active(&self) -> Result<(), OrderError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(OrderError::AlreadyTerminal {
                status: self.status.to_string(),
            })
        }
    }

    /// Execute part of the remainder and adjust status
    pub fn apply_fill(&mut self, fill: Quantity) -> Result<(), OrderError> {
        self.ensure_active()?;
        let leaves = self.leaves_quantity();
        if fill > leaves {
            return Err(OrderError::Overfill {
                fill: fill.to_string(),
                leaves: leaves.to_string(),
            });
        }

        self.filled_quantity += fill;
        if self.filled_quantity == self.quantity {
            self.status = OrderStatus::Filled;
        } else if !self.filled_quantity.is_zero() {
            self.status = OrderStatus::PartiallyFilled;
        }

        debug_assert!(self.check_invariant(), "Invariant violated after fill");
        Ok(())
    }

    /// Execute the whole remainder; returns the quantity executed
    pub fn fill_remaining(&mut self) -> Result<Quantity, OrderError> {
        let leaves = self.leaves_quantity();
        self.apply_fill(leaves)?;
        Ok(leaves)
    }

    /// Change the requested quantity of an order that keeps resting
    ///
    /// The new quantity must exceed what is already executed; use
    /// `mark_filled_by_amend` otherwise.
    pub fn amend_quantity(&mut self, quantity: Quantity) -> Result<(), OrderError> {
        self.ensure_active()?;
        if quantity <= self.filled_quantity {
            return Err(OrderError::InvalidQuantity(format!(
                "{} does not exceed executed quantity {}",
                quantity, self.filled_quantity
            )));
        }
        self.quantity = quantity;
        Ok(())
    }

    /// Close the order after an amend to at or below its executed quantity
    ///
    /// No execution happens; the requested quantity is capped at the
    /// executed quantity so leaves become zero.
    pub fn mark_filled_by_amend(&mut self) -> Result<(), OrderError> {
        self.ensure_active()?;
        self.quantity = self.filled_quantity;
        self.status = OrderStatus::Filled;
        Ok(())
    }

    /// Cancel the order
    pub fn cancel(&mut self) -> Result<(), OrderError> {
        self.ensure_active()?;
        self.status = OrderStatus::Canceled;
        Ok(())
    }

    /// Reject the order on validation failure
    pub fn reject(&mut self) -> Result<(), OrderError> {
        if self.status != OrderStatus::New || !self.filled_quantity.is_zero() {
            return Err(OrderError::AlreadyTerminal {
                status: self.status.to_string(),
            });
        }
        self.status = OrderStatus::Rejected;
        Ok(())
    }
}
