//! Error types for the order book
//!
//! Error taxonomy using thiserror. None of these escape the book's lifecycle
//! operations; they drive the silent-drop paths and the protocol layer.

use thiserror::Error;

/// Order-specific errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    #[error("Duplicate order id: {order_id}")]
    DuplicateOrderId { order_id: String },

    #[error("Order not found: {order_id}")]
    NotFound { order_id: String },

    #[error("Order {order_id} is not active: {status}")]
    NotActive { order_id: String, status: String },

    #[error("Order already in terminal state: {status}")]
    AlreadyTerminal { status: String },

    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Fill of {fill} would exceed leaves quantity {leaves}")]
    Overfill { fill: String, leaves: String },
}

/// Numeric parsing and range errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NumericError {
    #[error("Price must be positive: {0}")]
    NonPositivePrice(String),

    #[error("Unparsable number: {0}")]
    Unparsable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_error_display() {
        let err = OrderError::InvalidPrice("negative".to_string());
        assert_eq!(err.to_string(), "Invalid price: negative");
    }

    #[test]
    fn test_not_active_display() {
        let err = OrderError::NotActive {
            order_id: "10".to_string(),
            status: "Filled".to_string(),
        };
        assert!(err.to_string().contains("10"));
        assert!(err.to_string().contains("Filled"));
    }
}
