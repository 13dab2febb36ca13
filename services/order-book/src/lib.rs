//! Limit Order Book
//!
//! Single-instrument limit order book matching incoming orders against
//! resting liquidity under price-time priority.
//!
//! **Key Invariants:**
//! - Every active order rests exactly once, at its own side and price
//! - Levels keep arrival order; amending quantity up forfeits priority
//! - The book is never left crossed after a new order is processed
//! - Quantity is conserved across every fill
//!
//! All mutation happens through `OrderBook`'s lifecycle operations on a
//! single thread; each call runs to completion before the next.

pub mod book;
pub mod config;
pub mod engine;
pub mod matching;
pub mod protocol;
pub mod registry;
pub mod validation;

pub use config::BookConfig;
pub use engine::{BookSnapshot, InvariantViolation, LevelSummary, OrderBook};
pub use validation::{AcceptAll, PriceValidator};
