//! Types library for the limit order book
//!
//! Core type definitions shared by the book and its collaborators.
//!
//! # Modules
//! - `ids`: order identifiers
//! - `numeric`: exact price and quantity types
//! - `order`: order record and its status state machine
//! - `errors`: error taxonomy

pub mod ids;
pub mod numeric;
pub mod order;
pub mod errors;
