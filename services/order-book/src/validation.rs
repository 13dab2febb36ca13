//! Price validation hook
//!
//! The book asks a `PriceValidator` once per new order. Tick-size rules
//! differ per venue and instrument, so the default accepts every positive
//! price and venues plug in their own predicate.

use types::numeric::Price;

/// Predicate consulted before a new order is accepted
pub trait PriceValidator {
    fn validate_px(&self, price: Price) -> bool;
}

/// Accepts every price
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl PriceValidator for AcceptAll {
    fn validate_px(&self, _price: Price) -> bool {
        true
    }
}

impl<F> PriceValidator for F
where
    F: Fn(Price) -> bool,
{
    fn validate_px(&self, price: Price) -> bool {
        self(price)
    }
}
