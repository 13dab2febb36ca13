//! Fill walk for an aggressing order
//!
//! Walks the opposite side from the best price, filling resting orders in
//! FIFO order until the aggressor is exhausted or the next level is no
//! longer marketable. Orders that complete are collected and handed back so
//! the caller can take them off the book after the walk; no level is
//! mutated while it is being iterated.

use tracing::trace;
use types::errors::OrderError;
use types::ids::OrderId;
use types::numeric::{Price, Quantity};

use super::crossing::incoming_can_match;
use crate::book::PriceLevel;
use crate::registry::OrderRegistry;

/// Result of one matching pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchOutcome {
    /// Quantity the aggressor executed in this pass
    pub executed: Quantity,
    /// Orders that became Filled, aggressor included; to be removed from the book
    pub completed: Vec<OrderId>,
    /// Resting orders that received any fill, in fill order
    pub touched: Vec<OrderId>,
}

/// Match `aggressor_id` against `opposite_levels`
///
/// `opposite_levels` must be in priority order (best price first). Fills are
/// written to the registry; the aggressor's own status is updated last.
pub fn execute<'a, I>(
    aggressor_id: OrderId,
    opposite_levels: I,
    registry: &mut OrderRegistry,
) -> Result<MatchOutcome, OrderError>
where
    I: IntoIterator<Item = (Price, &'a PriceLevel)>,
{
    let (side, limit, initial_leaves) = {
        let aggressor = registry.get(aggressor_id).ok_or_else(|| not_found(aggressor_id))?;
        (aggressor.side, aggressor.price, aggressor.leaves_quantity())
    };

    let mut leaves = initial_leaves;
    let mut outcome = MatchOutcome::default();

    'levels: for (price, level) in opposite_levels {
        if leaves.is_zero() || !incoming_can_match(side, limit, price) {
            break;
        }

        for resting_id in level.iter() {
            let resting = registry.get_mut(resting_id).ok_or_else(|| not_found(resting_id))?;
            let resting_leaves = resting.leaves_quantity();
            outcome.touched.push(resting_id);

            if leaves >= resting_leaves {
                resting.fill_remaining()?;
                leaves -= resting_leaves;
                outcome.completed.push(resting_id);
                trace!(order_id = %resting_id, %price, quantity = %resting_leaves, "Resting order filled");
            } else {
                resting.apply_fill(leaves)?;
                trace!(order_id = %resting_id, %price, quantity = %leaves, "Resting order partially filled");
                leaves = Quantity::ZERO;
            }

            if leaves.is_zero() {
                break 'levels;
            }
        }
    }

    outcome.executed = initial_leaves - leaves;

    let aggressor = registry.get_mut(aggressor_id).ok_or_else(|| not_found(aggressor_id))?;
    aggressor.apply_fill(outcome.executed)?;
    if aggressor.is_filled() {
        outcome.completed.push(aggressor_id);
    }

    Ok(outcome)
}

fn not_found(order_id: OrderId) -> OrderError {
    OrderError::NotFound {
        order_id: order_id.to_string(),
    }
}
