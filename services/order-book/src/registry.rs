//! Order registry
//!
//! Sole owner of every order the book has ever accepted. The bid and ask
//! books refer to orders only by `OrderId`, so quantities and status live in
//! exactly one place. Orders are never removed; terminal orders stay
//! queryable for the lifetime of the book.

use std::collections::BTreeMap;
use types::ids::OrderId;
use types::order::Order;

#[derive(Debug, Clone, Default)]
pub struct OrderRegistry {
    orders: BTreeMap<OrderId, Order>,
}

impl OrderRegistry {
    pub fn new() -> Self {
        Self {
            orders: BTreeMap::new(),
        }
    }

    /// True if the id was ever accepted, active or not
    pub fn contains(&self, order_id: OrderId) -> bool {
        self.orders.contains_key(&order_id)
    }

    /// Register a new order
    ///
    /// Returns false, leaving the existing entry untouched, if the id is taken
    pub fn insert(&mut self, order: Order) -> bool {
        if self.contains(order.order_id) {
            return false;
        }
        self.orders.insert(order.order_id, order);
        true
    }

    pub fn get(&self, order_id: OrderId) -> Option<&Order> {
        self.orders.get(&order_id)
    }

    pub fn get_mut(&mut self, order_id: OrderId) -> Option<&mut Order> {
        self.orders.get_mut(&order_id)
    }

    /// All orders in ascending id
    pub fn iter(&self) -> impl Iterator<Item = &Order> + '_ {
        self.orders.values()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}
