//! The shared order registry.
//!
//! One registry instance owns every order the process knows about: a
//! concurrent id index over all active orders plus exactly one
//! [`OrderList`] per lifecycle state. A deployment runs a single
//! registry, but that is a wiring choice made at startup; nothing here
//! is process-global, so tests run as many isolated registries as they
//! like.

use crate::lists::OrderList;
use crate::order::Order;
use dashmap::DashMap;
use ras_types::OrderState;
use std::collections::HashMap;
use std::sync::Arc;

/// Owner of the id index and the per-state order lists.
pub struct OrderRegistry {
	active_orders: DashMap<String, Arc<Order>>,
	lists: HashMap<OrderState, Arc<OrderList>>,
}

impl OrderRegistry {
	/// Creates a registry with one empty list bound to every state.
	pub fn new() -> Self {
		let lists = OrderState::VALUES
			.iter()
			.map(|state| (*state, Arc::new(OrderList::new())))
			.collect();
		Self {
			active_orders: DashMap::new(),
			lists,
		}
	}

	/// Returns the list bound to `state`.
	///
	/// Every state receives a list at construction time. A missing
	/// binding means the state enumeration grew without the registry
	/// following, which no caller can recover from, so this panics
	/// instead of returning an error.
	pub fn list(&self, state: OrderState) -> &Arc<OrderList> {
		self.lists
			.get(&state)
			.unwrap_or_else(|| panic!("no order list is bound to state {state}"))
	}

	/// Looks up an active order by id, returning the live shared
	/// reference.
	pub fn get_order(&self, id: &str) -> Option<Arc<Order>> {
		self.active_orders.get(id).map(|entry| entry.value().clone())
	}

	/// Whether an order with this id is active.
	pub fn is_active(&self, id: &str) -> bool {
		self.active_orders.contains_key(id)
	}

	/// Number of active orders across all states.
	pub fn active_count(&self) -> usize {
		self.active_orders.len()
	}

	pub(crate) fn active_orders(&self) -> &DashMap<String, Arc<Order>> {
		&self.active_orders
	}
}

impl Default for OrderRegistry {
	fn default() -> Self {
		Self::new()
	}
}
