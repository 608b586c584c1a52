//! Order-facing entry points.
//!
//! The [`OrderController`] is what the request-handling layer and the
//! remote messaging layer call into: activate a new order, look one
//! up, ask for its deletion, or apply a state change reported by a
//! remote federation member. Every path that changes state funnels
//! into the transition module; there is no way around it.

use crate::order::Order;
use crate::registry::OrderRegistry;
use crate::transition::{activate_order, transition, ActivationError, TransitionError};
use ras_types::{OrderState, OrderView};
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced to callers of the controller.
#[derive(Debug, Error)]
pub enum OrderError {
	#[error("order {0} was not found")]
	NotFound(String),
	#[error("order {0} is already closed")]
	AlreadyClosed(String),
	#[error(transparent)]
	Activation(#[from] ActivationError),
	#[error(transparent)]
	Transition(#[from] TransitionError),
}

/// Entry points over one shared registry.
pub struct OrderController {
	registry: Arc<OrderRegistry>,
}

impl OrderController {
	pub fn new(registry: Arc<OrderRegistry>) -> Self {
		Self { registry }
	}

	pub fn registry(&self) -> &Arc<OrderRegistry> {
		&self.registry
	}

	/// Activates a freshly created order: it becomes OPEN, reachable by
	/// id, and visible to the open-orders processor.
	pub fn activate_order(&self, order: Order) -> Result<Arc<Order>, OrderError> {
		Ok(activate_order(&self.registry, order)?)
	}

	/// Looks up an order, returning the live shared reference. Reading
	/// state off the result does not require any lock, but the value
	/// may be stale the moment it is read.
	pub fn get_order(&self, id: &str) -> Result<Arc<Order>, OrderError> {
		self.registry
			.get_order(id)
			.ok_or_else(|| OrderError::NotFound(id.to_string()))
	}

	/// Snapshot of an order for API consumers.
	pub fn get_order_view(&self, id: &str) -> Result<OrderView, OrderError> {
		Ok(self.get_order(id)?.view())
	}

	/// Requests deletion of an order: it moves to CLOSED and the reaper
	/// tears the provider instance down on its next sweep. Deleting an
	/// order that is already CLOSED is a caller error.
	pub fn delete_order(&self, id: &str) -> Result<(), OrderError> {
		let order = self.get_order(id)?;
		let _guard = order.lock();
		match order.state() {
			Some(OrderState::Closed) => Err(OrderError::AlreadyClosed(id.to_string())),
			Some(_) => {
				transition(&self.registry, &order, OrderState::Closed)?;
				tracing::info!(order_id = %id, "order closed on user request");
				Ok(())
			}
			None => Err(OrderError::NotFound(id.to_string())),
		}
	}

	/// Applies a state change reported by the remote federation member
	/// provisioning this order. The change goes through the ordinary
	/// transition path, so membership bookkeeping is identical to a
	/// locally driven move.
	pub fn handle_remote_event(
		&self,
		id: &str,
		target_state: OrderState,
	) -> Result<(), OrderError> {
		let order = self.get_order(id)?;
		let _guard = order.lock();
		transition(&self.registry, &order, target_state)?;
		tracing::info!(
			order_id = %id,
			state = %target_state,
			provider = %order.provider(),
			"applied remote state event"
		);
		Ok(())
	}
}
