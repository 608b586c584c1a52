//! Order state transitions.
//!
//! Every change to an order's lifecycle state goes through this
//! module, and nowhere else: a transition removes the order from the
//! list bound to its current state, updates the state field, and
//! appends it to the destination list, so state field and list
//! membership can never drift apart.

use crate::lists::ListError;
use crate::order::Order;
use crate::registry::OrderRegistry;
use ras_types::OrderState;
use std::sync::Arc;
use thiserror::Error;

/// Recoverable transition failures.
///
/// These indicate that the caller observed stale state or raced with
/// another thread; the order is left exactly as it was. Callers re-read
/// the state and retry, or log and move on (what the processors do
/// during a sweep).
#[derive(Debug, Error)]
pub enum TransitionError {
	#[error("order {id} is already {state}")]
	AlreadyInState { id: String, state: OrderState },
	#[error("could not remove order {id} from the list of {state} orders")]
	RemovalFailed { id: String, state: OrderState },
	#[error("order {0} has not been activated")]
	NotActive(String),
	/// The destination list rejected the order even though removal from
	/// the origin succeeded. Membership is inconsistent; this means the
	/// caller broke the per-order locking discipline.
	#[error("could not add order {id} to the list of {state} orders: {source}")]
	InsertFailed {
		id: String,
		state: OrderState,
		source: ListError,
	},
}

/// Errors from activating a detached order.
#[derive(Debug, Error)]
pub enum ActivationError {
	#[error("order {0} is already being managed")]
	AlreadyActive(String),
	#[error(transparent)]
	List(#[from] ListError),
}

/// Registers a freshly created, detached order: assigns the OPEN
/// state, inserts the order into the id index, and appends it to the
/// OPEN list. This is the only way a new order enters a registry.
pub fn activate_order(
	registry: &OrderRegistry,
	order: Order,
) -> Result<Arc<Order>, ActivationError> {
	let order = Arc::new(order);
	let _guard = order.lock();
	match registry.active_orders().entry(order.id().to_string()) {
		dashmap::mapref::entry::Entry::Occupied(_) => {
			Err(ActivationError::AlreadyActive(order.id().to_string()))
		}
		dashmap::mapref::entry::Entry::Vacant(vacant) => {
			order.set_state(OrderState::Open);
			registry.list(OrderState::Open).add_item(order.clone())?;
			vacant.insert(order.clone());
			drop(_guard);
			tracing::info!(order_id = %order.id(), "order activated");
			Ok(order)
		}
	}
}

/// Moves an order from its current state to `new_state`.
///
/// The move is a remove-update-append sequence: the order is unlinked
/// from the origin list, its state field is set, and it is appended to
/// the destination list. If the origin removal fails (the order was
/// not where its state field said) nothing at all is mutated.
///
/// This function does not serialize concurrent callers working on the
/// same order: it is a primitive, and the caller owns the critical
/// section. Hold [`Order::lock`] from the moment the state is
/// inspected until this call returns; otherwise two threads can both
/// decide to move the same order based on the same stale read, and the
/// loser gets [`TransitionError::RemovalFailed`].
pub fn transition(
	registry: &OrderRegistry,
	order: &Arc<Order>,
	new_state: OrderState,
) -> Result<(), TransitionError> {
	let current = order
		.state()
		.ok_or_else(|| TransitionError::NotActive(order.id().to_string()))?;

	if current == new_state {
		return Err(TransitionError::AlreadyInState {
			id: order.id().to_string(),
			state: current,
		});
	}

	let origin = registry.list(current);
	let destination = registry.list(new_state);

	if !origin.remove_item(order) {
		return Err(TransitionError::RemovalFailed {
			id: order.id().to_string(),
			state: current,
		});
	}

	order.set_state(new_state);
	destination
		.add_item(order.clone())
		.map_err(|source| TransitionError::InsertFailed {
			id: order.id().to_string(),
			state: new_state,
			source,
		})?;

	tracing::debug!(
		order_id = %order.id(),
		from = %current,
		to = %new_state,
		"order transitioned"
	);
	Ok(())
}

/// Forgets a CLOSED order: removes it from the id index and from the
/// CLOSED list. After this the order is unreachable through the
/// registry and its memory is released once the last caller drops its
/// reference.
pub fn deactivate_order(registry: &OrderRegistry, order: &Arc<Order>) {
	let _guard = order.lock();
	// CLOSED is terminal, but an ill-behaved event source could still
	// move the order while the reaper was deciding; re-check under the
	// order's scope before forgetting it.
	if order.state() != Some(OrderState::Closed) {
		tracing::error!(
			order_id = %order.id(),
			"tried to deactivate an order that is no longer closed"
		);
		return;
	}
	if registry.active_orders().remove(order.id()).is_none() {
		tracing::error!(
			order_id = %order.id(),
			"tried to remove order from the active orders but it was not active"
		);
	}
	registry.list(OrderState::Closed).remove_item(order);
	tracing::info!(order_id = %order.id(), "order deactivated");
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::order::test_support::{compute_order, volume_order};

	fn activated(registry: &OrderRegistry, id: &str) -> Arc<Order> {
		activate_order(registry, compute_order(id, "member-one")).unwrap()
	}

	/// The state an order's own field claims must match the single list
	/// that actually holds it.
	fn assert_membership(registry: &OrderRegistry, order: &Arc<Order>, expected: OrderState) {
		assert_eq!(order.state(), Some(expected));
		for state in OrderState::VALUES {
			let list = registry.list(state);
			list.reset_pointer();
			let mut found = false;
			while let Some(member) = list.get_next() {
				if member.id() == order.id() {
					found = true;
				}
			}
			assert_eq!(
				found,
				state == expected,
				"order {} membership wrong for state {}",
				order.id(),
				state
			);
		}
	}

	#[test]
	fn test_activation_places_order_in_open() {
		let registry = OrderRegistry::new();
		let order = activated(&registry, "o1");
		assert!(registry.is_active("o1"));
		assert_membership(&registry, &order, OrderState::Open);
	}

	#[test]
	fn test_activation_rejects_duplicate_id() {
		let registry = OrderRegistry::new();
		activated(&registry, "o1");
		let result = activate_order(&registry, compute_order("o1", "member-one"));
		assert!(matches!(result, Err(ActivationError::AlreadyActive(id)) if id == "o1"));
		// The first activation is untouched.
		assert_eq!(registry.list(OrderState::Open).len(), 1);
	}

	#[test]
	fn test_transition_moves_between_lists() {
		let registry = OrderRegistry::new();
		let order = activated(&registry, "o1");

		transition(&registry, &order, OrderState::Spawning).unwrap();

		assert!(registry.list(OrderState::Open).is_empty());
		assert_membership(&registry, &order, OrderState::Spawning);
	}

	#[test]
	fn test_self_transition_is_rejected_without_mutation() {
		let registry = OrderRegistry::new();
		let order = activated(&registry, "o1");

		let result = transition(&registry, &order, OrderState::Open);
		assert!(matches!(
			result,
			Err(TransitionError::AlreadyInState { state: OrderState::Open, .. })
		));
		assert_membership(&registry, &order, OrderState::Open);
	}

	#[test]
	fn test_transition_of_detached_order_fails() {
		let registry = OrderRegistry::new();
		let order = Arc::new(compute_order("o1", "member-one"));
		let result = transition(&registry, &order, OrderState::Spawning);
		assert!(matches!(result, Err(TransitionError::NotActive(_))));
	}

	#[test]
	fn test_failed_removal_leaves_order_untouched() {
		let registry = OrderRegistry::new();
		let order = activated(&registry, "o1");

		// Pull the order out of its list behind the transitioner's
		// back, simulating a racing actor that already moved it.
		assert!(registry.list(OrderState::Open).remove_item(&order));

		let result = transition(&registry, &order, OrderState::Spawning);
		assert!(matches!(
			result,
			Err(TransitionError::RemovalFailed { state: OrderState::Open, .. })
		));
		// No half-applied move: state field unchanged, destination
		// still empty.
		assert_eq!(order.state(), Some(OrderState::Open));
		assert!(registry.list(OrderState::Spawning).is_empty());
	}

	#[test]
	fn test_full_lifecycle_walkthrough() {
		let registry = OrderRegistry::new();
		let order = activated(&registry, "o1");
		assert_membership(&registry, &order, OrderState::Open);

		transition(&registry, &order, OrderState::Spawning).unwrap();
		assert!(registry.list(OrderState::Open).is_empty());
		assert_membership(&registry, &order, OrderState::Spawning);

		transition(&registry, &order, OrderState::Fulfilled).unwrap();
		assert!(registry.list(OrderState::Spawning).is_empty());
		assert_membership(&registry, &order, OrderState::Fulfilled);

		transition(&registry, &order, OrderState::Failed).unwrap();
		assert!(registry.list(OrderState::Fulfilled).is_empty());
		assert_membership(&registry, &order, OrderState::Failed);
		assert_eq!(order.state(), Some(OrderState::Failed));
	}

	#[test]
	fn test_deactivation_forgets_the_order() {
		let registry = OrderRegistry::new();
		let order = activated(&registry, "o1");
		transition(&registry, &order, OrderState::Closed).unwrap();

		deactivate_order(&registry, &order);

		assert!(!registry.is_active("o1"));
		assert!(registry.list(OrderState::Closed).is_empty());
	}

	#[test]
	fn test_concurrent_disjoint_transitions_do_not_interfere() {
		use std::thread;

		let registry = Arc::new(OrderRegistry::new());
		let a = activate_order(&registry, compute_order("a", "member-one")).unwrap();
		let b = activate_order(&registry, volume_order("b", "member-one")).unwrap();

		let ta = {
			let registry = registry.clone();
			let a = a.clone();
			thread::spawn(move || {
				for _ in 0..500 {
					let _guard = a.lock();
					transition(&registry, &a, OrderState::Spawning).unwrap();
					transition(&registry, &a, OrderState::Open).unwrap();
				}
			})
		};
		let tb = {
			let registry = registry.clone();
			let b = b.clone();
			thread::spawn(move || {
				for _ in 0..500 {
					let _guard = b.lock();
					transition(&registry, &b, OrderState::Fulfilled).unwrap();
					transition(&registry, &b, OrderState::Open).unwrap();
				}
			})
		};
		ta.join().unwrap();
		tb.join().unwrap();

		assert_membership(&registry, &a, OrderState::Open);
		assert_membership(&registry, &b, OrderState::Open);
		assert_eq!(registry.list(OrderState::Open).len(), 2);
		assert!(registry.list(OrderState::Spawning).is_empty());
		assert!(registry.list(OrderState::Fulfilled).is_empty());
	}

	#[test]
	fn test_racing_transitions_on_one_order_leave_it_consistent() {
		use std::thread;

		let registry = Arc::new(OrderRegistry::new());
		let order = activated(&registry, "o1");

		// Two threads both try to move the same order out of OPEN.
		// Exactly one wins; the loser sees a recoverable error.
		let mut handles = Vec::new();
		for target in [OrderState::Spawning, OrderState::Failed] {
			let registry = registry.clone();
			let order = order.clone();
			handles.push(thread::spawn(move || {
				let _guard = order.lock();
				if order.state() == Some(OrderState::Open) {
					transition(&registry, &order, target).is_ok()
				} else {
					false
				}
			}));
		}
		let wins: usize = handles
			.into_iter()
			.map(|h| usize::from(h.join().unwrap()))
			.sum();

		assert_eq!(wins, 1);
		let final_state = order.state().unwrap();
		assert!(matches!(
			final_state,
			OrderState::Spawning | OrderState::Failed
		));
		assert_membership(&registry, &order, final_state);
	}
}
