//! Processor for orders in the CLOSED state.
//!
//! The reaper. Deletes the provider instance of a closed order, when
//! there is one, and then forgets the order entirely: it leaves the
//! CLOSED list and the id index, and its memory goes with the last
//! reference. Some providers delete synchronously, some do not; the
//! delete call is treated as idempotent either way, so a crash between
//! deletion and deactivation just repeats the delete on the next
//! sweep.

use crate::connector::{CloudConnector, ConnectorError};
use crate::lists::OrderList;
use crate::order::Order;
use crate::processors::ProcessorError;
use crate::registry::OrderRegistry;
use crate::transition::deactivate_order;
use ras_types::OrderState;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

pub struct ClosedProcessor {
	registry: Arc<OrderRegistry>,
	connector: Arc<CloudConnector>,
	local_member_id: String,
	closed_orders: Arc<OrderList>,
	sleep: Duration,
}

impl ClosedProcessor {
	pub fn new(
		registry: Arc<OrderRegistry>,
		connector: Arc<CloudConnector>,
		local_member_id: impl Into<String>,
		sleep: Duration,
	) -> Self {
		let closed_orders = registry.list(OrderState::Closed).clone();
		Self {
			registry,
			connector,
			local_member_id: local_member_id.into(),
			closed_orders,
			sleep,
		}
	}

	pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
		tracing::info!("closed orders processor started");
		loop {
			if *shutdown.borrow() {
				break;
			}
			match self.closed_orders.get_next() {
				Some(order) => {
					if let Err(error) = self.process_closed_order(&order).await {
						tracing::error!(
							order_id = %order.id(),
							%error,
							"error while processing closed order"
						);
					}
				}
				None => {
					self.closed_orders.reset_pointer();
					tokio::select! {
						_ = shutdown.changed() => {}
						_ = tokio::time::sleep(self.sleep) => {}
					}
				}
			}
		}
		tracing::info!("closed orders processor stopped");
	}

	async fn process_closed_order(&self, order: &Arc<Order>) -> Result<(), ProcessorError> {
		if order.state() != Some(OrderState::Closed) {
			return Ok(());
		}

		// Only locally provided instances are ours to delete; a remote
		// provider reaps its own side.
		if order.is_provider_local(&self.local_member_id) && order.instance_id().is_some() {
			match self.connector.delete_instance(order).await {
				Ok(()) => {}
				// Already gone at the provider: nothing left to do.
				Err(ConnectorError::InstanceNotFound(_)) => {}
				// Anything else is retried on the next sweep; the order
				// stays CLOSED until the delete goes through.
				Err(error) => return Err(error.into()),
			}
		}

		deactivate_order(&self.registry, order);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::connector::test_support::{scripted_connector, ScriptedPlugin};
	use crate::order::test_support::compute_order;
	use crate::transition::{activate_order, transition};

	fn closed_order(registry: &OrderRegistry, id: &str, provider: &str, instance: bool) -> Arc<Order> {
		let order = activate_order(registry, compute_order(id, provider)).unwrap();
		if instance {
			order.set_instance_id(format!("instance-{id}"));
		}
		{
			let _guard = order.lock();
			transition(registry, &order, OrderState::Closed).unwrap();
		}
		order
	}

	fn processor(plugin: Arc<ScriptedPlugin>, registry: Arc<OrderRegistry>) -> ClosedProcessor {
		ClosedProcessor::new(
			registry,
			Arc::new(scripted_connector(plugin)),
			"member-one",
			Duration::from_millis(1),
		)
	}

	#[tokio::test]
	async fn test_reaps_instance_and_forgets_the_order() {
		let registry = Arc::new(OrderRegistry::new());
		let plugin = Arc::new(ScriptedPlugin::new());
		let order = closed_order(&registry, "o1", "member-one", true);

		processor(plugin.clone(), registry.clone())
			.process_closed_order(&order)
			.await
			.unwrap();

		assert_eq!(plugin.deleted.lock().unwrap().as_slice(), ["o1"]);
		assert!(!registry.is_active("o1"));
		assert!(registry.list(OrderState::Closed).is_empty());
	}

	#[tokio::test]
	async fn test_order_without_instance_skips_the_provider() {
		let registry = Arc::new(OrderRegistry::new());
		let plugin = Arc::new(ScriptedPlugin::new());
		let order = closed_order(&registry, "o1", "member-one", false);

		processor(plugin.clone(), registry.clone())
			.process_closed_order(&order)
			.await
			.unwrap();

		assert!(plugin.deleted.lock().unwrap().is_empty());
		assert!(!registry.is_active("o1"));
	}

	#[tokio::test]
	async fn test_remote_order_is_forgotten_without_a_delete() {
		let registry = Arc::new(OrderRegistry::new());
		let plugin = Arc::new(ScriptedPlugin::new());
		let order = closed_order(&registry, "o1", "member-two", true);

		processor(plugin.clone(), registry.clone())
			.process_closed_order(&order)
			.await
			.unwrap();

		assert!(plugin.deleted.lock().unwrap().is_empty());
		assert!(!registry.is_active("o1"));
	}
}
