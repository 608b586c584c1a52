//! Processor for orders in the SPAWNING state.
//!
//! Watches instances the provider is still bringing up. When the
//! provider reports the instance ready the order moves to FULFILLED;
//! a terminal provider status moves it to FAILED.

use crate::connector::CloudConnector;
use crate::lists::OrderList;
use crate::order::Order;
use crate::processors::ProcessorError;
use crate::registry::OrderRegistry;
use crate::transition::transition;
use ras_types::OrderState;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

pub struct SpawningProcessor {
	registry: Arc<OrderRegistry>,
	connector: Arc<CloudConnector>,
	local_member_id: String,
	spawning_orders: Arc<OrderList>,
	sleep: Duration,
}

impl SpawningProcessor {
	pub fn new(
		registry: Arc<OrderRegistry>,
		connector: Arc<CloudConnector>,
		local_member_id: impl Into<String>,
		sleep: Duration,
	) -> Self {
		let spawning_orders = registry.list(OrderState::Spawning).clone();
		Self {
			registry,
			connector,
			local_member_id: local_member_id.into(),
			spawning_orders,
			sleep,
		}
	}

	pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
		tracing::info!("spawning orders processor started");
		loop {
			if *shutdown.borrow() {
				break;
			}
			match self.spawning_orders.get_next() {
				Some(order) => {
					if let Err(error) = self.process_spawning_order(&order).await {
						tracing::error!(
							order_id = %order.id(),
							%error,
							"error while processing spawning order"
						);
					}
				}
				None => {
					self.spawning_orders.reset_pointer();
					tokio::select! {
						_ = shutdown.changed() => {}
						_ = tokio::time::sleep(self.sleep) => {}
					}
				}
			}
		}
		tracing::info!("spawning orders processor stopped");
	}

	async fn process_spawning_order(&self, order: &Arc<Order>) -> Result<(), ProcessorError> {
		if order.state() != Some(OrderState::Spawning) {
			return Ok(());
		}
		// Remote orders are monitored by the member that provisions
		// them; their state changes arrive as remote events.
		if order.is_provider_remote(&self.local_member_id) {
			return Ok(());
		}

		let plugin = self.connector.plugin(order.resource_type())?;
		// Slow provider query, outside the order's scope.
		let status = plugin.instance_status(order).await?;

		let _guard = order.lock();
		if order.state() != Some(OrderState::Spawning) {
			return Ok(());
		}
		if plugin.has_failed(&status) {
			tracing::info!(order_id = %order.id(), %status, "instance failed while spawning");
			order.record_fault(format!("provider reported status '{status}'"));
			transition(&self.registry, order, OrderState::Failed)?;
		} else if plugin.is_ready(&status) {
			tracing::info!(order_id = %order.id(), "instance is ready");
			transition(&self.registry, order, OrderState::Fulfilled)?;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::connector::test_support::{scripted_connector, ScriptedPlugin};
	use crate::order::test_support::compute_order;
	use crate::transition::activate_order;

	fn spawning_order(registry: &OrderRegistry, id: &str, provider: &str) -> Arc<Order> {
		let order = activate_order(registry, compute_order(id, provider)).unwrap();
		{
			let _guard = order.lock();
			transition(registry, &order, OrderState::Spawning).unwrap();
		}
		order
	}

	fn processor(plugin: Arc<ScriptedPlugin>, registry: Arc<OrderRegistry>) -> SpawningProcessor {
		SpawningProcessor::new(
			registry,
			Arc::new(scripted_connector(plugin)),
			"member-one",
			Duration::from_millis(1),
		)
	}

	#[tokio::test]
	async fn test_ready_instance_fulfills_the_order() {
		let registry = Arc::new(OrderRegistry::new());
		let plugin = Arc::new(ScriptedPlugin::new());
		plugin.set_status("o1", "active");
		let order = spawning_order(&registry, "o1", "member-one");

		processor(plugin, registry.clone())
			.process_spawning_order(&order)
			.await
			.unwrap();

		assert_eq!(order.state(), Some(OrderState::Fulfilled));
		assert!(registry.list(OrderState::Spawning).is_empty());
		assert_eq!(registry.list(OrderState::Fulfilled).len(), 1);
	}

	#[tokio::test]
	async fn test_failed_instance_fails_the_order() {
		let registry = Arc::new(OrderRegistry::new());
		let plugin = Arc::new(ScriptedPlugin::new());
		plugin.set_status("o1", "error");
		let order = spawning_order(&registry, "o1", "member-one");

		processor(plugin, registry.clone())
			.process_spawning_order(&order)
			.await
			.unwrap();

		assert_eq!(order.state(), Some(OrderState::Failed));
		assert!(order.fault_message().unwrap().contains("error"));
	}

	#[tokio::test]
	async fn test_still_building_instance_is_left_in_place() {
		let registry = Arc::new(OrderRegistry::new());
		let plugin = Arc::new(ScriptedPlugin::new());
		plugin.set_status("o1", "build");
		let order = spawning_order(&registry, "o1", "member-one");

		processor(plugin, registry.clone())
			.process_spawning_order(&order)
			.await
			.unwrap();

		assert_eq!(order.state(), Some(OrderState::Spawning));
	}

	#[tokio::test]
	async fn test_remote_order_is_not_queried() {
		let registry = Arc::new(OrderRegistry::new());
		let plugin = Arc::new(ScriptedPlugin::new());
		plugin.set_status("o1", "active");
		let order = spawning_order(&registry, "o1", "member-two");

		processor(plugin, registry.clone())
			.process_spawning_order(&order)
			.await
			.unwrap();

		assert_eq!(order.state(), Some(OrderState::Spawning));
	}

	#[tokio::test]
	async fn test_status_query_error_propagates_and_leaves_the_order() {
		let registry = Arc::new(OrderRegistry::new());
		let plugin = Arc::new(ScriptedPlugin::new());
		let order = spawning_order(&registry, "o1", "member-one");

		let result = processor(plugin, registry.clone())
			.process_spawning_order(&order)
			.await;

		assert!(result.is_err());
		assert_eq!(order.state(), Some(OrderState::Spawning));
	}
}
