//! Processor for orders in the FULFILLED state.
//!
//! Monitors resources that were delivered successfully, looking for
//! failures that may affect them afterwards. An instance the provider
//! reports broken, or no longer knows at all, moves its order to
//! FAILED.

use crate::connector::{CloudConnector, ConnectorError};
use crate::lists::OrderList;
use crate::order::Order;
use crate::processors::ProcessorError;
use crate::registry::OrderRegistry;
use crate::transition::transition;
use ras_types::OrderState;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

pub struct FulfilledProcessor {
	registry: Arc<OrderRegistry>,
	connector: Arc<CloudConnector>,
	local_member_id: String,
	fulfilled_orders: Arc<OrderList>,
	sleep: Duration,
}

impl FulfilledProcessor {
	pub fn new(
		registry: Arc<OrderRegistry>,
		connector: Arc<CloudConnector>,
		local_member_id: impl Into<String>,
		sleep: Duration,
	) -> Self {
		let fulfilled_orders = registry.list(OrderState::Fulfilled).clone();
		Self {
			registry,
			connector,
			local_member_id: local_member_id.into(),
			fulfilled_orders,
			sleep,
		}
	}

	pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
		tracing::info!("fulfilled orders processor started");
		loop {
			if *shutdown.borrow() {
				break;
			}
			match self.fulfilled_orders.get_next() {
				Some(order) => {
					if let Err(error) = self.process_fulfilled_order(&order).await {
						tracing::error!(
							order_id = %order.id(),
							%error,
							"error while processing fulfilled order"
						);
					}
				}
				None => {
					self.fulfilled_orders.reset_pointer();
					tokio::select! {
						_ = shutdown.changed() => {}
						_ = tokio::time::sleep(self.sleep) => {}
					}
				}
			}
		}
		tracing::info!("fulfilled orders processor stopped");
	}

	async fn process_fulfilled_order(&self, order: &Arc<Order>) -> Result<(), ProcessorError> {
		if order.state() != Some(OrderState::Fulfilled) {
			return Ok(());
		}
		if order.is_provider_remote(&self.local_member_id) {
			return Ok(());
		}

		let plugin = self.connector.plugin(order.resource_type())?;
		match plugin.instance_status(order).await {
			Ok(status) => {
				let _guard = order.lock();
				if order.state() != Some(OrderState::Fulfilled) {
					return Ok(());
				}
				if plugin.has_failed(&status) {
					tracing::info!(order_id = %order.id(), %status, "fulfilled instance failed");
					order.record_fault(format!("provider reported status '{status}'"));
					transition(&self.registry, order, OrderState::Failed)?;
				}
				Ok(())
			}
			Err(ConnectorError::InstanceNotFound(instance)) => {
				let _guard = order.lock();
				if order.state() != Some(OrderState::Fulfilled) {
					return Ok(());
				}
				tracing::info!(
					order_id = %order.id(),
					instance_id = %instance,
					"fulfilled instance vanished from the provider"
				);
				order.record_fault("instance no longer exists at the provider");
				transition(&self.registry, order, OrderState::Failed)?;
				Ok(())
			}
			// Transient query problems leave the order for the next
			// sweep.
			Err(error) => Err(error.into()),
		}
	}
}
