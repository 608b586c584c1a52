//! Processor for orders in the FAILED state.
//!
//! Keeps an eye on failed instances. Providers sometimes recover an
//! instance they had reported broken; when the status reads ready
//! again the order returns to FULFILLED. An instance the provider no
//! longer knows can never recover, so its order is closed.
//!
//! Orders that failed before an instance existed have nothing to
//! monitor and stay FAILED until the user deletes them.

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

pub struct FailedProcessor {
	registry: Arc<OrderRegistry>,
	connector: Arc<CloudConnector>,
	local_member_id: String,
	failed_orders: Arc<OrderList>,
	sleep: Duration,
}

impl FailedProcessor {
	pub fn new(
		registry: Arc<OrderRegistry>,
		connector: Arc<CloudConnector>,
		local_member_id: impl Into<String>,
		sleep: Duration,
	) -> Self {
		let failed_orders = registry.list(OrderState::Failed).clone();
		Self {
			registry,
			connector,
			local_member_id: local_member_id.into(),
			failed_orders,
			sleep,
		}
	}

	pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
		tracing::info!("failed orders processor started");
		loop {
			if *shutdown.borrow() {
				break;
			}
			match self.failed_orders.get_next() {
				Some(order) => {
					if let Err(error) = self.process_failed_order(&order).await {
						tracing::error!(
							order_id = %order.id(),
							%error,
							"error while processing failed order"
						);
					}
				}
				None => {
					self.failed_orders.reset_pointer();
					tokio::select! {
						_ = shutdown.changed() => {}
						_ = tokio::time::sleep(self.sleep) => {}
					}
				}
			}
		}
		tracing::info!("failed orders processor stopped");
	}

	async fn process_failed_order(&self, order: &Arc<Order>) -> Result<(), ProcessorError> {
		if order.state() != Some(OrderState::Failed) {
			return Ok(());
		}
		if order.is_provider_remote(&self.local_member_id) {
			return Ok(());
		}
		// Failed before an instance was ever assigned: nothing to watch.
		if order.instance_id().is_none() {
			return Ok(());
		}

		let plugin = self.connector.plugin(order.resource_type())?;
		match plugin.instance_status(order).await {
			Ok(status) if plugin.is_ready(&status) => {
				let _guard = order.lock();
				if order.state() != Some(OrderState::Failed) {
					return Ok(());
				}
				tracing::info!(order_id = %order.id(), "failed instance recovered");
				order.clear_fault();
				transition(&self.registry, order, OrderState::Fulfilled)?;
				Ok(())
			}
			Ok(_) => Ok(()),
			Err(ConnectorError::InstanceNotFound(instance)) => {
				let _guard = order.lock();
				if order.state() != Some(OrderState::Failed) {
					return Ok(());
				}
				tracing::info!(
					order_id = %order.id(),
					instance_id = %instance,
					"failed instance is gone; closing the order"
				);
				transition(&self.registry, order, OrderState::Closed)?;
				Ok(())
			}
			Err(error) => Err(error.into()),
		}
	}
}
