//! Processor for orders in the OPEN state.
//!
//! Dispatches accepted orders for provisioning: locally provided
//! orders get an instance requested from the cloud plugin and move to
//! SPAWNING (or FAILED when the provider refuses); remotely provided
//! orders move to PENDING and advance only through remote events.

use crate::connector::CloudConnector;
use crate::lists::OrderList;
use crate::order::Order;
use crate::registry::OrderRegistry;
use crate::transition::{transition, TransitionError};
use ras_types::OrderState;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

pub struct OpenProcessor {
	registry: Arc<OrderRegistry>,
	connector: Arc<CloudConnector>,
	local_member_id: String,
	open_orders: Arc<OrderList>,
	/// Delay between full scans when the list has been exhausted.
	sleep: Duration,
}

impl OpenProcessor {
	pub fn new(
		registry: Arc<OrderRegistry>,
		connector: Arc<CloudConnector>,
		local_member_id: impl Into<String>,
		sleep: Duration,
	) -> Self {
		let open_orders = registry.list(OrderState::Open).clone();
		Self {
			registry,
			connector,
			local_member_id: local_member_id.into(),
			open_orders,
			sleep,
		}
	}

	/// Iterates over the open orders list, one order per iteration.
	/// An exhausted cursor marks the end of a sweep: the pointer is
	/// reset and the task sleeps before the next pass.
	pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
		tracing::info!("open orders processor started");
		loop {
			if *shutdown.borrow() {
				break;
			}
			match self.open_orders.get_next() {
				Some(order) => {
					if let Err(error) = self.process_open_order(&order).await {
						tracing::error!(
							order_id = %order.id(),
							%error,
							"error while processing open order"
						);
					}
				}
				None => {
					self.open_orders.reset_pointer();
					tokio::select! {
						_ = shutdown.changed() => {}
						_ = tokio::time::sleep(self.sleep) => {}
					}
				}
			}
		}
		tracing::info!("open orders processor stopped");
	}

	async fn process_open_order(&self, order: &Arc<Order>) -> Result<(), TransitionError> {
		// The scan may yield an order another actor already moved;
		// that means it was handled elsewhere, not an error.
		if order.state() != Some(OrderState::Open) {
			return Ok(());
		}

		if order.is_provider_remote(&self.local_member_id) {
			let _guard = order.lock();
			if order.state() != Some(OrderState::Open) {
				return Ok(());
			}
			transition(&self.registry, order, OrderState::Pending)?;
			tracing::info!(
				order_id = %order.id(),
				provider = %order.provider(),
				"order handed to remote provider"
			);
			return Ok(());
		}

		// The provisioning request is slow and must not run under the
		// order's scope; the outcome is re-validated afterwards.
		let request = self.connector.request_instance(order).await;

		let _guard = order.lock();
		match request {
			Ok(instance_id) => {
				// Record the instance even if the order moved meanwhile
				// (e.g. was deleted): the reaper needs the id to clean up.
				order.set_instance_id(instance_id);
				if order.state() != Some(OrderState::Open) {
					return Ok(());
				}
				transition(&self.registry, order, OrderState::Spawning)
			}
			Err(error) => {
				tracing::warn!(
					order_id = %order.id(),
					%error,
					"provider rejected the instance request"
				);
				if order.state() != Some(OrderState::Open) {
					return Ok(());
				}
				order.record_fault(error.to_string());
				transition(&self.registry, order, OrderState::Failed)
			}
		}
	}
}
