//! Background order processors.
//!
//! Each processor is a long-running task bound to one lifecycle
//! state's list. A sweep walks the list oldest-first via the cursor,
//! classifies each order's provider-side status through the cloud
//! connector, and drives the order onward through the transition
//! module. An error while handling one order is logged and never
//! aborts the sweep; the order simply stays where it is and is seen
//! again next time.
//!
//! Processors stop between orders, never in the middle of a
//! transition: shutdown is checked once per loop iteration, and the
//! in-memory transition itself never blocks.

use crate::connector::{CloudConnector, ConnectorError};
use crate::registry::OrderRegistry;
use crate::transition::TransitionError;
use ras_config::ProcessorsConfig;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub mod closed;
pub mod failed;
pub mod fulfilled;
pub mod open;
pub mod spawning;

pub use closed::ClosedProcessor;
pub use failed::FailedProcessor;
pub use fulfilled::FulfilledProcessor;
pub use open::OpenProcessor;
pub use spawning::SpawningProcessor;

/// Errors a processor can hit while handling a single order.
#[derive(Debug, Error)]
pub enum ProcessorError {
	#[error(transparent)]
	Transition(#[from] TransitionError),
	#[error(transparent)]
	Connector(#[from] ConnectorError),
}

/// Handle over the full set of running processors.
///
/// Construction spawns one task per processor; [`ProcessorSet::stop`]
/// signals shutdown and waits for every task to finish its current
/// order.
pub struct ProcessorSet {
	shutdown: watch::Sender<bool>,
	handles: Vec<JoinHandle<()>>,
}

impl ProcessorSet {
	/// Spawns all processors against the given registry and connector.
	pub fn start(
		registry: Arc<OrderRegistry>,
		connector: Arc<CloudConnector>,
		local_member_id: &str,
		config: &ProcessorsConfig,
	) -> Self {
		let (shutdown, rx) = watch::channel(false);
		let handles = vec![
			tokio::spawn(
				OpenProcessor::new(
					registry.clone(),
					connector.clone(),
					local_member_id,
					Duration::from_millis(config.open_sleep_ms),
				)
				.run(rx.clone()),
			),
			tokio::spawn(
				SpawningProcessor::new(
					registry.clone(),
					connector.clone(),
					local_member_id,
					Duration::from_millis(config.spawning_sleep_ms),
				)
				.run(rx.clone()),
			),
			tokio::spawn(
				FulfilledProcessor::new(
					registry.clone(),
					connector.clone(),
					local_member_id,
					Duration::from_millis(config.fulfilled_sleep_ms),
				)
				.run(rx.clone()),
			),
			tokio::spawn(
				FailedProcessor::new(
					registry.clone(),
					connector.clone(),
					local_member_id,
					Duration::from_millis(config.failed_sleep_ms),
				)
				.run(rx.clone()),
			),
			tokio::spawn(
				ClosedProcessor::new(
					registry,
					connector,
					local_member_id,
					Duration::from_millis(config.closed_sleep_ms),
				)
				.run(rx),
			),
		];
		Self { shutdown, handles }
	}

	/// Signals every processor to stop and waits for them.
	pub async fn stop(self) {
		self.shutdown.send(true).ok();
		for handle in self.handles {
			let _ = handle.await;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::connector::test_support::{scripted_connector, ScriptedPlugin};
	use crate::order::test_support::compute_order;
	use crate::transition::activate_order;
	use ras_types::OrderState;

	fn tight_config() -> ProcessorsConfig {
		ProcessorsConfig {
			open_sleep_ms: 1,
			spawning_sleep_ms: 1,
			fulfilled_sleep_ms: 1,
			failed_sleep_ms: 1,
			closed_sleep_ms: 1,
		}
	}

	async fn wait_for<F: Fn() -> bool>(condition: F) {
		for _ in 0..500 {
			if condition() {
				return;
			}
			tokio::time::sleep(Duration::from_millis(5)).await;
		}
		panic!("condition not reached in time");
	}

	#[tokio::test]
	async fn test_processors_drive_an_order_to_fulfilled() {
		let registry = Arc::new(OrderRegistry::new());
		let plugin = Arc::new(ScriptedPlugin::new());
		plugin.set_status("o1", "active");
		let connector = Arc::new(scripted_connector(plugin.clone()));

		let order = activate_order(&registry, compute_order("o1", "member-one")).unwrap();
		let set = ProcessorSet::start(
			registry.clone(),
			connector,
			"member-one",
			&tight_config(),
		);

		wait_for(|| order.state() == Some(OrderState::Fulfilled)).await;
		assert_eq!(order.instance_id().as_deref(), Some("instance-o1"));
		assert_eq!(registry.list(OrderState::Fulfilled).len(), 1);
		assert!(registry.list(OrderState::Open).is_empty());
		assert!(registry.list(OrderState::Spawning).is_empty());

		set.stop().await;
	}

	#[tokio::test]
	async fn test_deleted_order_is_reaped() {
		let registry = Arc::new(OrderRegistry::new());
		let plugin = Arc::new(ScriptedPlugin::new());
		plugin.set_status("o1", "active");
		let connector = Arc::new(scripted_connector(plugin.clone()));

		let order = activate_order(&registry, compute_order("o1", "member-one")).unwrap();
		let set = ProcessorSet::start(
			registry.clone(),
			connector,
			"member-one",
			&tight_config(),
		);
		wait_for(|| order.state() == Some(OrderState::Fulfilled)).await;

		{
			let _guard = order.lock();
			crate::transition::transition(&registry, &order, OrderState::Closed).unwrap();
		}
		wait_for(|| !registry.is_active("o1")).await;

		assert!(registry.list(OrderState::Closed).is_empty());
		assert_eq!(plugin.deleted.lock().unwrap().as_slice(), ["o1"]);

		set.stop().await;
	}

	#[tokio::test]
	async fn test_one_bad_order_does_not_stall_the_sweep() {
		let registry = Arc::new(OrderRegistry::new());
		let plugin = Arc::new(ScriptedPlugin::new());
		// "bad" has no scripted status, so every status query errors;
		// "good" becomes ready immediately.
		plugin.set_status("good", "active");
		let connector = Arc::new(scripted_connector(plugin.clone()));

		let bad = activate_order(&registry, compute_order("bad", "member-one")).unwrap();
		let good = activate_order(&registry, compute_order("good", "member-one")).unwrap();

		let set = ProcessorSet::start(
			registry.clone(),
			connector,
			"member-one",
			&tight_config(),
		);

		wait_for(|| good.state() == Some(OrderState::Fulfilled)).await;
		// The erroring order stays in SPAWNING for retry instead of
		// taking the sweep down with it.
		assert_eq!(bad.state(), Some(OrderState::Spawning));

		set.stop().await;
	}
}
