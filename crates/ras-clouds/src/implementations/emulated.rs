//! Emulated cloud plugin.
//!
//! Keeps instances in memory and walks them through a small status
//! vocabulary ("spawning" → "active"), which makes it useful for
//! development, demos, and driving the lifecycle processors in tests
//! without a real provider. The number of status polls an instance
//! spends in "spawning" is configurable.

use async_trait::async_trait;
use ras_core::{ConnectorError, Order, ResourcePlugin};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

const STATUS_SPAWNING: &str = "spawning";
const STATUS_ACTIVE: &str = "active";
const STATUS_ERROR: &str = "error";

struct EmulatedInstance {
	status: String,
	/// Status polls left before a "spawning" instance turns "active".
	polls_remaining: u64,
}

/// In-memory cloud implementation.
pub struct EmulatedCloud {
	instances: Arc<RwLock<HashMap<String, EmulatedInstance>>>,
	spawn_polls: u64,
}

impl EmulatedCloud {
	pub fn new(spawn_polls: u64) -> Self {
		Self {
			instances: Arc::new(RwLock::new(HashMap::new())),
			spawn_polls,
		}
	}

	/// Marks an instance broken, as a real provider would after a
	/// host failure. Later status queries answer "error".
	pub async fn fail_instance(&self, instance_id: &str) -> Result<(), ConnectorError> {
		let mut instances = self.instances.write().await;
		match instances.get_mut(instance_id) {
			Some(instance) => {
				instance.status = STATUS_ERROR.to_string();
				Ok(())
			}
			None => Err(ConnectorError::InstanceNotFound(instance_id.to_string())),
		}
	}

	/// Number of instances currently emulated.
	pub async fn instance_count(&self) -> usize {
		self.instances.read().await.len()
	}

	fn instance_of(order: &Order) -> Result<String, ConnectorError> {
		order
			.instance_id()
			.ok_or_else(|| ConnectorError::NoInstance(order.id().to_string()))
	}
}

impl Default for EmulatedCloud {
	fn default() -> Self {
		Self::new(1)
	}
}

#[async_trait]
impl ResourcePlugin for EmulatedCloud {
	fn is_ready(&self, provider_status: &str) -> bool {
		provider_status == STATUS_ACTIVE
	}

	fn has_failed(&self, provider_status: &str) -> bool {
		provider_status == STATUS_ERROR
	}

	async fn request_instance(&self, order: &Order) -> Result<String, ConnectorError> {
		let instance_id = format!("{}-{}", order.resource_type(), Uuid::new_v4());
		let mut instances = self.instances.write().await;
		instances.insert(
			instance_id.clone(),
			EmulatedInstance {
				status: STATUS_SPAWNING.to_string(),
				polls_remaining: self.spawn_polls,
			},
		);
		tracing::debug!(order_id = %order.id(), instance_id = %instance_id, "emulated instance created");
		Ok(instance_id)
	}

	async fn instance_status(&self, order: &Order) -> Result<String, ConnectorError> {
		let instance_id = Self::instance_of(order)?;
		let mut instances = self.instances.write().await;
		match instances.get_mut(&instance_id) {
			Some(instance) => {
				if instance.status == STATUS_SPAWNING {
					if instance.polls_remaining > 0 {
						instance.polls_remaining -= 1;
					} else {
						instance.status = STATUS_ACTIVE.to_string();
					}
				}
				Ok(instance.status.clone())
			}
			None => Err(ConnectorError::InstanceNotFound(instance_id)),
		}
	}

	async fn delete_instance(&self, order: &Order) -> Result<(), ConnectorError> {
		let instance_id = Self::instance_of(order)?;
		let mut instances = self.instances.write().await;
		match instances.remove(&instance_id) {
			Some(_) => {
				tracing::debug!(order_id = %order.id(), instance_id = %instance_id, "emulated instance deleted");
				Ok(())
			}
			None => Err(ConnectorError::InstanceNotFound(instance_id)),
		}
	}
}

/// Factory function to create an emulated cloud plugin from
/// configuration.
///
/// Configuration parameters:
/// - `spawn_polls` (optional, default 1): status polls an instance
///   answers "spawning" before turning "active"
pub fn create_plugin(config: &toml::Value) -> Result<Box<dyn ResourcePlugin>, ConnectorError> {
	let spawn_polls = match config.get("spawn_polls") {
		Some(value) => value.as_integer().filter(|polls| *polls >= 0).ok_or_else(|| {
			ConnectorError::Configuration("spawn_polls must be a non-negative integer".into())
		})? as u64,
		None => 1,
	};
	Ok(Box::new(EmulatedCloud::new(spawn_polls)))
}
