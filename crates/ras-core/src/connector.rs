//! The seam between the lifecycle core and cloud plugins.
//!
//! The core never talks to a cloud directly and never interprets a
//! provider's status vocabulary. Each resource kind is served by a
//! [`ResourcePlugin`] trait object; the [`CloudConnector`] is the
//! per-deployment map from resource kind to plugin, built from
//! configuration at startup.

use crate::order::Order;
use async_trait::async_trait;
use ras_types::ResourceType;
use std::collections::HashMap;
use thiserror::Error;

/// Errors surfaced by cloud plugins and the connector.
#[derive(Debug, Error)]
pub enum ConnectorError {
	/// No plugin is configured for the order's resource kind.
	#[error("no plugin is configured for resource type {0}")]
	UnsupportedResource(ResourceType),
	/// The provider no longer knows the instance.
	#[error("instance {0} was not found at the provider")]
	InstanceNotFound(String),
	/// The order has no provider instance yet, so there is nothing to
	/// query or delete.
	#[error("order {0} has no instance")]
	NoInstance(String),
	/// The provider rejected or failed the request.
	#[error("provider request failed: {0}")]
	Request(String),
	/// The plugin's configuration table is invalid.
	#[error("plugin configuration error: {0}")]
	Configuration(String),
}

/// Capability contract a cloud implementation offers for one resource
/// kind.
///
/// `is_ready` and `has_failed` classify the provider's own status
/// vocabulary; all interpretation of provider status strings lives
/// behind these two methods.
#[async_trait]
pub trait ResourcePlugin: Send + Sync {
	/// Whether a provider status string means the resource is ready
	/// for use.
	fn is_ready(&self, provider_status: &str) -> bool;

	/// Whether a provider status string is a terminal provider-side
	/// failure.
	fn has_failed(&self, provider_status: &str) -> bool;

	/// Asks the provider to create the resource. Returns the
	/// provider-assigned instance id; provisioning usually continues
	/// asynchronously after this returns.
	async fn request_instance(&self, order: &Order) -> Result<String, ConnectorError>;

	/// Fetches the provider's current status string for the order's
	/// instance.
	async fn instance_status(&self, order: &Order) -> Result<String, ConnectorError>;

	/// Asks the provider to delete the order's instance. Deleting an
	/// instance the provider no longer knows yields
	/// [`ConnectorError::InstanceNotFound`].
	async fn delete_instance(&self, order: &Order) -> Result<(), ConnectorError>;
}

/// Type alias for plugin factory functions.
///
/// This is the signature every plugin implementation provides to build
/// an instance from its raw configuration table.
pub type PluginFactory = fn(&toml::Value) -> Result<Box<dyn ResourcePlugin>, ConnectorError>;

/// Map from resource kind to the plugin serving it.
pub struct CloudConnector {
	plugins: HashMap<ResourceType, Box<dyn ResourcePlugin>>,
}

impl CloudConnector {
	pub fn new(plugins: HashMap<ResourceType, Box<dyn ResourcePlugin>>) -> Self {
		Self { plugins }
	}

	/// Returns the plugin serving `resource_type`.
	pub fn plugin(&self, resource_type: ResourceType) -> Result<&dyn ResourcePlugin, ConnectorError> {
		self.plugins
			.get(&resource_type)
			.map(|plugin| plugin.as_ref())
			.ok_or(ConnectorError::UnsupportedResource(resource_type))
	}

	/// Requests an instance for the order from its plugin.
	pub async fn request_instance(&self, order: &Order) -> Result<String, ConnectorError> {
		self.plugin(order.resource_type())?
			.request_instance(order)
			.await
	}

	/// Fetches the provider status string for the order's instance.
	pub async fn instance_status(&self, order: &Order) -> Result<String, ConnectorError> {
		self.plugin(order.resource_type())?
			.instance_status(order)
			.await
	}

	/// Deletes the order's instance at the provider.
	pub async fn delete_instance(&self, order: &Order) -> Result<(), ConnectorError> {
		self.plugin(order.resource_type())?
			.delete_instance(order)
			.await
	}
}

#[cfg(test)]
pub(crate) mod test_support {
	use super::*;
	use std::collections::HashMap as StdHashMap;
	use std::sync::Mutex;

	/// Scriptable plugin for processor tests: per-order canned status
	/// strings, plus counters for provisioning and teardown calls.
	pub struct ScriptedPlugin {
		statuses: Mutex<StdHashMap<String, Result<String, String>>>,
		pub requested: Mutex<Vec<String>>,
		pub deleted: Mutex<Vec<String>>,
		fail_requests: bool,
	}

	impl ScriptedPlugin {
		pub fn new() -> Self {
			Self {
				statuses: Mutex::new(StdHashMap::new()),
				requested: Mutex::new(Vec::new()),
				deleted: Mutex::new(Vec::new()),
				fail_requests: false,
			}
		}

		pub fn failing_requests() -> Self {
			Self {
				fail_requests: true,
				..Self::new()
			}
		}

		pub fn set_status(&self, order_id: &str, status: &str) {
			self.statuses
				.lock()
				.unwrap()
				.insert(order_id.to_string(), Ok(status.to_string()));
		}

		pub fn set_missing(&self, order_id: &str) {
			self.statuses
				.lock()
				.unwrap()
				.insert(order_id.to_string(), Err("missing".to_string()));
		}
	}

	#[async_trait]
	impl ResourcePlugin for ScriptedPlugin {
		fn is_ready(&self, provider_status: &str) -> bool {
			provider_status == "active"
		}

		fn has_failed(&self, provider_status: &str) -> bool {
			provider_status == "error"
		}

		async fn request_instance(&self, order: &Order) -> Result<String, ConnectorError> {
			if self.fail_requests {
				return Err(ConnectorError::Request("quota exceeded".into()));
			}
			self.requested.lock().unwrap().push(order.id().to_string());
			Ok(format!("instance-{}", order.id()))
		}

		async fn instance_status(&self, order: &Order) -> Result<String, ConnectorError> {
			match self.statuses.lock().unwrap().get(order.id()) {
				Some(Ok(status)) => Ok(status.clone()),
				Some(Err(_)) => Err(ConnectorError::InstanceNotFound(
					order.instance_id().unwrap_or_default(),
				)),
				None => Err(ConnectorError::Request("no scripted status".into())),
			}
		}

		async fn delete_instance(&self, order: &Order) -> Result<(), ConnectorError> {
			self.deleted.lock().unwrap().push(order.id().to_string());
			Ok(())
		}
	}

	#[async_trait]
	impl ResourcePlugin for std::sync::Arc<ScriptedPlugin> {
		fn is_ready(&self, provider_status: &str) -> bool {
			self.as_ref().is_ready(provider_status)
		}

		fn has_failed(&self, provider_status: &str) -> bool {
			self.as_ref().has_failed(provider_status)
		}

		async fn request_instance(&self, order: &Order) -> Result<String, ConnectorError> {
			self.as_ref().request_instance(order).await
		}

		async fn instance_status(&self, order: &Order) -> Result<String, ConnectorError> {
			self.as_ref().instance_status(order).await
		}

		async fn delete_instance(&self, order: &Order) -> Result<(), ConnectorError> {
			self.as_ref().delete_instance(order).await
		}
	}

	/// Connector serving every resource kind from one shared scripted
	/// plugin, so tests can steer and observe it after construction.
	pub fn scripted_connector(plugin: std::sync::Arc<ScriptedPlugin>) -> CloudConnector {
		let mut plugins: HashMap<ResourceType, Box<dyn ResourcePlugin>> = HashMap::new();
		for resource_type in [
			ResourceType::Compute,
			ResourceType::Volume,
			ResourceType::Network,
			ResourceType::Attachment,
			ResourceType::PublicIp,
			ResourceType::SecurityRule,
		] {
			plugins.insert(resource_type, Box::new(plugin.clone()));
		}
		CloudConnector::new(plugins)
	}
}

#[cfg(test)]
mod tests {
	use super::test_support::ScriptedPlugin;
	use super::*;
	use crate::order::test_support::compute_order;

	#[tokio::test]
	async fn test_connector_routes_by_resource_type() {
		let plugin = ScriptedPlugin::new();
		let mut plugins: HashMap<ResourceType, Box<dyn ResourcePlugin>> = HashMap::new();
		plugins.insert(ResourceType::Compute, Box::new(plugin));
		let connector = CloudConnector::new(plugins);

		let order = compute_order("o1", "member-one");
		let instance = connector.request_instance(&order).await.unwrap();
		assert_eq!(instance, "instance-o1");
	}

	#[tokio::test]
	async fn test_missing_plugin_is_an_error() {
		let connector = CloudConnector::new(HashMap::new());
		let order = compute_order("o1", "member-one");
		let result = connector.instance_status(&order).await;
		assert!(matches!(
			result,
			Err(ConnectorError::UnsupportedResource(ResourceType::Compute))
		));
	}
}
