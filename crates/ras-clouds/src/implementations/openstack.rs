//! OpenStack compute plugin.
//!
//! Talks to a Nova-style compute API over REST. Provider status
//! strings are Nova's own (`ACTIVE`, `BUILD`, `ERROR`, ...), passed
//! through verbatim and classified only by `is_ready`/`has_failed`.
//!
//! Authentication is a pre-issued scoped token carried on every
//! request; token acquisition and renewal belong to the identity
//! subsystem, not to this plugin.

use async_trait::async_trait;
use ras_core::{ConnectorError, Order, ResourcePlugin};
use ras_types::OrderSpec;
use serde_json::json;

const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";
const STATUS_ACTIVE: &str = "ACTIVE";
const STATUS_ERROR: &str = "ERROR";

/// Compute plugin for OpenStack Nova.
pub struct OpenStackComputePlugin {
	client: reqwest::Client,
	/// Base URL of the compute endpoint, e.g. `http://cloud:8774/v2.1`.
	compute_url: String,
	auth_token: String,
	/// Flavor used for boot requests. Flavor selection against the
	/// requested sizing is done by the deployment, which configures an
	/// adequate flavor here.
	flavor_id: String,
}

impl OpenStackComputePlugin {
	pub fn new(
		compute_url: impl Into<String>,
		auth_token: impl Into<String>,
		flavor_id: impl Into<String>,
	) -> Self {
		Self {
			client: reqwest::Client::new(),
			compute_url: compute_url.into(),
			auth_token: auth_token.into(),
			flavor_id: flavor_id.into(),
		}
	}

	fn servers_url(&self) -> String {
		format!("{}/servers", self.compute_url)
	}

	fn server_url(&self, instance_id: &str) -> String {
		format!("{}/servers/{}", self.compute_url, instance_id)
	}

	fn instance_of(order: &Order) -> Result<String, ConnectorError> {
		order
			.instance_id()
			.ok_or_else(|| ConnectorError::NoInstance(order.id().to_string()))
	}
}

#[async_trait]
impl ResourcePlugin for OpenStackComputePlugin {
	fn is_ready(&self, provider_status: &str) -> bool {
		provider_status.eq_ignore_ascii_case(STATUS_ACTIVE)
	}

	fn has_failed(&self, provider_status: &str) -> bool {
		provider_status.eq_ignore_ascii_case(STATUS_ERROR)
	}

	async fn request_instance(&self, order: &Order) -> Result<String, ConnectorError> {
		let spec = match order.spec() {
			OrderSpec::Compute(spec) => spec,
			_ => {
				return Err(ConnectorError::Request(format!(
					"openstack compute plugin cannot serve {} orders",
					order.resource_type()
				)))
			}
		};

		let name = spec
			.name
			.clone()
			.unwrap_or_else(|| format!("ras-{}", order.id()));
		let mut server = json!({
			"name": name,
			"imageRef": spec.image_id,
			"flavorRef": self.flavor_id,
		});
		if let Some(user_data) = &spec.user_data {
			server["user_data"] = json!(user_data);
		}

		let response = self
			.client
			.post(self.servers_url())
			.header(AUTH_TOKEN_HEADER, &self.auth_token)
			.json(&json!({ "server": server }))
			.send()
			.await
			.map_err(|e| ConnectorError::Request(e.to_string()))?;

		if !response.status().is_success() {
			return Err(ConnectorError::Request(format!(
				"server creation returned {}",
				response.status()
			)));
		}

		let body: serde_json::Value = response
			.json()
			.await
			.map_err(|e| ConnectorError::Request(e.to_string()))?;
		body["server"]["id"]
			.as_str()
			.map(|id| id.to_string())
			.ok_or_else(|| {
				ConnectorError::Request("server creation response carried no id".into())
			})
	}

	async fn instance_status(&self, order: &Order) -> Result<String, ConnectorError> {
		let instance_id = Self::instance_of(order)?;
		let response = self
			.client
			.get(self.server_url(&instance_id))
			.header(AUTH_TOKEN_HEADER, &self.auth_token)
			.send()
			.await
			.map_err(|e| ConnectorError::Request(e.to_string()))?;

		if response.status() == reqwest::StatusCode::NOT_FOUND {
			return Err(ConnectorError::InstanceNotFound(instance_id));
		}
		if !response.status().is_success() {
			return Err(ConnectorError::Request(format!(
				"server query returned {}",
				response.status()
			)));
		}

		let body: serde_json::Value = response
			.json()
			.await
			.map_err(|e| ConnectorError::Request(e.to_string()))?;
		body["server"]["status"]
			.as_str()
			.map(|status| status.to_string())
			.ok_or_else(|| ConnectorError::Request("server query response carried no status".into()))
	}

	async fn delete_instance(&self, order: &Order) -> Result<(), ConnectorError> {
		let instance_id = Self::instance_of(order)?;
		let response = self
			.client
			.delete(self.server_url(&instance_id))
			.header(AUTH_TOKEN_HEADER, &self.auth_token)
			.send()
			.await
			.map_err(|e| ConnectorError::Request(e.to_string()))?;

		if response.status() == reqwest::StatusCode::NOT_FOUND {
			return Err(ConnectorError::InstanceNotFound(instance_id));
		}
		if !response.status().is_success() {
			return Err(ConnectorError::Request(format!(
				"server deletion returned {}",
				response.status()
			)));
		}
		tracing::debug!(order_id = %order.id(), instance_id = %instance_id, "nova server deleted");
		Ok(())
	}
}

/// Factory function to create an OpenStack compute plugin from
/// configuration.
///
/// Configuration parameters:
/// - `compute_url` (required): base URL of the Nova endpoint
/// - `auth_token` (required): pre-issued scoped token
/// - `flavor_id` (required): flavor used for boot requests
pub fn create_plugin(config: &toml::Value) -> Result<Box<dyn ResourcePlugin>, ConnectorError> {
	let field = |name: &str| -> Result<String, ConnectorError> {
		config
			.get(name)
			.and_then(|v| v.as_str())
			.map(|v| v.to_string())
			.ok_or_else(|| ConnectorError::Configuration(format!("{name} is required")))
	};
	Ok(Box::new(OpenStackComputePlugin::new(
		field("compute_url")?,
		field("auth_token")?,
		field("flavor_id")?,
	)))
}
