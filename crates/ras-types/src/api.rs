//! API types for HTTP endpoints and request/response structures.

use crate::{OrderSpec, OrderState, ResourceType, SystemUser};
use serde::{Deserialize, Serialize};

/// Request body for creating a new order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
	/// Resource parameters; the variant determines the resource kind.
	pub spec: OrderSpec,
	/// Federation member that should provision the resource. Defaults
	/// to the local member when omitted.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub provider: Option<String>,
	/// Which of the provider's clouds to use. Defaults to the
	/// provider's default cloud when omitted.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub cloud_name: Option<String>,
	/// The requesting user.
	pub user: SystemUser,
}

/// Response body for a successfully created order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderResponse {
	pub id: String,
}

/// Point-in-time view of an order, as returned by the query endpoint.
///
/// This is a snapshot: the order may transition the moment after the
/// view is taken.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderView {
	pub id: String,
	#[serde(rename = "resourceType")]
	pub resource_type: ResourceType,
	/// Current lifecycle state; absent only for orders that were never
	/// activated.
	pub state: Option<OrderState>,
	pub requester: String,
	pub provider: String,
	#[serde(rename = "cloudName")]
	pub cloud_name: String,
	/// Provider-assigned instance id, set once provisioning succeeded.
	#[serde(rename = "instanceId", skip_serializing_if = "Option::is_none")]
	pub instance_id: Option<String>,
	/// Why the order failed, when it did.
	#[serde(rename = "faultMessage", skip_serializing_if = "Option::is_none")]
	pub fault_message: Option<String>,
	/// Unix timestamp of order creation, in seconds.
	#[serde(rename = "createdAt")]
	pub created_at: u64,
}

/// Event received from a remote federation member about one of our
/// orders it provisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteOrderEvent {
	#[serde(rename = "orderId")]
	pub order_id: String,
	/// The state the remote member observed the order reach.
	pub state: OrderState,
}
