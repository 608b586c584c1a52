//! Resource kinds and their immutable request parameters.
//!
//! Every order targets exactly one resource kind. The parameters a
//! user supplies at creation time are captured in an [`OrderSpec`]
//! variant and never change afterwards; provisioning state lives in
//! the order itself, not here.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of cloud resource an order provisions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceType {
	Compute,
	Volume,
	Network,
	Attachment,
	PublicIp,
	SecurityRule,
}

impl fmt::Display for ResourceType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ResourceType::Compute => write!(f, "compute"),
			ResourceType::Volume => write!(f, "volume"),
			ResourceType::Network => write!(f, "network"),
			ResourceType::Attachment => write!(f, "attachment"),
			ResourceType::PublicIp => write!(f, "publicip"),
			ResourceType::SecurityRule => write!(f, "securityrule"),
		}
	}
}

/// Immutable request parameters, one variant per resource kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSpec {
	Compute(ComputeSpec),
	Volume(VolumeSpec),
	Network(NetworkSpec),
	Attachment(AttachmentSpec),
	PublicIp(PublicIpSpec),
	SecurityRule(SecurityRuleSpec),
}

impl OrderSpec {
	/// The resource kind this specification provisions.
	pub fn resource_type(&self) -> ResourceType {
		match self {
			OrderSpec::Compute(_) => ResourceType::Compute,
			OrderSpec::Volume(_) => ResourceType::Volume,
			OrderSpec::Network(_) => ResourceType::Network,
			OrderSpec::Attachment(_) => ResourceType::Attachment,
			OrderSpec::PublicIp(_) => ResourceType::PublicIp,
			OrderSpec::SecurityRule(_) => ResourceType::SecurityRule,
		}
	}
}

/// Parameters for a compute (virtual machine) request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputeSpec {
	/// Display name requested by the user, if any.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	/// Provider image to boot from.
	pub image_id: String,
	/// Minimum number of virtual CPUs.
	pub vcpus: u32,
	/// Minimum amount of RAM, in megabytes.
	pub memory_mb: u64,
	/// Minimum root disk size, in gigabytes.
	pub disk_gb: u64,
	/// Public SSH key to inject into the instance.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub public_key: Option<String>,
	/// Networks (by order id) the instance attaches to.
	#[serde(default)]
	pub network_order_ids: Vec<String>,
	/// Cloud-init user data, base64 encoded by the caller.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub user_data: Option<String>,
}

/// Parameters for a block storage volume request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeSpec {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	/// Volume size, in gigabytes.
	pub size_gb: u64,
}

/// Address allocation mode for a private network.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AllocationMode {
	Dynamic,
	Static,
}

/// Parameters for a private network request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSpec {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	/// Address range in CIDR notation.
	pub cidr: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub gateway: Option<String>,
	pub allocation_mode: AllocationMode,
}

/// Parameters for attaching a volume to a compute instance.
///
/// Both ends are referenced by order id; the orders must already be
/// FULFILLED before the provider can attach them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentSpec {
	pub compute_order_id: String,
	pub volume_order_id: String,
	/// Device path hint (e.g. "/dev/sdb"); providers may ignore it.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub device: Option<String>,
}

/// Parameters for a public IP assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicIpSpec {
	pub compute_order_id: String,
}

/// Traffic direction a security rule applies to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleDirection {
	In,
	Out,
}

/// Transport protocol a security rule matches.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleProtocol {
	Tcp,
	Udp,
	Icmp,
	Any,
}

/// Parameters for a security rule on a network or public IP order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityRuleSpec {
	/// The network or public IP order the rule guards.
	pub target_order_id: String,
	pub direction: RuleDirection,
	pub protocol: RuleProtocol,
	pub port_from: u16,
	pub port_to: u16,
	/// Remote address range the rule matches, in CIDR notation.
	pub cidr: String,
}
