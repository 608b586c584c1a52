//! Federation user identity attached to orders.

use serde::{Deserialize, Serialize};

/// The user an order belongs to.
///
/// The lifecycle core treats this as opaque: it is recorded at order
/// creation and handed through to cloud plugins, which map it to
/// cloud-specific credentials. No component of the core interprets it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SystemUser {
	/// Identifier of the user at its identity provider.
	pub id: String,
	/// Human-readable name, if the identity provider supplies one.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	/// Identifier of the federation member that authenticated the user.
	pub identity_provider_id: String,
}

impl SystemUser {
	pub fn new(id: impl Into<String>, identity_provider_id: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			name: None,
			identity_provider_id: identity_provider_id.into(),
		}
	}
}
