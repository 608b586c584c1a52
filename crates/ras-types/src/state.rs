//! Order lifecycle states.
//!
//! An order moves through these states from acceptance to teardown.
//! State changes happen only through the transition module in
//! `ras-core`; the enumeration itself is plain data shared by every
//! crate that needs to talk about lifecycle stages.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle stage of an order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderState {
	/// Accepted, not yet dispatched for provisioning.
	Open,
	/// Provisioning in progress at the provider.
	Spawning,
	/// Waiting on an external party, typically a remote federation member.
	Pending,
	/// Resource is ready and in use.
	Fulfilled,
	/// The provider reported a terminal error for the instance.
	Failed,
	/// Terminal; the order is waiting to be reaped.
	Closed,
}

impl OrderState {
	/// All states, in lifecycle order. The registry binds one container
	/// to each entry of this list.
	pub const VALUES: [OrderState; 6] = [
		OrderState::Open,
		OrderState::Spawning,
		OrderState::Pending,
		OrderState::Fulfilled,
		OrderState::Failed,
		OrderState::Closed,
	];
}

impl fmt::Display for OrderState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			OrderState::Open => write!(f, "OPEN"),
			OrderState::Spawning => write!(f, "SPAWNING"),
			OrderState::Pending => write!(f, "PENDING"),
			OrderState::Fulfilled => write!(f, "FULFILLED"),
			OrderState::Failed => write!(f, "FAILED"),
			OrderState::Closed => write!(f, "CLOSED"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_values_covers_every_state() {
		// A new state added to the enum must also be added to VALUES,
		// otherwise the registry would not bind a container for it.
		for state in OrderState::VALUES {
			assert!(OrderState::VALUES.contains(&state));
		}
		assert_eq!(OrderState::VALUES.len(), 6);
	}

	#[test]
	fn test_serde_uses_wire_names() {
		let json = serde_json::to_string(&OrderState::Fulfilled).unwrap();
		assert_eq!(json, "\"FULFILLED\"");
		let back: OrderState = serde_json::from_str("\"SPAWNING\"").unwrap();
		assert_eq!(back, OrderState::Spawning);
	}
}
