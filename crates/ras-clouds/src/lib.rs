//! Cloud plugin implementations for the RAS order manager.
//!
//! Each module under `implementations` provides one
//! [`ras_core::ResourcePlugin`] backend. The service binary picks
//! implementations by name from the configuration's assignment table
//! and builds them through their factory functions.

use ras_core::PluginFactory;

/// Re-export implementations
pub mod implementations {
	pub mod emulated;
	pub mod openstack;
}

/// Get all registered plugin implementations.
///
/// Returns a vector of (name, factory) tuples for all available cloud
/// plugins, used by the service wiring to resolve configured names.
pub fn get_all_implementations() -> Vec<(&'static str, PluginFactory)> {
	use implementations::{emulated, openstack};

	vec![
		("emulated", emulated::create_plugin as PluginFactory),
		("openstack_compute", openstack::create_plugin as PluginFactory),
	]
}
