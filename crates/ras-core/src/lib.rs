//! Order lifecycle core for the RAS order manager.
//!
//! This crate tracks every resource request from creation through
//! provisioning, monitoring, and teardown. Orders live in one shared
//! [`OrderRegistry`] holding an id index plus one ordered list per
//! lifecycle state; all state changes flow through the transition
//! module, which keeps an order's state field and its list membership
//! in lockstep. Background processors sweep the per-state lists and
//! drive orders onward based on what cloud plugins report.

/// The seam between the core and cloud plugins.
pub mod connector;
/// Order-facing entry points: activate, query, delete, remote events.
pub mod controller;
/// Ordered, internally synchronized order containers.
pub mod lists;
/// The order entity.
pub mod order;
/// Background processors sweeping the per-state lists.
pub mod processors;
/// The shared order registry.
pub mod registry;
/// Order state transitions.
pub mod transition;

pub use connector::{CloudConnector, ConnectorError, PluginFactory, ResourcePlugin};
pub use controller::{OrderController, OrderError};
pub use lists::{ListError, OrderList};
pub use order::Order;
pub use processors::{
	ClosedProcessor, FailedProcessor, FulfilledProcessor, OpenProcessor, ProcessorError,
	ProcessorSet, SpawningProcessor,
};
pub use registry::OrderRegistry;
pub use transition::{
	activate_order, deactivate_order, transition, ActivationError, TransitionError,
};
