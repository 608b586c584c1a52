//! The order entity.
//!
//! An order is one tracked resource request. Its request parameters
//! are fixed at creation; the mutable part (lifecycle state, provider
//! instance linkage, fault message) changes as the order moves through
//! the manager.

use ras_types::{OrderSpec, OrderState, OrderView, ResourceType, SystemUser};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// One tracked resource request.
///
/// Orders are shared: the registry's id index and the state container
/// currently holding the order both reference the same allocation, so
/// orders are always handled as `Arc<Order>`.
///
/// The `state` field is mutated only by the transition module. Any
/// component that inspects the state and then acts on the outcome must
/// hold the order's own synchronization scope (see [`Order::lock`])
/// across the whole inspect-decide-transition sequence; a bare
/// [`Order::state`] read is allowed anywhere but may be stale the
/// moment it returns.
#[derive(Debug)]
pub struct Order {
	id: String,
	resource_type: ResourceType,
	spec: OrderSpec,
	user: SystemUser,
	/// Federation member that created the order.
	requester: String,
	/// Federation member that provisions the resource.
	provider: String,
	cloud_name: String,
	created_at: u64,
	state: RwLock<Option<OrderState>>,
	instance_id: RwLock<Option<String>>,
	fault_message: RwLock<Option<String>>,
	sync: Mutex<()>,
}

impl Order {
	/// Creates a detached order: no state, not yet known to any
	/// registry. Activation assigns the initial state.
	pub fn new(
		id: impl Into<String>,
		spec: OrderSpec,
		user: SystemUser,
		requester: impl Into<String>,
		provider: impl Into<String>,
		cloud_name: impl Into<String>,
	) -> Self {
		Self {
			id: id.into(),
			resource_type: spec.resource_type(),
			spec,
			user,
			requester: requester.into(),
			provider: provider.into(),
			cloud_name: cloud_name.into(),
			created_at: SystemTime::now()
				.duration_since(UNIX_EPOCH)
				.map(|d| d.as_secs())
				.unwrap_or_default(),
			state: RwLock::new(None),
			instance_id: RwLock::new(None),
			fault_message: RwLock::new(None),
			sync: Mutex::new(()),
		}
	}

	/// Creates a detached order with a freshly generated id.
	pub fn with_generated_id(
		spec: OrderSpec,
		user: SystemUser,
		requester: impl Into<String>,
		provider: impl Into<String>,
		cloud_name: impl Into<String>,
	) -> Self {
		Self::new(
			Uuid::new_v4().to_string(),
			spec,
			user,
			requester,
			provider,
			cloud_name,
		)
	}

	pub fn id(&self) -> &str {
		&self.id
	}

	pub fn resource_type(&self) -> ResourceType {
		self.resource_type
	}

	pub fn spec(&self) -> &OrderSpec {
		&self.spec
	}

	pub fn user(&self) -> &SystemUser {
		&self.user
	}

	pub fn requester(&self) -> &str {
		&self.requester
	}

	pub fn provider(&self) -> &str {
		&self.provider
	}

	pub fn cloud_name(&self) -> &str {
		&self.cloud_name
	}

	pub fn created_at(&self) -> u64 {
		self.created_at
	}

	/// Current lifecycle state, or `None` for an order that was never
	/// activated. The value may be stale immediately after return; see
	/// the type-level documentation.
	pub fn state(&self) -> Option<OrderState> {
		*read(&self.state)
	}

	pub(crate) fn set_state(&self, state: OrderState) {
		tracing::debug!(order_id = %self.id, state = %state, "order changed state");
		*write(&self.state) = Some(state);
	}

	/// Provider-assigned instance id, set once provisioning succeeded.
	pub fn instance_id(&self) -> Option<String> {
		read(&self.instance_id).clone()
	}

	/// Records the provider-assigned instance id. Normally done once,
	/// by the dispatch path, right after the provider accepts the
	/// request.
	pub fn set_instance_id(&self, instance_id: impl Into<String>) {
		*write(&self.instance_id) = Some(instance_id.into());
	}

	/// Why the order failed, when it did.
	pub fn fault_message(&self) -> Option<String> {
		read(&self.fault_message).clone()
	}

	pub(crate) fn record_fault(&self, message: impl Into<String>) {
		*write(&self.fault_message) = Some(message.into());
	}

	pub(crate) fn clear_fault(&self) {
		*write(&self.fault_message) = None;
	}

	/// Whether `local_member_id` provisions this order.
	pub fn is_provider_local(&self, local_member_id: &str) -> bool {
		self.provider == local_member_id
	}

	/// Whether the order is provisioned by another federation member.
	/// Such orders are never handed to local cloud plugins; their
	/// lifecycle advances through remote events.
	pub fn is_provider_remote(&self, local_member_id: &str) -> bool {
		!self.is_provider_local(local_member_id)
	}

	/// Whether the order was created on behalf of another member.
	pub fn is_requester_remote(&self, local_member_id: &str) -> bool {
		self.requester != local_member_id
	}

	/// Acquires this order's synchronization scope.
	///
	/// Whoever inspects the state and then calls into the transition
	/// module based on what it saw must hold this guard across both
	/// steps; otherwise another thread may move the order in between.
	/// The guard must not be held across slow external calls: query
	/// the provider first, then acquire the scope, re-read the state,
	/// and transition.
	pub fn lock(&self) -> MutexGuard<'_, ()> {
		self.sync.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// Snapshot of the order for API consumers.
	pub fn view(&self) -> OrderView {
		OrderView {
			id: self.id.clone(),
			resource_type: self.resource_type,
			state: self.state(),
			requester: self.requester.clone(),
			provider: self.provider.clone(),
			cloud_name: self.cloud_name.clone(),
			instance_id: self.instance_id(),
			fault_message: self.fault_message(),
			created_at: self.created_at,
		}
	}
}

impl PartialEq for Order {
	/// Orders are equal when they have the same identity.
	fn eq(&self, other: &Self) -> bool {
		self.id == other.id
	}
}

impl Eq for Order {}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
	lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
	lock.write().unwrap_or_else(PoisonError::into_inner)
}
