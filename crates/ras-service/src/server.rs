//! HTTP server for the order manager API.
//!
//! Exposes the controller's entry points: order creation, lookup,
//! deletion, and the endpoint remote federation members post state
//! events to.

use axum::{
	extract::{Path, State},
	http::StatusCode,
	response::{IntoResponse, Json, Response},
	routing::{get, post},
	Router,
};
use ras_config::ApiConfig;
use ras_core::{Order, OrderController, OrderError};
use ras_types::{CreateOrderRequest, CreateOrderResponse, OrderView, RemoteOrderEvent};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	/// The controller all endpoints call into.
	pub controller: Arc<OrderController>,
	/// Local federation member id, recorded as requester of orders
	/// created through this API.
	pub member_id: String,
	/// Cloud name assigned to orders that do not specify one.
	pub default_cloud: String,
}

/// Error envelope returned by every endpoint.
struct ApiError {
	status: StatusCode,
	message: String,
}

impl From<OrderError> for ApiError {
	fn from(error: OrderError) -> Self {
		let status = match &error {
			OrderError::NotFound(_) => StatusCode::NOT_FOUND,
			OrderError::AlreadyClosed(_) => StatusCode::CONFLICT,
			OrderError::Activation(_) => StatusCode::CONFLICT,
			OrderError::Transition(_) => StatusCode::CONFLICT,
		};
		Self {
			status,
			message: error.to_string(),
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		(self.status, Json(json!({ "error": self.message }))).into_response()
	}
}

/// Starts the HTTP server for the API.
pub async fn start_server(
	api_config: ApiConfig,
	state: AppState,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = Router::new()
		.nest(
			"/api",
			Router::new()
				.route("/orders", post(handle_create_order))
				.route(
					"/orders/{id}",
					get(handle_get_order).delete(handle_delete_order),
				)
				.route("/events", post(handle_remote_event)),
		)
		.layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
		.with_state(state);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;
	tracing::info!("Order manager API server starting on {}", bind_address);

	axum::serve(listener, app).await?;
	Ok(())
}

/// Handles POST /api/orders requests.
///
/// Creates a detached order from the request and activates it; the
/// open-orders processor picks it up from there.
async fn handle_create_order(
	State(state): State<AppState>,
	Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<CreateOrderResponse>), ApiError> {
	let provider = request
		.provider
		.unwrap_or_else(|| state.member_id.clone());
	let cloud_name = request
		.cloud_name
		.unwrap_or_else(|| state.default_cloud.clone());
	let order = Order::with_generated_id(
		request.spec,
		request.user,
		state.member_id.clone(),
		provider,
		cloud_name,
	);

	let order = state.controller.activate_order(order)?;
	Ok((
		StatusCode::CREATED,
		Json(CreateOrderResponse {
			id: order.id().to_string(),
		}),
	))
}

/// Handles GET /api/orders/{id} requests.
async fn handle_get_order(
	Path(id): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<OrderView>, ApiError> {
	Ok(Json(state.controller.get_order_view(&id)?))
}

/// Handles DELETE /api/orders/{id} requests.
///
/// The order moves to CLOSED; the reaper tears down its instance
/// asynchronously.
async fn handle_delete_order(
	Path(id): Path<String>,
	State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
	state.controller.delete_order(&id)?;
	Ok(StatusCode::NO_CONTENT)
}

/// Handles POST /api/events requests.
///
/// Remote federation members report state changes of orders they
/// provision for us; the event is applied through the ordinary
/// transition path.
async fn handle_remote_event(
	State(state): State<AppState>,
	Json(event): Json<RemoteOrderEvent>,
) -> Result<StatusCode, ApiError> {
	state
		.controller
		.handle_remote_event(&event.order_id, event.state)?;
	Ok(StatusCode::NO_CONTENT)
}
