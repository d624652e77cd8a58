// HTTP and WebSocket APIs

mod command;
mod events;
mod islands;
mod observers;
mod telemetry;
mod websocket;

pub use command::create_command_router;
pub use events::create_events_router;
pub use islands::create_islands_router;
pub use observers::create_observers_router;
pub use telemetry::create_telemetry_router;
pub use websocket::create_ws_router;

use crate::command::ValueCommand;
use crate::display::DisplayBoard;
use crate::presence::PresenceRegistry;
use crate::provider::FeedProvider;
use crate::service::WorthService;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Router,
};
use serde::Serialize;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<WorthService>,
    /// Concrete feed, for record ingestion
    pub feed: Arc<FeedProvider>,
    pub presence: Arc<PresenceRegistry>,
    pub board: Arc<DisplayBoard>,
    pub command: Arc<ValueCommand>,
}

/// Create the full API router
pub fn create_router(state: AppState) -> Router {
    let state = Arc::new(state);
    Router::new()
        .merge(create_islands_router(Arc::clone(&state)))
        .merge(create_events_router(Arc::clone(&state)))
        .merge(create_observers_router(Arc::clone(&state)))
        .merge(create_command_router(Arc::clone(&state)))
        .merge(create_telemetry_router(Arc::clone(&state)))
        .merge(create_ws_router(state))
}

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// API error types
#[derive(Debug)]
pub enum ApiError {
    NotFound(&'static str),
    BadRequest(String),
    ProviderUnavailable,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::NotFound(what) => (StatusCode::NOT_FOUND, format!("{} not found", what)),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::ProviderUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Island provider unavailable".to_string(),
            ),
        };

        let body = Json(ErrorResponse {
            error: error_message,
        });

        (status, body).into_response()
    }
}

/// Parse a UUID path segment
fn parse_uuid(raw: &str, what: &str) -> Result<uuid::Uuid, ApiError> {
    uuid::Uuid::parse_str(raw)
        .map_err(|_| ApiError::BadRequest(format!("Invalid {} id '{}'", what, raw)))
}
