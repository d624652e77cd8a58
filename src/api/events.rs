use super::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::post,
    Router,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Serialize)]
struct AcceptedResponse {
    island_id: String,
}

/// Create event router
pub fn create_events_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/events", post(post_event))
        .with_state(state)
}

/// POST /api/events - Loose event ingestion
///
/// 202 when the payload was a worth event and its island was marked dirty,
/// 204 when it was ignored.
async fn post_event(State(state): State<Arc<AppState>>, Json(payload): Json<Value>) -> Response {
    match state.service.handle_event(&payload) {
        Some(island_id) => (
            StatusCode::ACCEPTED,
            Json(AcceptedResponse {
                island_id: island_id.to_string(),
            }),
        )
            .into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}
