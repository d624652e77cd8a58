use super::{parse_uuid, ApiError, AppState};
use crate::presence::Observer;
use crate::provider::Location;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::put,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

/// Body of a join or move
#[derive(Deserialize)]
struct ObserverUpdate {
    name: String,
    location: Location,
}

/// Create presence router
pub fn create_observers_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/observers/:id", put(put_observer).delete(delete_observer))
        .with_state(state)
}

/// PUT /api/observers/:id - Join or move
///
/// 201 on join, 204 on move. Attachment happens on the next viewer tick.
async fn put_observer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(update): Json<ObserverUpdate>,
) -> Result<StatusCode, ApiError> {
    let observer_id = parse_uuid(&id, "observer")?;
    let joined = state.presence.upsert(Observer {
        id: observer_id,
        name: update.name,
        location: update.location,
    });

    if joined {
        info!(observer_id = %observer_id, "Observer joined");
        Ok(StatusCode::CREATED)
    } else {
        Ok(StatusCode::NO_CONTENT)
    }
}

/// DELETE /api/observers/:id - Leave, releasing the observer's display now
async fn delete_observer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let observer_id = parse_uuid(&id, "observer")?;
    state
        .presence
        .remove(&observer_id)
        .ok_or(ApiError::NotFound("Observer"))?;

    state.service.remove_observer(&observer_id);
    info!(observer_id = %observer_id, "Observer left");

    Ok(StatusCode::NO_CONTENT)
}
