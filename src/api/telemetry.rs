use super::AppState;
use crate::provider::ProviderStatus;
use crate::telemetry::{AvailabilitySample, MetricsSnapshot};
use axum::{extract::State, response::Json, routing::get, Router};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
struct TelemetryResponse {
    provider: ProviderStatus,
    available: bool,
    cached_islands: usize,
    attached_observers: usize,
    online_observers: usize,
    metrics: MetricsSnapshot,
    last_sample: Option<AvailabilitySample>,
}

/// Create telemetry router
pub fn create_telemetry_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/telemetry", get(get_telemetry))
        .with_state(state)
}

/// GET /api/telemetry - Provider availability and pipeline counters
async fn get_telemetry(State(state): State<Arc<AppState>>) -> Json<TelemetryResponse> {
    Json(TelemetryResponse {
        provider: state.feed.status(),
        available: state.service.provider().is_available(),
        cached_islands: state.service.cache().len(),
        attached_observers: state.service.tracker().len(),
        online_observers: state.presence.len(),
        metrics: state.service.metrics().get_snapshot(),
        last_sample: state.service.latest_availability(),
    })
}
