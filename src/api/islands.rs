use super::{parse_uuid, ApiError, AppState};
use crate::provider::{IslandRecord, WorthProvider};
use crate::worth::{EntityWorthSnapshot, ItemKey};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, put},
    Router,
};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Create island router
pub fn create_islands_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/islands", put(upsert_island))
        .route("/api/islands/:id/worth", get(get_worth))
        .route("/api/block-values", put(set_block_values))
        .with_state(state)
}

/// GET /api/islands/:id/worth - Cached breakdown for one island
///
/// Only islands someone has looked at recently are cached; anything else
/// is 404.
async fn get_worth(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<EntityWorthSnapshot>, ApiError> {
    let island_id = parse_uuid(&id, "island")?;
    let snapshot = state
        .service
        .cache()
        .get(&island_id)
        .ok_or(ApiError::NotFound("Island breakdown"))?;

    Ok(Json(snapshot.as_ref().clone()))
}

/// PUT /api/islands - Replace one island record in the feed
async fn upsert_island(
    State(state): State<Arc<AppState>>,
    Json(record): Json<IslandRecord>,
) -> Result<StatusCode, ApiError> {
    let island_id = record.id;
    if !state.feed.upsert_island(record) {
        return Err(ApiError::ProviderUnavailable);
    }

    state.service.mark_dirty(island_id);
    info!(island_id = %island_id, "Island record updated");

    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/block-values - Replace unit worths, keyed by `GLOBAL` or `GLOBAL:SUB`
///
/// Every cached island is marked dirty, since any breakdown may change.
async fn set_block_values(
    State(state): State<Arc<AppState>>,
    Json(values): Json<HashMap<String, Decimal>>,
) -> Result<StatusCode, ApiError> {
    if !state.feed.is_available() {
        return Err(ApiError::ProviderUnavailable);
    }
    if values.keys().any(|raw| raw.trim().is_empty()) {
        return Err(ApiError::BadRequest("Empty block key".to_string()));
    }

    let updated = values.len();
    for (raw_key, value) in values {
        state.feed.set_block_value(ItemKey::parse(&raw_key), value);
    }

    let marked = state.service.mark_all_dirty();
    info!(updated = updated, marked_dirty = marked, "Block values updated");

    Ok(StatusCode::NO_CONTENT)
}
