use super::AppState;
use axum::{extract::State, response::Json, routing::post, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Deserialize)]
struct CommandRequest {
    /// Label the command was invoked as; defaults to the configured label
    label: Option<String>,
    #[serde(default)]
    args: Vec<String>,
}

#[derive(Serialize)]
struct CommandResponse {
    lines: Vec<String>,
}

#[derive(Deserialize)]
struct CompleteRequest {
    #[serde(default)]
    args: Vec<String>,
}

#[derive(Serialize)]
struct CompleteResponse {
    suggestions: Vec<String>,
}

/// Create command router
pub fn create_command_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/command", post(run_command))
        .route("/api/command/complete", post(complete_command))
        .with_state(state)
}

/// POST /api/command - Run the value command
async fn run_command(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CommandRequest>,
) -> Json<CommandResponse> {
    let label = req
        .label
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| state.service.config().api.command_label.clone());

    Json(CommandResponse {
        lines: state.command.execute(&label, &req.args),
    })
}

/// POST /api/command/complete - Argument completion
async fn complete_command(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CompleteRequest>,
) -> Json<CompleteResponse> {
    Json(CompleteResponse {
        suggestions: state.command.complete(&req.args),
    })
}
