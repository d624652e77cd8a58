use super::{parse_uuid, AppState};
use crate::display::DisplayEvent;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Query parameters for WebSocket upgrade
#[derive(Deserialize)]
struct WsQuery {
    observer: String,
}

/// Create WebSocket router
pub fn create_ws_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/ws", get(ws_handler))
        .with_state(state)
}

/// GET /api/ws?observer=<uuid> - Display event stream for one observer
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(params): Query<WsQuery>,
) -> Response {
    let observer_id = match parse_uuid(&params.observer, "observer") {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };
    info!(observer_id = %observer_id, "WebSocket upgrade request received");
    ws.on_upgrade(move |socket| handle_socket(socket, state, observer_id))
}

/// Forward the observer's display events until either side closes
async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>, observer_id: Uuid) {
    // Subscribe before replaying so no change is missed
    let mut events_rx = state.board.subscribe();

    if replay(&mut socket, &state, observer_id).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            Some(msg) = socket.recv() => {
                match msg {
                    Ok(Message::Close(_)) => {
                        info!(observer_id = %observer_id, "WebSocket client disconnected");
                        break;
                    }
                    Ok(Message::Ping(data)) => {
                        if let Err(e) = socket.send(Message::Pong(data)).await {
                            error!(error = %e, "Failed to send pong");
                            break;
                        }
                    }
                    Ok(_) => {
                        // Stream is one-way
                    }
                    Err(e) => {
                        warn!(error = %e, "WebSocket error");
                        break;
                    }
                }
            }

            result = events_rx.recv() => {
                match result {
                    Ok(event) => {
                        if event.observer_id() != observer_id {
                            continue;
                        }
                        if let Err(e) = send_event(&mut socket, &event).await {
                            error!(error = %e, "Failed to send display event");
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped = skipped, "WebSocket lagged, skipped display events");
                        if replay(&mut socket, &state, observer_id).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        error!("Display broadcast channel closed");
                        break;
                    }
                }
            }

            else => {
                break;
            }
        }
    }

    info!(observer_id = %observer_id, "WebSocket connection closed");
}

/// Send every live display of the observer as `spawned`.
///
/// Used on connect and after a lag; clients treat `spawned` as an upsert.
async fn replay(socket: &mut WebSocket, state: &AppState, observer_id: Uuid) -> anyhow::Result<()> {
    for (display_id, display) in state.board.displays_for(observer_id) {
        let event = DisplayEvent::Spawned {
            display_id,
            observer_id,
            location: display.location,
            text: display.text,
        };
        send_event(socket, &event).await?;
    }
    Ok(())
}

async fn send_event(socket: &mut WebSocket, event: &DisplayEvent) -> anyhow::Result<()> {
    let json = serde_json::to_string(event)?;
    socket.send(Message::Text(json)).await?;
    Ok(())
}
