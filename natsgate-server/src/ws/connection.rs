//! WebSocket connection handling

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::response::IntoResponse;
use futures::StreamExt;
use natsgate_core::CloseReason;
use tracing::{debug, info, warn};

use crate::AppState;
use crate::gateway::Flow;
use crate::protocol::InboundFrame;

use super::sink::WsSink;

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let peer = connect_info.map(|ConnectInfo(addr)| addr);
    let limit = state.gateway.max_frame_bytes();
    ws.max_frame_size(limit)
        .max_message_size(limit)
        .on_upgrade(move |socket| handle_socket(socket, state, peer))
}

/// Run one session's read loop
async fn handle_socket(socket: WebSocket, state: Arc<AppState>, peer: Option<SocketAddr>) {
    let (sender, mut receiver) = socket.split();
    let gateway = Arc::clone(&state.gateway);
    let session = gateway.accept(Box::new(WsSink::new(sender)), peer).await;

    info!(session_id = %session.id(), "WebSocket client connected");

    while let Some(msg) = receiver.next().await {
        let frame = match msg {
            Ok(Message::Text(text)) => InboundFrame::Text(text.to_string()),
            Ok(Message::Binary(data)) => InboundFrame::Binary(data.to_vec()),
            Ok(Message::Close(_)) => {
                debug!(session_id = %session.id(), "WebSocket client sent close frame");
                InboundFrame::Close
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
            Err(e) => {
                warn!(session_id = %session.id(), error = %e, "WebSocket read failed");
                gateway.on_close(&session, CloseReason::ServerError).await;
                break;
            }
        };

        if gateway.handle_frame(&session, frame).await == Flow::Stop {
            break;
        }
    }

    // no-op unless the stream ended without a close frame
    gateway.on_close(&session, CloseReason::ServerError).await;
    info!(session_id = %session.id(), "WebSocket client disconnected");
}
