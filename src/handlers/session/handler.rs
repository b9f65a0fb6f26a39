//! Session WebSocket handler.
//!
//! Upgrades the HTTP connection and runs one tutoring session on it: binary
//! frames carry microphone audio, text frames carry the typed control
//! protocol. All outgoing traffic is funneled through a dedicated sender
//! task; everything inbound and every asynchronous completion is applied to
//! the [`Session`] from this single loop.

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::{select, time::Duration};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::machine::{Session, SessionEvent};
use super::messages::{
    ClientFrame, MAX_FRAME_SIZE, MAX_MESSAGE_SIZE, MessageRoute, ServerMessage, decode_text_frame,
};
use crate::state::AppState;

/// Channel buffer size for the outbound and event channels.
const CHANNEL_BUFFER_SIZE: usize = 1024;

/// How often the connection is checked for staleness.
const IDLE_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Base idle time before a silent connection is closed.
const BASE_IDLE_SECS: u64 = 300;

/// Session WebSocket handler.
///
/// Upgrades the HTTP connection to a WebSocket carrying one tutoring
/// session: streaming transcription, assistant replies with synthesized
/// speech, and asynchronous image analysis.
pub async fn session_websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    info!("Session WebSocket connection upgrade requested");

    ws.max_frame_size(MAX_FRAME_SIZE)
        .max_message_size(MAX_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_session_socket(socket, state))
}

/// Run the session over an upgraded socket.
async fn handle_session_socket(socket: WebSocket, app_state: Arc<AppState>) {
    let session_id = Uuid::new_v4();
    info!(%session_id, "Session WebSocket connection established");

    let (mut sender, mut receiver) = socket.split();
    let (route_tx, mut route_rx) = mpsc::channel::<MessageRoute>(CHANNEL_BUFFER_SIZE);

    // Sender task for outgoing messages
    let sender_task = tokio::spawn(async move {
        while let Some(route) = route_rx.recv().await {
            let should_close = matches!(route, MessageRoute::Close);

            let result = match route {
                MessageRoute::Outgoing(message) => match serde_json::to_string(&message) {
                    Ok(json_str) => sender.send(Message::Text(json_str.into())).await,
                    Err(e) => {
                        error!("Failed to serialize outgoing message: {}", e);
                        continue;
                    }
                },
                MessageRoute::Close => {
                    info!("Closing session WebSocket connection");
                    sender.send(Message::Close(None)).await
                }
            };

            if let Err(e) = result {
                debug!("Failed to send WebSocket message: {}", e);
                break;
            }

            if should_close {
                break;
            }
        }
    });

    let (event_tx, mut event_rx) = mpsc::channel::<SessionEvent>(CHANNEL_BUFFER_SIZE);
    let mut session = Session::new(
        session_id,
        app_state.collaborators.clone(),
        route_tx.clone(),
        event_tx,
    );
    session.open();

    // Idle timeout carries ±30s of per-session jitter.
    let jitter = (session_id.as_u128() % 61) as i64 - 30;
    let idle_timeout = Duration::from_secs((BASE_IDLE_SECS as i64 + jitter).max(1) as u64);
    let mut last_activity = Instant::now();

    loop {
        select! {
            msg_result = receiver.next() => {
                last_activity = Instant::now();

                match msg_result {
                    Some(Ok(msg)) => {
                        let continue_processing =
                            process_session_message(msg, &mut session, &route_tx).await;
                        if !continue_processing || session.is_closed() {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        warn!(%session_id, "Session WebSocket error: {}", e);
                        session.close().await;
                        break;
                    }
                    None => {
                        info!(%session_id, "Session WebSocket connection closed by client");
                        session.close().await;
                        break;
                    }
                }
            }
            Some(event) = event_rx.recv() => {
                session.handle_event(event).await;
                if session.is_closed() {
                    break;
                }
            }
            _ = tokio::time::sleep(IDLE_CHECK_INTERVAL) => {
                if last_activity.elapsed() > idle_timeout {
                    warn!(
                        %session_id,
                        "Session idle for {}s, closing stale connection",
                        last_activity.elapsed().as_secs()
                    );
                    let _ = route_tx
                        .send(MessageRoute::Outgoing(ServerMessage::Error {
                            text: "Connection closed due to inactivity".to_string(),
                        }))
                        .await;
                    session.close().await;
                    break;
                }
                debug!(%session_id, "Session idle check - still active");
            }
        }
    }

    // Cleanup
    session.close().await;
    sender_task.abort();

    info!(%session_id, "Session WebSocket connection terminated");
}

/// Process one incoming WebSocket message. Returns whether the connection
/// loop should keep running.
async fn process_session_message(
    msg: Message,
    session: &mut Session,
    route_tx: &mpsc::Sender<MessageRoute>,
) -> bool {
    match msg {
        Message::Text(text) => {
            debug!("Received text message: {} bytes", text.len());

            match decode_text_frame(&text) {
                ClientFrame::Control(message) => {
                    if let Err(e) = message.validate() {
                        warn!("Message validation failed: {}", e);
                        let _ = route_tx
                            .send(MessageRoute::Outgoing(ServerMessage::Error {
                                text: e.to_string(),
                            }))
                            .await;
                        return true;
                    }
                    session.handle_control(message).await;
                }
                ClientFrame::LegacyTranscript(text) => {
                    session.handle_legacy_transcript(text).await;
                }
            }
            true
        }
        Message::Binary(data) => {
            debug!("Received binary audio: {} bytes", data.len());
            session.handle_audio(data).await;
            true
        }
        Message::Ping(_) => {
            debug!("Received ping");
            true
        }
        Message::Pong(_) => {
            debug!("Received pong");
            true
        }
        Message::Close(_) => {
            info!("Session WebSocket close received");
            session.close().await;
            false
        }
    }
}
