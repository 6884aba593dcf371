//! services/api/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a recitation-check
//! WebSocket connection. It manages the connection's state machine and
//! delegates the grading work.

use crate::web::{
    protocol::{ClientMessage, ServerMessage},
    recitation_task::recitation_process,
    state::{AppState, RecitationMode, RecitationState},
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    Extension,
};
use futures::{
    stream::{SplitSink, StreamExt},
    SinkExt,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>, // from the auth middleware
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state, user_id))
}

async fn send_json(
    ws_sender: &Arc<Mutex<SplitSink<WebSocket, Message>>>,
    msg: &ServerMessage,
) -> bool {
    let json = match serde_json::to_string(msg) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize server message: {}", e);
            return false;
        }
    };
    ws_sender
        .lock()
        .await
        .send(Message::Text(json.into()))
        .await
        .is_ok()
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>, user_id: Uuid) {
    info!("New recitation WebSocket established for user: {}", user_id);

    let (sender, mut receiver) = socket.split();
    let ws_sender = Arc::new(Mutex::new(sender));

    let session_state_lock: Arc<Mutex<RecitationState>>;

    // --- 1. Initialization Phase ---
    if let Some(Ok(Message::Text(init_json))) = receiver.next().await {
        match serde_json::from_str::<ClientMessage>(&init_json) {
            Ok(ClientMessage::Init { surah, ayah }) => {
                match RecitationState::new(app_state.clone(), user_id, surah, ayah).await {
                    Ok(state) => {
                        let ready = ServerMessage::RecitationReady {
                            surah,
                            ayah,
                            arabic_text: state.verse.arabic_text.clone(),
                        };
                        session_state_lock = Arc::new(Mutex::new(state));
                        if !send_json(&ws_sender, &ready).await {
                            error!("Failed to send RecitationReady message.");
                            return;
                        }
                    }
                    Err(e) => {
                        error!("Failed to initialize recitation state: {:?}", e);
                        let err_msg = ServerMessage::Error {
                            message: "Failed to load the requested verse.".to_string(),
                        };
                        let _ = send_json(&ws_sender, &err_msg).await;
                        return;
                    }
                }
            }
            _ => {
                error!("Expected an init message first; closing.");
                return;
            }
        }
    } else {
        error!("Client went away before targeting a verse.");
        return;
    }

    // --- 2. Main Message Loop ---
    loop {
        if let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    handle_text_message(
                        text.to_string(),
                        &app_state,
                        &session_state_lock,
                        &ws_sender,
                        user_id,
                    )
                    .await;
                }
                Message::Binary(data) => {
                    let mut session = session_state_lock.lock().await;
                    if session.mode == RecitationMode::Listening {
                        session.audio_buffer.extend_from_slice(&data);
                    }
                }
                Message::Close(_) => {
                    info!("Close frame received.");
                    break;
                }
                _ => {}
            }
        } else {
            info!("Recitation client disconnected.");
            break;
        }
    }

    info!("Recitation WebSocket closed.");
}

/// Helper function to handle the logic for different `ClientMessage` variants.
async fn handle_text_message(
    text: String,
    app_state: &Arc<AppState>,
    session_state_lock: &Arc<Mutex<RecitationState>>,
    ws_sender: &Arc<Mutex<SplitSink<WebSocket, Message>>>,
    user_id: Uuid,
) {
    match serde_json::from_str::<ClientMessage>(&text) {
        Ok(client_msg) => match client_msg {
            ClientMessage::Init { surah, ayah } => {
                // Re-init switches the connection to another verse.
                info!("Re-targeting recitation to {}:{}", surah, ayah);
                match RecitationState::new(app_state.clone(), user_id, surah, ayah).await {
                    Ok(new_state) => {
                        let ready = ServerMessage::RecitationReady {
                            surah,
                            ayah,
                            arabic_text: new_state.verse.arabic_text.clone(),
                        };
                        *session_state_lock.lock().await = new_state;
                        if !send_json(ws_sender, &ready).await {
                            error!("Failed to send RecitationReady message.");
                        }
                    }
                    Err(e) => {
                        error!("Failed to re-target recitation: {:?}", e);
                        let err_msg = ServerMessage::Error {
                            message: "Failed to load the requested verse.".to_string(),
                        };
                        let _ = send_json(ws_sender, &err_msg).await;
                    }
                }
            }
            ClientMessage::RecitationStarted => {
                info!("RecitationStarted message received.");
                {
                    let mut session = session_state_lock.lock().await;
                    session.mode = RecitationMode::Listening;
                    session.audio_buffer.clear();
                }
                if !send_json(ws_sender, &ServerMessage::Listening).await {
                    error!("Failed to send Listening message.");
                }
            }
            ClientMessage::RecitationEnded => {
                info!("RecitationEnded message received.");
                {
                    let mut session = session_state_lock.lock().await;
                    session.mode = RecitationMode::Idle;
                }

                if let Err(e) = recitation_process(
                    app_state.clone(),
                    session_state_lock.clone(),
                    ws_sender.clone(),
                )
                .await
                {
                    error!("Error in recitation process: {:?}", e);
                    let err_msg = ServerMessage::Error {
                        message: "Error recognizing speech. Please try again.".to_string(),
                    };
                    let _ = send_json(ws_sender, &err_msg).await;
                }
            }
        },
        Err(e) => {
            warn!("Ignoring unparsable client message: {}", e);
        }
    }
}
