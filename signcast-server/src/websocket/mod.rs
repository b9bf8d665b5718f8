use crate::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use chrono::Utc;
use diesel::prelude::*;
use futures::{sink::SinkExt, stream::StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

// Server → Player messages
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "auth_response")]
    AuthResponse {
        success: bool,
        message: String,
        display_id: Option<i32>,
    },
    // Untyped "something changed, re-fetch" signal; no diff is carried
    #[serde(rename = "content_updated")]
    ContentUpdated { timestamp: String },
    #[serde(rename = "heartbeat_ack")]
    HeartbeatAck,
}

// Player → Server messages
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlayerMessage {
    #[serde(rename = "authenticate")]
    Authenticate { display_id: i32, secret_key: String },
    #[serde(rename = "heartbeat")]
    Heartbeat {
        current_slide_id: Option<i32>,
        status: String,
        cpu_usage_percent: f64,
        memory_usage_mb: f64,
    },
    #[serde(rename = "request_content")]
    RequestContent,
}

/// Queues a content_updated broadcast to every connected player. Called after
/// each admin write that can affect playback.
pub async fn broadcast_content_update(state: &AppState) {
    let timestamp = Utc::now().to_rfc3339();
    let players = state.connected_displays.read().await;

    for (display_id, tx) in players.iter() {
        if tx
            .send(ServerMessage::ContentUpdated {
                timestamp: timestamp.clone(),
            })
            .is_err()
        {
            tracing::warn!("Failed to queue content update for display {}", display_id);
        }
    }
}

pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<ServerMessage>();

    // Shared with the receive task so cleanup still knows who this was after
    // either task dies
    let session_display: Arc<RwLock<Option<i32>>> = Arc::new(RwLock::new(None));
    let session_display_clone = session_display.clone();

    // Clone state for use in the async blocks
    let state_clone = state.clone();

    // Spawn a task to forward messages from the channel to the WebSocket
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(json) = serde_json::to_string(&msg) {
                if sender.send(Message::Text(json)).await.is_err() {
                    break;
                }
            }
        }
    });

    // Handle incoming messages
    let mut recv_task = tokio::spawn(async move {
        let mut display_id: Option<i32> = None;
        let mut authenticated = false;

        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Text(text) = msg {
                if let Ok(player_msg) = serde_json::from_str::<PlayerMessage>(&text) {
                    match player_msg {
                        PlayerMessage::Authenticate {
                            display_id: claimed_id,
                            secret_key,
                        } => {
                            let auth_result =
                                authenticate_display(&state_clone, claimed_id, &secret_key).await;

                            match auth_result {
                                Ok(()) => {
                                    display_id = Some(claimed_id);
                                    authenticated = true;
                                    *session_display_clone.write().await = Some(claimed_id);

                                    let _ = tx.send(ServerMessage::AuthResponse {
                                        success: true,
                                        message: "Authenticated successfully".to_string(),
                                        display_id: Some(claimed_id),
                                    });

                                    tracing::info!("Display {} authenticated", claimed_id);

                                    // Register in connected_displays
                                    {
                                        let mut players =
                                            state_clone.connected_displays.write().await;
                                        players.insert(claimed_id, tx.clone());
                                    }
                                }
                                Err(e) => {
                                    let _ = tx.send(ServerMessage::AuthResponse {
                                        success: false,
                                        message: e,
                                        display_id: None,
                                    });
                                }
                            }
                        }
                        PlayerMessage::Heartbeat {
                            current_slide_id,
                            status,
                            cpu_usage_percent,
                            memory_usage_mb,
                        } => {
                            if authenticated {
                                if let Some(id) = display_id {
                                    if let Err(e) = update_display_status(
                                        &state_clone,
                                        id,
                                        &status,
                                        current_slide_id,
                                    )
                                    .await
                                    {
                                        tracing::error!("Failed to update display status: {}", e);
                                    }

                                    let _ = tx.send(ServerMessage::HeartbeatAck);

                                    tracing::debug!(
                                        "Display {} heartbeat: status={}, slide={:?}, cpu={:.1}%, mem={:.1}MB",
                                        id,
                                        status,
                                        current_slide_id,
                                        cpu_usage_percent,
                                        memory_usage_mb
                                    );
                                }
                            }
                        }
                        PlayerMessage::RequestContent => {
                            if authenticated && display_id.is_some() {
                                // Nudge the player through its normal refetch path
                                let _ = tx.send(ServerMessage::ContentUpdated {
                                    timestamp: Utc::now().to_rfc3339(),
                                });
                            }
                        }
                    }
                }
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = (&mut send_task) => {
            recv_task.abort();
        }
        _ = (&mut recv_task) => {
            send_task.abort();
        }
    }

    // Clean up: mark display as offline and remove from connected_displays
    let disconnected = *session_display.read().await;
    if let Some(id) = disconnected {
        let _ = mark_display_offline(&state, id).await;
        {
            let mut players = state.connected_displays.write().await;
            players.remove(&id);
        }
        tracing::info!("Display {} disconnected", id);
    }
}

async fn authenticate_display(
    state: &AppState,
    display_id: i32,
    secret_key: &str,
) -> Result<(), String> {
    use crate::schema::displays::dsl;

    let mut conn = state
        .db
        .get()
        .map_err(|_| "Database connection error".to_string())?;

    dsl::displays
        .filter(dsl::id.eq(display_id))
        .filter(dsl::secret_key.eq(secret_key))
        .select(crate::models::Display::as_select())
        .first::<crate::models::Display>(&mut conn)
        .map_err(|_| "Invalid credentials".to_string())?;

    // Update display status to online
    diesel::update(dsl::displays.filter(dsl::id.eq(display_id)))
        .set((
            dsl::status.eq("online"),
            dsl::last_heartbeat.eq(Utc::now().naive_utc()),
        ))
        .execute(&mut conn)
        .map_err(|_| "Failed to update display status".to_string())?;

    Ok(())
}

async fn update_display_status(
    state: &AppState,
    display_id: i32,
    status: &str,
    current_slide_id: Option<i32>,
) -> Result<(), String> {
    use crate::schema::displays::dsl;

    let mut conn = state
        .db
        .get()
        .map_err(|_| "Database connection error".to_string())?;

    diesel::update(dsl::displays.filter(dsl::id.eq(display_id)))
        .set((
            dsl::status.eq(status),
            dsl::last_heartbeat.eq(Utc::now().naive_utc()),
            dsl::current_slide_id.eq(current_slide_id),
        ))
        .execute(&mut conn)
        .map_err(|e| format!("Failed to update display status: {}", e))?;

    Ok(())
}

async fn mark_display_offline(state: &AppState, display_id: i32) -> Result<(), String> {
    use crate::schema::displays::dsl;

    let mut conn = state
        .db
        .get()
        .map_err(|_| "Database connection error".to_string())?;

    diesel::update(dsl::displays.filter(dsl::id.eq(display_id)))
        .set(dsl::status.eq("offline"))
        .execute(&mut conn)
        .map_err(|_| "Failed to mark display offline".to_string())?;

    Ok(())
}
