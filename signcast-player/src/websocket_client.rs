use anyhow::Result;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::heartbeat::HeartbeatManager;
use crate::PlayerState;

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

pub struct WebSocketClient {
    state: PlayerState,
}

impl WebSocketClient {
    pub fn new(state: PlayerState) -> Self {
        Self { state }
    }

    pub async fn connect_and_run(&mut self) -> Result<()> {
        let mut delay = Duration::from_secs(5);
        let max_delay = Duration::from_secs(300);

        loop {
            match self.connect().await {
                Ok(()) => {
                    delay = Duration::from_secs(5); // Reset delay on successful connection
                }
                Err(e) => {
                    tracing::error!("Connection error: {}", e);
                }
            }

            tracing::info!("Reconnecting in {:?}...", delay);
            sleep(delay).await;
            delay = (delay * 2).min(max_delay); // Exponential backoff
        }
    }

    async fn connect(&mut self) -> Result<()> {
        let url = &self.state.config.server_url;
        tracing::info!("Connecting to server: {}", url);

        let (ws_stream, _) = connect_async(url).await?;
        tracing::info!("WebSocket connection established");

        let (mut write, mut read) = ws_stream.split();

        // Send authentication message
        let auth_msg = PlayerMessage::Authenticate {
            display_id: self.state.config.display_id,
            secret_key: self.state.config.secret_key.clone(),
        };

        let auth_json = serde_json::to_string(&auth_msg)?;
        write.send(Message::Text(auth_json)).await?;

        // Wait for auth response
        if let Some(Ok(Message::Text(text))) = read.next().await {
            if let Ok(ServerMessage::AuthResponse {
                success, message, ..
            }) = serde_json::from_str(&text)
            {
                if !success {
                    tracing::error!("Authentication failed: {}", message);
                    return Err(anyhow::anyhow!("Authentication failed"));
                }
                tracing::info!("Authenticated successfully");
            }
        }

        // Pull a fresh snapshot now that the server is reachable
        self.refresh_content().await;

        // All outbound traffic goes through one channel so the sink stays in
        // a single task
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<PlayerMessage>();

        let mut send_task = tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                if let Ok(json) = serde_json::to_string(&msg) {
                    if write.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
            }
        });

        let heartbeat_manager = HeartbeatManager::new(self.state.clone(), tx.clone());
        let mut heartbeat_task = tokio::spawn(async move {
            heartbeat_manager.start().await;
        });

        // Handle incoming messages
        while let Some(msg_result) = read.next().await {
            match msg_result {
                Ok(Message::Text(text)) => {
                    if let Ok(server_msg) = serde_json::from_str::<ServerMessage>(&text) {
                        self.handle_server_message(server_msg).await;
                    }
                }
                Ok(Message::Close(_)) => {
                    tracing::info!("Server closed connection");
                    break;
                }
                Err(e) => {
                    tracing::error!("WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }

        heartbeat_task.abort();
        send_task.abort();

        Ok(())
    }

    async fn handle_server_message(&self, msg: ServerMessage) {
        match msg {
            ServerMessage::AuthResponse {
                success, message, ..
            } => {
                tracing::info!("Auth response: {} - {}", success, message);
            }
            ServerMessage::ContentUpdated { timestamp } => {
                tracing::info!("Content updated at {}", timestamp);
                self.refresh_content().await;
            }
            ServerMessage::HeartbeatAck => {
                // Heartbeat acknowledged
            }
        }
    }

    /// Full refetch plus a nudge for the playback loop. There is no diff to
    /// apply; the snapshot is replaced wholesale.
    async fn refresh_content(&self) {
        match self.state.snapshot.refresh().await {
            Ok(()) => self.state.refresh_signal.notify_one(),
            Err(e) => tracing::warn!("Content refresh failed: {}", e),
        }
    }
}
