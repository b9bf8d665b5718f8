use std::time::Duration;
use sysinfo::System;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::interval;

use crate::websocket_client::PlayerMessage;
use crate::PlayerState;

pub struct HeartbeatManager {
    state: PlayerState,
    sender: UnboundedSender<PlayerMessage>,
}

impl HeartbeatManager {
    pub fn new(state: PlayerState, sender: UnboundedSender<PlayerMessage>) -> Self {
        Self { state, sender }
    }

    pub async fn start(self) {
        let interval_secs = self.state.config.heartbeat_interval_secs.max(1);
        let mut tick = interval(Duration::from_secs(interval_secs));

        loop {
            tick.tick().await;

            let heartbeat = self.collect_heartbeat_data().await;

            if self.sender.send(heartbeat).is_err() {
                // Connection is gone; the client will reconnect and spawn a
                // fresh manager
                break;
            }
        }
    }

    async fn collect_heartbeat_data(&self) -> PlayerMessage {
        let mut sys = System::new_all();
        sys.refresh_all();

        // Average CPU usage across all cores
        let cpu_usage = if !sys.cpus().is_empty() {
            sys.cpus().iter().map(|cpu| cpu.cpu_usage()).sum::<f32>() / sys.cpus().len() as f32
        } else {
            0.0
        } as f64;

        let memory_usage = (sys.used_memory() as f64) / (1024.0 * 1024.0); // Convert to MB

        let current_slide_id = *self.state.current_slide_id.read().await;

        PlayerMessage::Heartbeat {
            current_slide_id,
            status: "online".to_string(),
            cpu_usage_percent: cpu_usage,
            memory_usage_mb: memory_usage,
        }
    }
}
