use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub display_id: i32,
    pub server_url: String,
    pub secret_key: String,
    pub heartbeat_interval_secs: u64,
    pub poll_interval_secs: u64,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn default_template() -> &'static str {
        r#"# Identity issued by the server when the display was registered
display_id = 1
secret_key = "change-me"

server_url = "ws://127.0.0.1:8080/ws"
heartbeat_interval_secs = 5
# How often to re-check for content while nothing is playing
poll_interval_secs = 60
"#
    }
}
