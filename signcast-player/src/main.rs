mod config;
mod heartbeat;
mod playback;
mod snapshot;
mod websocket_client;

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tokio::sync::{Notify, RwLock};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::snapshot::SnapshotStore;
use crate::websocket_client::WebSocketClient;

#[derive(Clone)]
pub struct PlayerState {
    pub config: Arc<Config>,
    pub snapshot: Arc<SnapshotStore>,
    // Pinged after every successful content refresh
    pub refresh_signal: Arc<Notify>,
    // Reported in heartbeats
    pub current_slide_id: Arc<RwLock<Option<i32>>>,
}

#[derive(Parser)]
#[command(version, author = "SIGNCAST AUTHORS", about = "Signcast Player\nUnattended display client", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Generate a default configuration template to stdout
    #[arg(long)]
    generate_config: bool,
}

fn run_onboarding() -> Result<()> {
    use dialoguer::{theme::ColorfulTheme, Input};

    println!("Welcome to Signcast Player!");
    println!("It looks like you don't have a configuration file yet.");
    println!("Enter the identity the server issued for this display.\n");

    let display_id: i32 = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Display ID")
        .interact_text()?;

    let secret_key: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Secret Key")
        .interact_text()?;

    let server_url: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Server URL")
        .default("ws://127.0.0.1:8080/ws".to_string())
        .interact_text()?;

    let config_content = format!(
        r#"display_id = {}
secret_key = "{}"

server_url = "{}"
heartbeat_interval_secs = 5
poll_interval_secs = 60
"#,
        display_id, secret_key, server_url
    );

    println!("\nGenerating configuration file: player-config.toml");
    std::fs::write("player-config.toml", &config_content)?;
    println!("Configuration saved successfully!");
    println!("----------------------------------------\n");

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI args
    let cli = Cli::parse();

    if cli.generate_config {
        println!("{}", Config::default_template());
        return Ok(());
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "signcast_player=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| "player-config.toml".to_string());

    if std::fs::metadata(&config_path).is_err() && cli.config.is_none() && console::user_attended()
    {
        if let Err(e) = run_onboarding() {
            eprintln!("Onboarding failed: {}", e);
            std::process::exit(1);
        }
    }

    let effective_config_path = if std::fs::metadata(&config_path).is_ok() {
        config_path
    } else if std::fs::metadata("player-config.toml").is_ok() {
        "player-config.toml".to_string()
    } else {
        eprintln!("Error: Configuration file '{}' not found.", config_path);
        eprintln!("Run with --generate-config to see a template.");
        std::process::exit(1);
    };

    // Load configuration
    let config = Arc::new(Config::load(&effective_config_path)?);
    tracing::info!("Loaded configuration for display {}", config.display_id);

    // Create player state
    let state = PlayerState {
        config: config.clone(),
        snapshot: Arc::new(SnapshotStore::new(config)),
        refresh_signal: Arc::new(Notify::new()),
        current_slide_id: Arc::new(RwLock::new(None)),
    };

    // Best-effort initial sync; the socket and poll paths take over from here
    if let Err(e) = state.snapshot.refresh().await {
        tracing::warn!("Initial content sync failed: {}", e);
    }

    // Start the playback loop
    let cancel = CancellationToken::new();
    let playback_task = tokio::spawn(playback::run_player_loop(state.clone(), cancel.clone()));

    // Run the WebSocket client until shutdown
    let mut ws_client = WebSocketClient::new(state.clone());
    tokio::select! {
        result = ws_client.connect_and_run() => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
        }
    }

    cancel.cancel();
    let _ = playback_task.await;

    Ok(())
}
