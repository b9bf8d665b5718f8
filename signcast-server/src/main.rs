mod api;
mod auth;
mod config;
mod db;
mod models;
mod schema;
mod seeding;
mod services;
mod websocket;

use anyhow::Result;
use axum::{routing::get, Router};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::{mpsc::UnboundedSender, RwLock};
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::db::DbPool;
use crate::websocket::ServerMessage;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Arc<Config>,
    // Outbound channels for currently connected player clients, by display id
    pub connected_displays: Arc<RwLock<HashMap<i32, UnboundedSender<ServerMessage>>>>,
    // Failed login counters per username
    pub login_attempts: Arc<RwLock<HashMap<String, (u32, SystemTime)>>>,
}

use clap::Parser;

#[derive(Parser)]
#[command(version, author = "SIGNCAST AUTHORS", about = "Signcast Server\nDigital signage and queue management", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Generate a default configuration template to stdout
    #[arg(long)]
    generate_config: bool,
}

fn run_onboarding() -> Result<Config> {
    use dialoguer::{theme::ColorfulTheme, Input};

    println!("Welcome to Signcast Server!");
    println!("It looks like you don't have a configuration file yet.");
    println!("Let's get you set up.\n");

    let host: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Server Host")
        .default("0.0.0.0".to_string())
        .interact_text()?;

    let port: u16 = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Server Port")
        .default(8080)
        .interact_text()?;

    let db_url: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Database URL")
        .default("sqlite://signcast.db".to_string())
        .interact_text()?;

    // Generate random JWT secret
    let jwt_secret = uuid::Uuid::new_v4().to_string();

    let config_content = format!(
        r#"[server]
host = "{}"
port = {}

[server.https]
enabled = false
cert_path = "certs/cert.pem"
key_path = "certs/key.pem"

[database]
url = "{}"

[jwt]
secret = "{}"
expiration_hours = 24

[logging]
level = "info"
"#,
        host, port, db_url, jwt_secret
    );

    println!("\nGenerating configuration file: server-config.toml");
    std::fs::write("server-config.toml", &config_content)?;
    println!("Configuration saved successfully!");
    println!("----------------------------------------\n");

    let config: Config = toml::from_str(&config_content)?;
    Ok(config)
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
                .unwrap_or_else(|_| "signcast_server=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| "server-config.toml".to_string());

    // Offer onboarding when no config exists, no explicit path was given and
    // we are attached to a terminal
    if std::fs::metadata(&config_path).is_err() && cli.config.is_none() && console::user_attended()
    {
        if let Err(e) = run_onboarding() {
            eprintln!("Onboarding failed: {}", e);
            std::process::exit(1);
        }
    }

    let effective_config_path = if std::fs::metadata(&config_path).is_ok() {
        config_path
    } else if std::fs::metadata("server-config.toml").is_ok() {
        "server-config.toml".to_string()
    } else {
        eprintln!("Error: Configuration file '{}' not found.", config_path);
        eprintln!("Run with --generate-config to see a template.");
        std::process::exit(1);
    };

    // Load configuration
    let config = Config::load(&effective_config_path)?;
    tracing::info!("Loaded configuration from {}", effective_config_path);

    // Setup database
    let db_pool = db::create_pool(&config.database.url)?;
    db::run_migrations(&mut db_pool.get()?)?;
    // Seed default values
    seeding::seed_defaults(&db_pool)?;
    tracing::info!("Database initialized and seeded");

    // Create app state
    let state = AppState {
        db: db_pool,
        config: Arc::new(config.clone()),
        connected_displays: Arc::new(RwLock::new(HashMap::new())),
        login_attempts: Arc::new(RwLock::new(HashMap::new())),
    };

    // Spawn display liveness monitor
    tokio::spawn(services::display_monitor::run(state.clone()));

    // Get address before moving state
    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);

    // Determine UI path
    let static_path = state
        .config
        .server
        .ui_path
        .clone()
        .unwrap_or_else(|| "static".to_string());
    tracing::info!("Serving admin UI from: {}", static_path);

    // Build router
    let app = Router::new()
        // API routes
        .nest("/api", api::routes(state.clone()))
        // WebSocket endpoint for player clients
        .route("/ws", get(websocket::ws_handler))
        // Serve static files (admin UI build) with fallback to index.html for SPA routing
        .fallback_service(
            ServeDir::new(&static_path)
                .not_found_service(ServeFile::new(format!("{}/index.html", static_path))),
        )
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    // Start server
    let listener_address: std::net::SocketAddr = addr
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid host/port: {}", e))?;

    if let Some(https_config) = &config.server.https {
        if https_config.enabled {
            use axum_server::tls_rustls::RustlsConfig;

            tracing::info!("Starting server in HTTPS mode on {}", addr);

            // Validate cert paths
            if !std::path::Path::new(&https_config.cert_path).exists() {
                anyhow::bail!("Certificate file not found: {}", https_config.cert_path);
            }
            if !std::path::Path::new(&https_config.key_path).exists() {
                anyhow::bail!("Key file not found: {}", https_config.key_path);
            }

            let tls_config =
                RustlsConfig::from_pem_file(&https_config.cert_path, &https_config.key_path)
                    .await?;

            axum_server::bind_rustls(listener_address, tls_config)
                .serve(app.into_make_service())
                .await?;

            return Ok(());
        }
    }

    // Default HTTP mode
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {} (HTTP)", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
