// src/main.rs
// Penélope backend entrypoint: webhook ingress server plus the due-event
// scheduler loop, sharing one application state.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use penelope_backend::api;
use penelope_backend::config::Config;
use penelope_backend::db;
use penelope_backend::state::AppState;
use penelope_backend::workers;

#[derive(Parser, Debug)]
#[command(name = "penelope-backend", about = "Multi-tenant WhatsApp chatbot backend")]
struct Cli {
    /// Bind host for the webhook server
    #[arg(long, env = "API_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Bind port for the webhook server
    #[arg(long, env = "API_PORT", default_value_t = 8080)]
    port: u16,

    /// SQLite database URL
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://penelope.db?mode=rwc")]
    database_url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "penelope_backend=info".into()),
        )
        .init();

    let cli = Cli::parse();

    // Refuses to start half-configured: secrets and history bounds are
    // validated here, before anything touches the network.
    let config = Config::from_env()?;

    let pool = db::init_db(&cli.database_url, config.database.max_connections).await?;
    info!("Database initialized");

    let state = Arc::new(AppState::new(pool, config)?);

    workers::events::spawn_event_processor(state.clone());

    let app = api::http::create_router(state);
    let addr = format!("{}:{}", cli.host, cli.port);
    info!(%addr, "Starting webhook server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
