mod app;
mod config;
mod db;
mod errors;
mod logging;
mod models;
mod routes;
mod services;
mod state;
mod store;

use anyhow::Context;
use tokio::net::TcpListener;

use crate::config::AppConfig;
use crate::logging::LoggingConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging FIRST
    logging::init_logging(LoggingConfig::from_env()).context("failed to initialize logging")?;

    let config = AppConfig::from_env().context("invalid configuration")?;
    let store = store::connect(&config).await?;
    let cors = app::cors_layer(&config.cors_allowed_origins)?;

    let state = AppState::new(store);
    let app = app::create_app(state, cors);

    let addr = config.bind_addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("🚀 Money Manager backend running at http://{}/", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
