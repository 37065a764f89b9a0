use axum::{routing::get, Router};
use tracing::info;

use crate::state::AppState;

pub const ROOT_MESSAGE: &str = "Money Manager API is running";

/// Mounted at `/health`; answers without touching the store.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(liveness))
}

async fn liveness() -> &'static str {
    info!("GET /health - Liveness check");
    "OK"
}

/// Served at `/` so a deployment can check the API answers at all.
pub async fn root() -> &'static str {
    info!("GET / - Root");
    ROOT_MESSAGE
}
