use std::net::SocketAddr;

use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use shared::{
    error::ApiError,
    protocol::{TrackEvent, TRACK_EVENT_ROUTE},
};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod config;

use config::load_settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = load_settings();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let app = build_router();

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "collector listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router() -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(TRACK_EVENT_ROUTE, post(track_event))
}

async fn healthz() -> &'static str {
    "ok"
}

async fn track_event(
    Json(event): Json<TrackEvent>,
) -> Result<StatusCode, (StatusCode, Json<ApiError>)> {
    event
        .validate()
        .map_err(|e| (StatusCode::BAD_REQUEST, Json(ApiError::from(e))))?;

    let details = serde_json::Value::Object(event.details);
    info!(
        target: "interaction",
        interaction_id = %Uuid::new_v4(),
        received_at = %Utc::now().to_rfc3339(),
        event_type = %event.event_type,
        control_id = %event.control_id,
        %details,
        "interaction recorded"
    );
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
