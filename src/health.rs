//! Liveness endpoint.
//!
//! Reports that the process is up. It does not look at the broker session.

use std::net::SocketAddr;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::{error, info};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthBody {
    pub status: &'static str,
    pub service: String,
}

/// `GET /health` → `{"status":"ok","service":"<service_name>"}`
pub fn router(service_name: &str) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .with_state(service_name.to_string())
}

async fn health_check(State(service): State<String>) -> Json<HealthBody> {
    Json(HealthBody {
        status: "ok",
        service,
    })
}

/// Binds the listener up front so a taken port fails startup, then serves
/// the router on a background task.
pub async fn serve(port: u16, service_name: &str) -> std::io::Result<SocketAddr> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    let addr = listener.local_addr()?;
    let app = router(service_name);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "Health check server stopped");
        }
    });

    info!("Health check server listening on port {}", addr.port());
    Ok(addr)
}
