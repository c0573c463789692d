//! Liveness endpoint for hosts that expect the process to serve HTTP.

use axum::{routing::get, Router};
use std::net::SocketAddr;
use tracing::{error, info};

pub fn router() -> Router {
    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
}

async fn home() -> &'static str {
    "Bot is running ✅"
}

async fn health() -> &'static str {
    "OK"
}

/// Serves [`router`] on `0.0.0.0:port` until the process exits.
pub async fn serve(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("🌐 Keep-alive server listening on {}", addr);

    axum::serve(listener, router()).await?;

    Ok(())
}

/// Runs [`serve`] in the background; port 0 disables it.
pub fn spawn(port: u16) {
    if port == 0 {
        info!("Keep-alive server disabled");
        return;
    }

    tokio::spawn(async move {
        if let Err(e) = serve(port).await {
            error!("❌ Keep-alive server stopped: {:?}", e);
        }
    });
}
