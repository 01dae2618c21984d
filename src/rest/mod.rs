// rest/mod.rs — Public REST API server.
//
// Axum HTTP server bridging REST calls to the scan backends.
//
// Endpoints:
//   POST /api/v1/scan/url
//   POST /api/v1/scan/html
//   GET  /api/v1/health

pub mod routes;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::AppContext;

pub const REST_PORT: u16 = 4320;

pub async fn start_rest_server(ctx: Arc<AppContext>, port: u16) -> Result<()> {
    let bind = format!("127.0.0.1:{port}");
    let addr: SocketAddr = bind.parse()?;

    let router = build_router(ctx);

    info!("REST API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

pub fn build_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/api/v1/health", get(routes::health::health))
        .route("/api/v1/scan/url", post(routes::scan::scan_url))
        .route("/api/v1/scan/html", post(routes::scan::scan_html))
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}
