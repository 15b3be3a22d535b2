//! Server initialization and routing.
//!
//! The middleware chain is nested in a fixed order: request-ID assignment
//! outermost, then request logging, then the router. Metrics recording is a
//! route layer on `/convert` alone so scrape and health traffic never
//! touches the conversion metrics.

use crate::config::ServerConfig;
use crate::middleware::{log_requests, request_id, track_conversions};
use crate::routes;
use crate::routes::convert::{BODY_SLACK, MAX_FILE_SIZE};
use crate::state::AppState;
use axum::extract::DefaultBodyLimit;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;

/// Build the router with all routes and middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
    let convert_route = Router::new()
        .route(
            "/convert",
            post(routes::convert::convert).fallback(routes::convert::method_not_allowed),
        )
        .layer(DefaultBodyLimit::max(MAX_FILE_SIZE + BODY_SLACK))
        .route_layer(from_fn_with_state(state.clone(), track_conversions));

    Router::new()
        .merge(convert_route)
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::health::metrics))
        .fallback(routes::not_found)
        .layer(from_fn(log_requests))
        .layer(from_fn(request_id))
        .with_state(state)
}

/// Start the docpdf HTTP server.
///
/// Initializes JSON logging to stderr, binds the configured TCP address, and
/// blocks until the server is shut down via SIGTERM or Ctrl+C.
pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&config.log_level))
        .with_target(false)
        .with_writer(std::io::stderr)
        .json()
        .flatten_event(true)
        .init();

    let state = Arc::new(AppState::new(config.clone()));
    let app = build_router(state);

    let addr: SocketAddr = config.socket_addr()?;
    tracing::info!(addr = %addr, soffice = %config.libreoffice_path, "starting server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shutdown complete");
    Ok(())
}

/// Shutdown signal handler.
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("received SIGTERM, shutting down..."),
    }
}
