//! Status API.
//!
//! # Data Flow
//! ```text
//! GET /status            → StatusBoard::all()
//! GET /status/{cluster}  → StatusBoard::cluster()  (404 if unknown)
//! GET /health            → liveness
//! ```
//!
//! # Design Decisions
//! - Read-only: handlers never touch pools or stores
//! - Listener mode is http, https or both; an unknown mode falls back to http
//! - Both listeners stop on the shared shutdown signal

pub mod handlers;
pub mod tls;

use axum::{routing::get, Router};
use std::io;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::{ApiConfig, ConnectionMode};
use crate::lifecycle::Shutdown;
use crate::status::StatusBoard;
use self::handlers::*;

/// Errors raised while starting the API listeners.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid bind address '{0}'")]
    BindAddress(String),

    #[error("https mode requires cert_path and key_path")]
    MissingTls,

    #[error("API listener IO error: {0}")]
    Io(#[from] io::Error),
}

pub fn setup_status_router(board: Arc<StatusBoard>) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/status", get(get_all_status))
        .route("/status/{cluster}", get(get_cluster_status))
        .layer(TraceLayer::new_for_http())
        .with_state(board)
}

/// Serve the status API until shutdown.
pub async fn serve(config: ApiConfig, board: Arc<StatusBoard>, shutdown: Shutdown) -> Result<(), ApiError> {
    let mode = ConnectionMode::parse_or_default(&config.mode);
    let router = setup_status_router(board);

    match mode {
        ConnectionMode::Http => serve_http(&config.bind_address, router, shutdown).await,
        ConnectionMode::Https => serve_https(&config, router, shutdown).await,
        ConnectionMode::Both => {
            let (http, https) = tokio::join!(
                serve_http(&config.bind_address, router.clone(), shutdown.clone()),
                serve_https(&config, router, shutdown),
            );
            http.and(https)
        }
    }
}

async fn serve_http(bind: &str, router: Router, shutdown: Shutdown) -> Result<(), ApiError> {
    let addr = parse_addr(bind)?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(address = %addr, "Status API listening (http)");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.wait().await })
        .await?;

    tracing::info!(address = %addr, "Status API stopped (http)");
    Ok(())
}

async fn serve_https(config: &ApiConfig, router: Router, shutdown: Shutdown) -> Result<(), ApiError> {
    let addr = parse_addr(&config.tls_bind_address)?;
    let (cert, key) = match (&config.cert_path, &config.key_path) {
        (Some(cert), Some(key)) => (cert, key),
        _ => return Err(ApiError::MissingTls),
    };
    let tls = tls::load_tls_config(Path::new(cert), Path::new(key)).await?;

    let handle = axum_server::Handle::new();
    let stopper = handle.clone();
    tokio::spawn(async move {
        shutdown.wait().await;
        stopper.graceful_shutdown(Some(Duration::from_secs(5)));
    });

    tracing::info!(address = %addr, "Status API listening (https)");
    axum_server::bind_rustls(addr, tls)
        .handle(handle)
        .serve(router.into_make_service())
        .await?;

    tracing::info!(address = %addr, "Status API stopped (https)");
    Ok(())
}

fn parse_addr(raw: &str) -> Result<SocketAddr, ApiError> {
    raw.parse().map_err(|_| ApiError::BindAddress(raw.to_string()))
}
