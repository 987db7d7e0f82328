//! Axum server setup
//!
//! Server skeleton with:
//! - Localhost-only CORS by default
//! - Tracing middleware and a per-request timeout
//! - `/static` served from the base directory
//! - Graceful shutdown on SIGTERM/Ctrl+C

use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, StatusCode};
use axum::Router;
use sqlx::SqlitePool;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::routes;
use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::images::ImageStore;

/// Upper bound on request bodies (multipart image uploads)
const MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

/// Origins allowed when CORS is not permissive
const LOCAL_ORIGINS: [&str; 4] = [
    "http://localhost:3000",
    "http://localhost:8000",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:8000",
];

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub images: ImageStore,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: &ServerConfig) -> Self {
        Self {
            pool,
            images: ImageStore::new(&config.base_dir),
        }
    }
}

/// Build the application router. Split out from `run_server` so tests can
/// drive it with `oneshot`.
pub fn build_router(state: Arc<AppState>, config: &ServerConfig) -> Router {
    let cors = if config.cors_permissive {
        tracing::warn!("CORS: Permissive mode enabled - all origins allowed");
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(LOCAL_ORIGINS.map(HeaderValue::from_static))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        .merge(routes::health::router())
        .merge(routes::items::router())
        .merge(routes::children::router())
        .merge(routes::tags::router())
        .merge(routes::labels::router())
        .merge(routes::states::router())
        .merge(routes::search::router())
        .nest_service("/static", ServeDir::new(config.static_dir()))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(timeout_layer(config))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Handlers that overrun the configured budget answer 408.
fn timeout_layer(config: &ServerConfig) -> TimeoutLayer {
    TimeoutLayer::with_status_code(
        StatusCode::REQUEST_TIMEOUT,
        Duration::from_secs(config.request_timeout_secs),
    )
}

/// Run the HTTP server.
///
/// The schema must already be migrated; see `db::migrations`.
///
/// # Example
///
/// ```ignore
/// let pool = create_pool(&config.database_url).await?;
/// migrations::run(&pool).await?;
/// run_server(pool, config).await?;
/// ```
pub async fn run_server(pool: SqlitePool, config: ServerConfig) -> ServerResult<()> {
    let state = AppState::new(pool, &config);

    tokio::fs::create_dir_all(state.images.images_dir()).await?;
    tracing::info!(base_dir = %config.base_dir.display(), "Serving static files");

    let app = build_router(Arc::new(state), &config);

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::get;
    use tower::ServiceExt;

    #[tokio::test(start_paused = true)]
    async fn slow_handler_times_out_with_408() {
        let mut config = ServerConfig::with_base_dir("/tmp/stowctl-unused");
        config.request_timeout_secs = 2;

        let app = Router::new()
            .route("/stall", get(|| std::future::pending::<&'static str>()))
            .layer(timeout_layer(&config));

        let response = app
            .oneshot(Request::builder().uri("/stall").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    }
}
