//! Axum server setup
//!
//! Server skeleton with:
//! - Localhost-only CORS by default
//! - Tracing and timeout middleware
//! - Graceful shutdown on SIGTERM/Ctrl+C

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderValue, StatusCode};
use axum::Router;
use expensectl_core::{ExpensesConfig, MoneyFormat};
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::routes;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to (default: 127.0.0.1:3030)
    pub bind_addr: SocketAddr,

    /// Allow permissive CORS (default: false = localhost only)
    ///
    /// WARNING: Setting this to true allows any origin.
    pub cors_permissive: bool,

    /// Upper bound on handling a single request
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3030)),
            cors_permissive: false,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ServerConfig {
    pub fn from_config(config: &ExpensesConfig) -> Result<Self, ServerError> {
        let bind_addr = config
            .server
            .bind
            .parse()
            .map_err(|source| ServerError::Bind {
                addr: config.server.bind.clone(),
                source,
            })?;
        Ok(Self {
            bind_addr,
            cors_permissive: config.server.cors_permissive,
            request_timeout: Duration::from_secs(config.server.request_timeout_secs),
        })
    }
}

/// Presentation settings shared by the handlers
#[derive(Debug, Clone)]
pub struct AppSettings {
    /// Items per page on paginated lists
    pub page_size: u32,
    /// Items on the dashboard and category previews
    pub index_count: u32,
    pub money: MoneyFormat,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self::from(&ExpensesConfig::default())
    }
}

impl From<&ExpensesConfig> for AppSettings {
    fn from(config: &ExpensesConfig) -> Self {
        Self {
            page_size: config.expenses.page_size,
            index_count: config.expenses.index_count,
            money: config.money.clone(),
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub settings: AppSettings,
}

fn cors_layer(permissive: bool) -> CorsLayer {
    if permissive {
        tracing::warn!("CORS: Permissive mode enabled - all origins allowed");
        return CorsLayer::permissive();
    }
    CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://localhost:3030"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
            HeaderValue::from_static("http://127.0.0.1:3030"),
        ])
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Requests running longer than `limit` get 408.
fn timeout_layer(limit: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, limit)
}

/// All routes without middleware.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::dashboard::router())
        .merge(routes::categories::router())
        .merge(routes::expenses::router())
        .merge(routes::bills::router())
        .merge(routes::templates::router())
        .merge(routes::item_templates::router())
        .merge(routes::search::router())
        .merge(routes::autocomplete::router())
        .merge(routes::reports::router())
        .merge(routes::lite::router())
        .merge(routes::sync::router());

    Router::new()
        .merge(routes::health::router())
        .nest("/api", api)
        .with_state(Arc::new(state))
}

/// Run the HTTP server.
///
/// # Example
///
/// ```ignore
/// let pool = create_pool(&database_url).await?;
/// run_server(pool, ServerConfig::default(), AppSettings::default()).await?;
/// ```
pub async fn run_server(pool: PgPool, config: ServerConfig, settings: AppSettings) -> Result<(), ServerError> {
    let state = AppState { pool, settings };

    let app = build_router(state)
        .layer(cors_layer(config.cors_permissive))
        .layer(timeout_layer(config.request_timeout))
        .layer(TraceLayer::new_for_http());

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
            tracing::error!("failed to listen for Ctrl+C: {}", e);
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
                tracing::error!("failed to install SIGTERM handler: {}", e);
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

/// Server error type
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid bind address '{addr}': {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    /// Router over a pool that never connects; enough for routes that fail
    /// before touching the database.
    pub(crate) fn lazy_router() -> Router {
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy("postgres://expensectl@127.0.0.1:1/expensectl")
            .unwrap();
        build_router(AppState {
            pool,
            settings: AppSettings::default(),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn slow_requests_time_out() {
        use axum::{body::Body, http::Request, routing::get};
        use tower::ServiceExt;

        let app = Router::new()
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    "done"
                }),
            )
            .layer(timeout_layer(Duration::from_secs(1)));

        let response = app
            .oneshot(Request::get("/slow").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    }

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 3030);
        assert!(!config.cors_permissive);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn config_from_file_settings() {
        let mut file = ExpensesConfig::default();
        file.server.bind = "0.0.0.0:8080".into();
        file.server.request_timeout_secs = 5;
        let config = ServerConfig::from_config(&file).unwrap();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.request_timeout, Duration::from_secs(5));

        file.server.bind = "not an address".into();
        assert!(matches!(ServerConfig::from_config(&file), Err(ServerError::Bind { .. })));
    }

    #[test]
    fn settings_from_config() {
        let settings = AppSettings::default();
        assert_eq!(settings.page_size, 25);
        assert_eq!(settings.index_count, 10);
    }
}
