//! expensectl-server: persistence, HTTP API, reports and sync
//!
//! Every query is scoped to the owning user. The HTTP layer authenticates
//! requests with bearer API keys and maps domain errors onto status codes.

pub mod db;
pub mod http;
pub mod models;
pub mod reports;
pub mod sync;

pub use db::{create_pool, create_pool_with_options, DbError};
pub use http::{build_router, run_server, ApiError, AppSettings, AppState, ServerConfig, ServerError};
pub use sync::{SyncEngine, SyncError};
