//! Database layer - connection pool, schema and repositories
//!
//! - Every table is scoped by `user_id`; repositories take it explicitly
//! - List operations use JOINs and window counts, never N+1 queries
//! - Multi-step writes run in one transaction
//! - Deleting a synchronized record leaves a tombstone in `deletion_records`

pub mod migrations;
pub mod pool;
pub mod repos;

pub use pool::{create_pool, create_pool_with_options};
pub use repos::*;
