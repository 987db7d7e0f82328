//! Database layer - connection pool, migrations and repositories
//!
//! # Design Principles
//!
//! - One SQLite pool; handlers check out a connection per request
//! - List operations attach tags with one batched query, not one per item
//! - Multi-step mutations run in a transaction
//! - Schema changes only happen through `migrations::run`

pub mod migrations;
pub mod pool;
pub mod repos;

pub use pool::{create_pool, create_pool_with_options};
pub use sqlx::SqlitePool;
pub use repos::*;
