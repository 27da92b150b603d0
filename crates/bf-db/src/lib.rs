//! bf-db: database access and persistence layer.
//!
//! This crate provides SQLite-backed storage with connection pooling,
//! embedded migrations, typed models, and query modules for events and their
//! artifacts. [`SqliteStore`] adapts the synchronous queries to the async
//! store traits defined in `bf-core`.

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;
pub mod store;

pub use store::SqliteStore;
