//! Connection pool management for SQLite via r2d2.

use std::sync::atomic::{AtomicU64, Ordering};

use bf_core::{Error, Result};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::migrations;

/// Type alias for the database connection pool.
pub type DbPool = Pool<SqliteConnectionManager>;

/// Type alias for a pooled database connection.
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Pragmas applied to every connection. The artifact cascade needs foreign
/// keys on; SQLite defaults them off per connection.
const FILE_PRAGMAS: &str = "PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL;";
const MEMORY_PRAGMAS: &str = "PRAGMA foreign_keys = ON;";

/// Open the SQLite file at `db_path`, creating it if needed, and migrate it.
pub fn init_pool(db_path: &str) -> Result<DbPool> {
    build_migrated(SqliteConnectionManager::file(db_path), FILE_PRAGMAS, 8)
}

/// Fresh in-memory database for tests.
///
/// Each call gets its own shared-cache name, so pooled connections see one
/// database while parallel tests stay isolated. The database lives as long
/// as the pool holds a connection.
pub fn init_memory_pool() -> Result<DbPool> {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let uri = format!("file:boothdb_{n}?mode=memory&cache=shared");
    build_migrated(SqliteConnectionManager::file(uri), MEMORY_PRAGMAS, 4)
}

fn build_migrated(
    manager: SqliteConnectionManager,
    pragmas: &'static str,
    max_size: u32,
) -> Result<DbPool> {
    let manager = manager.with_init(move |conn| conn.execute_batch(pragmas));
    let pool = Pool::builder()
        .max_size(max_size)
        .build(manager)
        .map_err(|e| Error::database(format!("Failed to create connection pool: {e}")))?;

    migrations::run_migrations(&*get_conn(&pool)?)?;
    Ok(pool)
}

/// Check out a pooled connection, mapping pool exhaustion to a database error.
pub fn get_conn(pool: &DbPool) -> Result<PooledConnection> {
    pool.get()
        .map_err(|e| Error::database(format!("Failed to get connection from pool: {e}")))
}
