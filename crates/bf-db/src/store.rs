//! Async store adapter over the connection pool.
//!
//! Queries are synchronous rusqlite calls; the adapter moves each one onto
//! the blocking thread pool so handlers never stall the runtime.

use async_trait::async_trait;
use bf_core::ports::{ArtifactStore, EventProfile, EventStore};
use bf_core::{Artifact, BrandingSpec, Error, EventId, Result};

use crate::pool::{get_conn, init_memory_pool, init_pool, DbPool};
use crate::queries;

/// SQLite-backed event and artifact store.
#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Open (and migrate) the database file at `path`.
    pub fn open(path: &str) -> Result<Self> {
        Ok(Self::new(init_pool(path)?))
    }

    /// Fresh isolated in-memory database.
    pub fn in_memory() -> Result<Self> {
        Ok(Self::new(init_memory_pool()?))
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&rusqlite::Connection) -> Result<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = get_conn(&pool)?;
            f(&conn)
        })
        .await
        .map_err(|e| Error::Internal(format!("database task failed: {e}")))?
    }

    pub async fn create_event(
        &self,
        name: String,
        slug: String,
        branding: BrandingSpec,
        settings: serde_json::Value,
    ) -> Result<EventProfile> {
        self.with_conn(move |conn| {
            queries::events::create_event(conn, &name, &slug, &branding, &settings)
        })
        .await
    }

    pub async fn list_events(&self) -> Result<Vec<EventProfile>> {
        self.with_conn(queries::events::list_events).await
    }

    pub async fn delete_event(&self, event_id: EventId) -> Result<bool> {
        self.with_conn(move |conn| queries::events::delete_event(conn, event_id))
            .await
    }
}

#[async_trait]
impl EventStore for SqliteStore {
    async fn get_event(&self, event_id: EventId) -> Result<Option<EventProfile>> {
        self.with_conn(move |conn| queries::events::get_event(conn, event_id))
            .await
    }
}

#[async_trait]
impl ArtifactStore for SqliteStore {
    async fn insert_artifact(&self, artifact: &Artifact) -> Result<()> {
        let artifact = artifact.clone();
        self.with_conn(move |conn| queries::artifacts::insert_artifact(conn, &artifact))
            .await
    }

    async fn list_artifacts(&self, event_id: EventId) -> Result<Vec<Artifact>> {
        self.with_conn(move |conn| queries::artifacts::list_for_event(conn, event_id))
            .await
    }

    async fn delete_artifacts(&self, event_id: EventId) -> Result<Vec<Artifact>> {
        self.with_conn(move |conn| queries::artifacts::delete_for_event(conn, event_id))
            .await
    }
}
