//! Collaborator traits the media core depends on.
//!
//! Event configuration, artifact records, object storage, and live updates
//! are owned elsewhere; the core only talks to them through these traits so
//! tests and alternative backends can be swapped in.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::artifact::Artifact;
use crate::branding::BrandingSpec;
use crate::events::LiveUpdate;
use crate::ids::EventId;
use crate::Result;

/// Event configuration as returned by the event store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventProfile {
    pub id: EventId,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub branding: BrandingSpec,
    #[serde(default)]
    pub settings: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Read access to event configuration.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn get_event(&self, event_id: EventId) -> Result<Option<EventProfile>>;
}

/// Persistence of artifact records.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn insert_artifact(&self, artifact: &Artifact) -> Result<()>;

    /// All artifacts of an event, newest first.
    async fn list_artifacts(&self, event_id: EventId) -> Result<Vec<Artifact>>;

    /// Remove all artifact records of an event, returning what was removed.
    async fn delete_artifacts(&self, event_id: EventId) -> Result<Vec<Artifact>>;
}

/// Object storage for artifact bytes. Both operations are idempotent.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `bytes` under `key` and return the public URL.
    async fn put(&self, bytes: Bytes, key: &str, content_type: &str) -> Result<String>;

    async fn delete(&self, key: &str) -> Result<()>;
}

/// Fire-and-forget live-update channel.
///
/// Implementations must swallow their own failures; publishing never fails
/// the caller.
pub trait LiveChannel: Send + Sync {
    fn publish(&self, event_id: EventId, update: LiveUpdate);
}
