//! Artifact production service.
//!
//! [`ArtifactService`] is the one place where captured frames become stored
//! artifacts. Every encode path follows the same shape: look up the event,
//! run the CPU-bound encode on the blocking pool, upload the primary object
//! (fatal on failure), upload the thumbnail (best-effort), record the
//! artifact, and announce it on the live channel.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use tokio_util::sync::CancellationToken;

use bf_av::{Compositor, Frame, PhotoFilter, SequenceEncoder, StripComposer, ToolRegistry};
use bf_core::artifact::{storage_key, thumbnail_key};
use bf_core::config::SequenceConfig;
use bf_core::events::LiveUpdate;
use bf_core::ports::{ArtifactStore, EventProfile, EventStore, LiveChannel, ObjectStorage};
use bf_core::{
    Artifact, ArtifactId, ArtifactKind, BrandingSpec, Error, EventId, Result, SessionId,
    StyleChoice,
};
use bf_export::{ArchiveStream, ArchiveStreamer, Fetch};
use bf_restyle::RestyleGateway;

/// Collaborators the service writes through.
#[derive(Clone)]
pub struct Collaborators {
    pub events: Arc<dyn EventStore>,
    pub artifacts: Arc<dyn ArtifactStore>,
    pub storage: Arc<dyn ObjectStorage>,
    pub live: Arc<dyn LiveChannel>,
}

/// The media engines the service drives.
pub struct Engines {
    pub compositor: Compositor,
    pub strips: StripComposer,
    pub tools: Arc<ToolRegistry>,
    pub sequence: SequenceConfig,
    pub restyle: RestyleGateway,
    pub archive: ArchiveStreamer,
    /// Fetches branding logos.
    pub logos: Arc<dyn Fetch>,
}

/// A streamed archive plus the filename it should be downloaded as.
pub struct ArchiveDownload {
    pub filename: String,
    pub stream: ArchiveStream,
}

pub struct ArtifactService {
    ports: Collaborators,
    engines: Engines,
}

impl ArtifactService {
    pub fn new(ports: Collaborators, engines: Engines) -> Self {
        Self { ports, engines }
    }

    /// Fetch an event or fail with `NotFound`.
    pub async fn event(&self, event_id: EventId) -> Result<EventProfile> {
        self.ports
            .events
            .get_event(event_id)
            .await?
            .ok_or_else(|| Error::not_found("event", event_id))
    }

    /// Single branded photo.
    pub async fn encode_single(
        &self,
        frame: Frame,
        event_id: EventId,
        session_id: Option<SessionId>,
    ) -> Result<Artifact> {
        self.encode_photo(frame, None, event_id, session_id).await
    }

    /// Single photo with a colour filter applied before branding.
    pub async fn encode_filtered(
        &self,
        frame: Frame,
        filter: PhotoFilter,
        event_id: EventId,
        session_id: Option<SessionId>,
    ) -> Result<Artifact> {
        self.encode_photo(frame, Some(filter), event_id, session_id)
            .await
    }

    async fn encode_photo(
        &self,
        frame: Frame,
        filter: Option<PhotoFilter>,
        event_id: EventId,
        session_id: Option<SessionId>,
    ) -> Result<Artifact> {
        let event = self.event(event_id).await?;
        let logo = self.fetch_logo(event_id, &event.branding).await;
        let compositor = self.engines.compositor.clone();
        let branding = event.branding.clone();
        let photo = tokio::task::spawn_blocking(move || {
            compositor.compose(&frame, &branding, filter, logo.as_deref())
        })
        .await
        .map_err(|e| Error::Internal(format!("compose task failed: {e}")))??;

        let kind = if filter.is_some() {
            ArtifactKind::Filtered
        } else {
            ArtifactKind::Single
        };
        tracing::debug!(
            %event_id,
            kind = %kind,
            width = photo.width,
            height = photo.height,
            branded = photo.branded,
            "Composed photo"
        );
        self.persist(event_id, session_id, kind, photo.image, photo.thumbnail)
            .await
    }

    /// Photo strip from up to four frames.
    pub async fn encode_strip(
        &self,
        frames: Vec<Frame>,
        event_id: EventId,
        session_id: Option<SessionId>,
    ) -> Result<Artifact> {
        let event = self.event(event_id).await?;
        let strips = self.engines.strips.clone();
        let photo = tokio::task::spawn_blocking(move || {
            strips.compose(&frames, &event.branding, &event.name)
        })
        .await
        .map_err(|e| Error::Internal(format!("strip task failed: {e}")))??;

        self.persist(
            event_id,
            session_id,
            ArtifactKind::Strip,
            photo.image,
            photo.thumbnail,
        )
        .await
    }

    /// Looping GIF or boomerang.
    pub async fn encode_sequence(
        &self,
        frames: Vec<Frame>,
        event_id: EventId,
        kind: ArtifactKind,
        session_id: Option<SessionId>,
    ) -> Result<Artifact> {
        if !kind.is_animated() {
            return Err(Error::Validation(format!(
                "'{kind}' is not an animated artifact kind"
            )));
        }
        if frames.is_empty() {
            return Err(Error::Validation(
                "an animation needs at least one frame".into(),
            ));
        }
        self.event(event_id).await?;

        let encoder =
            SequenceEncoder::from_registry(&self.engines.tools, self.engines.sequence.clone())?;
        let gif = match kind {
            ArtifactKind::Boomerang => encoder.encode_boomerang(&frames).await?,
            _ => encoder.encode_gif(&frames).await?,
        };

        let thumbnail = self.poster_thumbnail(frames[0].clone()).await;
        self.persist(event_id, session_id, kind, gif, thumbnail).await
    }

    /// AI-restyled photo. Waits on a loading model are published live.
    pub async fn restyle(
        &self,
        frame: Frame,
        choice: &StyleChoice,
        event_id: EventId,
        session_id: Option<SessionId>,
        cancel: &CancellationToken,
    ) -> Result<Artifact> {
        self.event(event_id).await?;

        let result = self
            .engines
            .restyle
            .restyle(&frame, choice, event_id, cancel)
            .await?;
        tracing::info!(
            %event_id,
            style = %result.style.key,
            attempts = result.attempts,
            "Restyle complete"
        );

        let thumbnail = self
            .poster_thumbnail(Frame::new(0, result.image.clone()))
            .await;
        self.persist(event_id, session_id, ArtifactKind::Ai, result.image, thumbnail)
            .await
    }

    /// All artifacts of an event, newest first.
    pub async fn list_artifacts(&self, event_id: EventId) -> Result<Vec<Artifact>> {
        self.event(event_id).await?;
        self.ports.artifacts.list_artifacts(event_id).await
    }

    /// Stream every artifact of an event as a ZIP.
    ///
    /// Unknown events are `NotFound`; events without artifacts are
    /// `NothingToExport`. Both are decided before any byte is streamed.
    pub async fn export_archive(&self, event_id: EventId) -> Result<ArchiveDownload> {
        let event = self.event(event_id).await?;
        let artifacts = self.ports.artifacts.list_artifacts(event_id).await?;
        tracing::info!(%event_id, count = artifacts.len(), "Starting archive export");

        let stream = self.engines.archive.stream(event_id, artifacts)?;
        Ok(ArchiveDownload {
            filename: format!("{}.zip", event.slug),
            stream,
        })
    }

    /// Delete every artifact of an event, returning how many were removed.
    ///
    /// Storage objects go first and best-effort; a stray object is cheaper
    /// than a record pointing at nothing.
    pub async fn wipe_artifacts(&self, event_id: EventId) -> Result<usize> {
        self.event(event_id).await?;
        let artifacts = self.ports.artifacts.list_artifacts(event_id).await?;

        for artifact in &artifacts {
            let mut keys = vec![artifact.storage_key.clone()];
            if artifact.thumbnail_url.is_some() {
                keys.push(thumbnail_key(event_id, artifact.kind, artifact.id));
            }
            for key in keys {
                if let Err(e) = self.ports.storage.delete(&key).await {
                    tracing::warn!(%event_id, key, error = %e, "Failed to delete stored object");
                }
            }
        }

        let removed = self.ports.artifacts.delete_artifacts(event_id).await?;
        let count = removed.len();
        tracing::info!(%event_id, count, "Wiped artifacts");
        self.ports
            .live
            .publish(event_id, LiveUpdate::ArtifactsWiped { count });
        Ok(count)
    }

    /// The event's logo bytes, or `None` when unset or unreachable.
    async fn fetch_logo(&self, event_id: EventId, branding: &BrandingSpec) -> Option<Bytes> {
        let url = branding.logo_source()?;
        match self.engines.logos.fetch(url).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::warn!(%event_id, url, reason = %e, "Logo fetch failed; composing without it");
                None
            }
        }
    }

    /// Best-effort JPEG thumbnail of a still frame.
    async fn poster_thumbnail(&self, frame: Frame) -> Option<Bytes> {
        let compositor = self.engines.compositor.clone();
        let result = tokio::task::spawn_blocking(move || {
            let img = compositor.resize(&frame.decode()?);
            compositor.thumbnail(&img)
        })
        .await;

        match result {
            Ok(Ok(bytes)) => Some(bytes),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Thumbnail generation failed");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Thumbnail task failed");
                None
            }
        }
    }

    /// Upload, record, and announce a finished artifact.
    async fn persist(
        &self,
        event_id: EventId,
        session_id: Option<SessionId>,
        kind: ArtifactKind,
        image: Bytes,
        thumbnail: Option<Bytes>,
    ) -> Result<Artifact> {
        let id = ArtifactId::new();
        let key = storage_key(event_id, kind, id);
        let size = image.len();
        let public_url = self
            .ports
            .storage
            .put(image, &key, kind.content_type())
            .await
            .map_err(|e| match e {
                Error::StorageWrite { .. } | Error::Validation(_) => e,
                other => Error::storage_write(key.clone(), other),
            })?;

        let thumbnail_url = match thumbnail {
            Some(bytes) => {
                let thumb_key = thumbnail_key(event_id, kind, id);
                match self.ports.storage.put(bytes, &thumb_key, "image/jpeg").await {
                    Ok(url) => Some(url),
                    Err(e) => {
                        tracing::warn!(%event_id, key = thumb_key, error = %e, "Thumbnail upload failed");
                        None
                    }
                }
            }
            None => None,
        };

        let artifact = Artifact {
            id,
            event_id,
            session_id,
            kind,
            storage_key: key,
            public_url,
            thumbnail_url,
            created_at: Utc::now(),
        };

        if let Err(e) = self.ports.artifacts.insert_artifact(&artifact).await {
            tracing::warn!(%event_id, key = artifact.storage_key, "Recording artifact failed; removing uploaded object");
            let mut keys = vec![artifact.storage_key.clone()];
            if artifact.thumbnail_url.is_some() {
                keys.push(thumbnail_key(event_id, kind, id));
            }
            for key in keys {
                if let Err(cleanup) = self.ports.storage.delete(&key).await {
                    tracing::warn!(%event_id, key, error = %cleanup, "Failed to delete orphaned object");
                }
            }
            return Err(e);
        }

        tracing::info!(
            %event_id,
            artifact_id = %artifact.id,
            kind = %kind,
            size,
            "Artifact stored"
        );
        self.ports.live.publish(
            event_id,
            LiveUpdate::ArtifactCreated {
                artifact: artifact.clone(),
            },
        );
        Ok(artifact)
    }
}
