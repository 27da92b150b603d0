//! Finished media artifacts and their kinds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ids::{ArtifactId, EventId, SessionId};
use crate::Error;

/// What kind of media an artifact holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Single,
    Strip,
    Gif,
    Boomerang,
    Ai,
    Filtered,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 6] = [
        ArtifactKind::Single,
        ArtifactKind::Strip,
        ArtifactKind::Gif,
        ArtifactKind::Boomerang,
        ArtifactKind::Ai,
        ArtifactKind::Filtered,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Strip => "strip",
            Self::Gif => "gif",
            Self::Boomerang => "boomerang",
            Self::Ai => "ai",
            Self::Filtered => "filtered",
        }
    }

    /// Whether the artifact is an animated sequence.
    pub fn is_animated(&self) -> bool {
        matches!(self, Self::Gif | Self::Boomerang)
    }

    /// File extension used for freshly encoded artifacts of this kind.
    pub fn default_extension(&self) -> &'static str {
        if self.is_animated() {
            "gif"
        } else {
            "jpg"
        }
    }

    /// MIME type used when uploading artifacts of this kind.
    pub fn content_type(&self) -> &'static str {
        if self.is_animated() {
            "image/gif"
        } else {
            "image/jpeg"
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| Error::Validation(format!("unknown artifact kind '{s}'")))
    }
}

/// A finished, persisted media object.
///
/// Created once per successful encode and upload; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: ArtifactId,
    pub event_id: EventId,
    pub session_id: Option<SessionId>,
    pub kind: ArtifactKind,
    pub storage_key: String,
    pub public_url: String,
    pub thumbnail_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Artifact {
    /// File extension of the stored object, falling back to the kind default.
    pub fn extension(&self) -> &str {
        self.storage_key
            .rsplit_once('/')
            .map_or(self.storage_key.as_str(), |(_, name)| name)
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty())
            .unwrap_or_else(|| self.kind.default_extension())
    }
}

/// Storage key for an artifact's primary object.
///
/// Keys embed the artifact id, so they are unique and never reassigned.
pub fn storage_key(event_id: EventId, kind: ArtifactKind, id: ArtifactId) -> String {
    format!(
        "events/{event_id}/{kind}/{id}.{}",
        kind.default_extension()
    )
}

/// Storage key for an artifact's thumbnail object.
pub fn thumbnail_key(event_id: EventId, kind: ArtifactKind, id: ArtifactId) -> String {
    format!("events/{event_id}/{kind}/{id}_thumb.jpg")
}
