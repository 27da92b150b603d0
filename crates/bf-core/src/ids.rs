//! Typed ID wrappers for events, artifacts, and capture sessions.
//!
//! Each ID is a newtype over `Uuid`, so an `ArtifactId` can never be passed
//! where an `EventId` is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Length of the short id fragment used in archive entry names.
pub const SHORT_ID_LEN: usize = 8;

macro_rules! typed_id {
    ($($(#[doc = $doc:expr])* $name:ident),+ $(,)?) => {
        $(
            $(#[doc = $doc])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
            #[serde(transparent)]
            pub struct $name(Uuid);

            impl $name {
                /// Create a new random ID.
                #[must_use]
                pub fn new() -> Self {
                    Self(Uuid::new_v4())
                }

                /// Return the inner UUID value.
                #[must_use]
                pub fn as_uuid(&self) -> &Uuid {
                    &self.0
                }

                /// First [`SHORT_ID_LEN`] hex characters of the simple form.
                #[must_use]
                pub fn short(&self) -> String {
                    let mut s = self.0.simple().to_string();
                    s.truncate(SHORT_ID_LEN);
                    s
                }
            }

            impl Default for $name {
                fn default() -> Self {
                    Self::new()
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }

            impl FromStr for $name {
                type Err = uuid::Error;

                fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                    Uuid::parse_str(s).map(Self)
                }
            }

            impl From<Uuid> for $name {
                fn from(uuid: Uuid) -> Self {
                    Self(uuid)
                }
            }

            impl From<$name> for Uuid {
                fn from(id: $name) -> Self {
                    id.0
                }
            }
        )+
    };
}

typed_id! {
    /// Identifier of a photo event (wedding, party, conference booth).
    EventId,
    /// Identifier of a finished artifact.
    ArtifactId,
    /// Identifier of one capture session at the booth.
    SessionId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        assert_ne!(ArtifactId::new(), ArtifactId::new());
    }

    #[test]
    fn display_and_from_str() {
        let id = EventId::new();
        let parsed: EventId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn serde_is_transparent() {
        let id = SessionId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
        let back: SessionId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }

    #[test]
    fn short_fragment() {
        let uuid = Uuid::parse_str("1a2b3c4d-0000-4000-8000-000000000000").unwrap();
        let id = ArtifactId::from(uuid);
        assert_eq!(id.short(), "1a2b3c4d");
        assert_eq!(id.short().len(), SHORT_ID_LEN);
    }

    #[test]
    fn invalid_from_str() {
        assert!(EventId::from_str("not-a-uuid").is_err());
    }
}
