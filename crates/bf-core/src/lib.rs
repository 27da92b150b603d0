//! bf-core: shared types, IDs, errors, configuration, and live-update bus.
//!
//! This crate is the foundational dependency for all other bf-* crates. It
//! defines the artifact and branding model, the style catalog, the
//! collaborator traits the media core talks to (event store, artifact store,
//! object storage, live channel), and a filesystem-backed object storage.

pub mod artifact;
pub mod branding;
pub mod config;
pub mod error;
pub mod events;
pub mod ids;
pub mod ports;
pub mod storage;
pub mod styles;

// Re-export the most commonly used items at the crate root.
pub use artifact::{Artifact, ArtifactKind};
pub use branding::{BrandingSpec, VisibleBranding};
pub use error::{Error, Result};
pub use ids::*;
pub use styles::{StyleCatalog, StyleChoice, StyleSpec};
