//! Unified error type for the boothforge core.
//!
//! All crates funnel their failures into [`Error`], which carries enough context
//! for API handlers to derive an HTTP status code via [`Error::http_status`]
//! and to tell client mistakes apart from retry-worthy upstream trouble via
//! [`Error::is_retryable`].

use std::fmt;

/// Unified error type covering all failure modes in boothforge.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "event").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// Request data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A bulk export was requested for an event without artifacts.
    #[error("Nothing to export for event {0}")]
    NothingToExport(String),

    /// The generative model kept reporting that it is loading.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The generative model endpoint failed hard.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Encoding an artifact failed (image codec or encode process).
    #[error("Encoding error [{stage}]: {message}")]
    Encoding {
        /// The encode stage that failed (e.g. "gif", "strip").
        stage: String,
        /// Human-readable error description.
        message: String,
    },

    /// An external tool (ffmpeg) could not be run.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// Writing a primary artifact to object storage failed.
    #[error("Storage write failed for {key}: {message}")]
    StorageWrite {
        /// Storage key that was being written.
        key: String,
        /// Human-readable error description.
        message: String,
    },

    /// The owning session went away while work was in flight.
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// A database operation failed.
    #[error("Database error: {source}")]
    Database {
        /// The underlying database error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::NotFound { .. } => 404,
            Error::Validation(_) => 400,
            Error::NothingToExport(_) => 404,
            Error::UpstreamUnavailable(_) => 503,
            Error::Upstream(_) => 502,
            Error::Encoding { .. } => 500,
            Error::Tool { .. } => 502,
            Error::StorageWrite { .. } => 503,
            Error::Cancelled(_) => 408,
            Error::Database { .. } => 500,
            Error::Io { .. } => 500,
            Error::Internal(_) => 500,
        }
    }

    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Error::NotFound { .. } => "not_found",
            Error::Validation(_) => "validation_error",
            Error::NothingToExport(_) => "nothing_to_export",
            Error::UpstreamUnavailable(_) => "upstream_unavailable",
            Error::Upstream(_) => "upstream_error",
            Error::Encoding { .. } => "encoding_error",
            Error::Tool { .. } => "tool_error",
            Error::StorageWrite { .. } => "storage_write_error",
            Error::Cancelled(_) => "cancelled",
            Error::Database { .. } => "database_error",
            Error::Io { .. } => "io_error",
            Error::Internal(_) => "internal_error",
        }
    }

    /// Whether the same request is worth retrying later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::UpstreamUnavailable(_) | Error::StorageWrite { .. } | Error::Cancelled(_)
        )
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Database`].
    pub fn database(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::Database {
            source: source.into(),
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Encoding`].
    pub fn encoding(stage: impl Into<String>, message: impl fmt::Display) -> Self {
        Error::Encoding {
            stage: stage.into(),
            message: message.to_string(),
        }
    }

    /// Convenience constructor for [`Error::StorageWrite`].
    pub fn storage_write(key: impl Into<String>, message: impl fmt::Display) -> Self {
        Error::StorageWrite {
            key: key.into(),
            message: message.to_string(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
