//! Rust structs mapping to database tables.
//!
//! Each model implements `from_row` for constructing itself from a
//! `rusqlite::Row`.

use bf_core::ports::EventProfile;
use bf_core::{Artifact, ArtifactKind, BrandingSpec};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// helpers
// ---------------------------------------------------------------------------

fn conversion_error(
    idx: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

/// Parse a UUID-based ID from a text column.
fn parse_id<T: From<Uuid>>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T> {
    let s: String = row.get(idx)?;
    let uuid = Uuid::parse_str(&s).map_err(|e| conversion_error(idx, e))?;
    Ok(T::from(uuid))
}

fn parse_opt_id<T: From<Uuid>>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<T>> {
    let s: Option<String> = row.get(idx)?;
    s.map(|v| {
        Uuid::parse_str(&v)
            .map(T::from)
            .map_err(|e| conversion_error(idx, e))
    })
    .transpose()
}

fn parse_timestamp(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let s: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn parse_json<T: serde::de::DeserializeOwned>(
    row: &rusqlite::Row,
    idx: usize,
) -> rusqlite::Result<T> {
    let s: String = row.get(idx)?;
    serde_json::from_str(&s).map_err(|e| conversion_error(idx, e))
}

/// Fixed-width RFC 3339 so text ordering matches time ordering.
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

pub const EVENT_COLUMNS: &str = "id, name, slug, branding, settings, created_at";

/// Build an [`EventProfile`] from an `events` row selected with
/// [`EVENT_COLUMNS`].
pub fn event_from_row(row: &rusqlite::Row) -> rusqlite::Result<EventProfile> {
    let branding: BrandingSpec = parse_json(row, 3)?;
    Ok(EventProfile {
        id: parse_id(row, 0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
        branding,
        settings: parse_json(row, 4)?,
        created_at: parse_timestamp(row, 5)?,
    })
}

// ---------------------------------------------------------------------------
// Artifact
// ---------------------------------------------------------------------------

pub const ARTIFACT_COLUMNS: &str =
    "id, event_id, session_id, kind, storage_key, public_url, thumbnail_url, created_at";

/// Build an [`Artifact`] from an `artifacts` row selected with
/// [`ARTIFACT_COLUMNS`].
pub fn artifact_from_row(row: &rusqlite::Row) -> rusqlite::Result<Artifact> {
    let kind: String = row.get(3)?;
    let kind: ArtifactKind = kind.parse().map_err(|e| conversion_error(3, e))?;
    Ok(Artifact {
        id: parse_id(row, 0)?,
        event_id: parse_id(row, 1)?,
        session_id: parse_opt_id(row, 2)?,
        kind,
        storage_key: row.get(4)?,
        public_url: row.get(5)?,
        thumbnail_url: row.get(6)?,
        created_at: parse_timestamp(row, 7)?,
    })
}
