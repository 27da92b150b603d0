//! Artifact record operations.

use bf_core::{Artifact, Error, EventId, Result};
use rusqlite::Connection;

use crate::models::{artifact_from_row, format_timestamp, ARTIFACT_COLUMNS};

/// Insert a finished artifact record.
pub fn insert_artifact(conn: &Connection, artifact: &Artifact) -> Result<()> {
    conn.execute(
        "INSERT INTO artifacts (id, event_id, session_id, kind, storage_key, public_url,
                                thumbnail_url, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            artifact.id.to_string(),
            artifact.event_id.to_string(),
            artifact.session_id.map(|s| s.to_string()),
            artifact.kind.as_str(),
            artifact.storage_key,
            artifact.public_url,
            artifact.thumbnail_url,
            format_timestamp(&artifact.created_at),
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;
    Ok(())
}

/// All artifacts of an event, newest first.
pub fn list_for_event(conn: &Connection, event_id: EventId) -> Result<Vec<Artifact>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {ARTIFACT_COLUMNS} FROM artifacts WHERE event_id = ?1
             ORDER BY created_at DESC, rowid DESC"
        ))
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([event_id.to_string()], artifact_from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Number of artifacts recorded for an event.
pub fn count_for_event(conn: &Connection, event_id: EventId) -> Result<usize> {
    let n: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM artifacts WHERE event_id = ?1",
            [event_id.to_string()],
            |row| row.get(0),
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n as usize)
}

/// Delete every artifact record of an event and return the removed rows.
///
/// Selection and deletion run in one transaction so the returned list matches
/// exactly what was removed.
pub fn delete_for_event(conn: &Connection, event_id: EventId) -> Result<Vec<Artifact>> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| Error::database(e.to_string()))?;
    let removed = list_for_event(&tx, event_id)?;
    tx.execute(
        "DELETE FROM artifacts WHERE event_id = ?1",
        [event_id.to_string()],
    )
    .map_err(|e| Error::database(e.to_string()))?;
    tx.commit().map_err(|e| Error::database(e.to_string()))?;
    Ok(removed)
}
