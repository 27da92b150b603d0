//! Event CRUD operations.

use bf_core::ports::EventProfile;
use bf_core::{BrandingSpec, Error, EventId, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};

use crate::models::{event_from_row, format_timestamp, EVENT_COLUMNS};

/// Create a new event. Slugs are unique; a duplicate is a validation error.
pub fn create_event(
    conn: &Connection,
    name: &str,
    slug: &str,
    branding: &BrandingSpec,
    settings: &serde_json::Value,
) -> Result<EventProfile> {
    let id = EventId::new();
    let created_at = Utc::now();
    let branding_json =
        serde_json::to_string(branding).map_err(|e| Error::Internal(e.to_string()))?;
    let settings_json =
        serde_json::to_string(settings).map_err(|e| Error::Internal(e.to_string()))?;

    conn.execute(
        "INSERT INTO events (id, name, slug, branding, settings, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            id.to_string(),
            name,
            slug,
            branding_json,
            settings_json,
            format_timestamp(&created_at)
        ],
    )
    .map_err(|e| match e {
        rusqlite::Error::SqliteFailure(ref f, _)
            if f.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Error::Validation(format!("event slug '{slug}' is already taken"))
        }
        other => Error::database(other.to_string()),
    })?;

    Ok(EventProfile {
        id,
        name: name.to_string(),
        slug: slug.to_string(),
        branding: branding.clone(),
        settings: settings.clone(),
        created_at,
    })
}

/// Get an event by ID.
pub fn get_event(conn: &Connection, id: EventId) -> Result<Option<EventProfile>> {
    conn.query_row(
        &format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1"),
        [id.to_string()],
        event_from_row,
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))
}

/// List all events, newest first.
pub fn list_events(conn: &Connection) -> Result<Vec<EventProfile>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {EVENT_COLUMNS} FROM events ORDER BY created_at DESC, rowid DESC"
        ))
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([], event_from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Delete an event (cascades to its artifact records).
pub fn delete_event(conn: &Connection, id: EventId) -> Result<bool> {
    let n = conn
        .execute("DELETE FROM events WHERE id = ?1", [id.to_string()])
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{get_conn, init_memory_pool};

    #[test]
    fn create_and_get() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();

        let branding = BrandingSpec {
            overlay_text: "Ana & Luis".into(),
            show_date: true,
            ..Default::default()
        };
        let created = create_event(
            &conn,
            "Wedding",
            "ana-luis",
            &branding,
            &serde_json::json!({"countdown": 3}),
        )
        .unwrap();

        let fetched = get_event(&conn, created.id).unwrap().unwrap();
        assert_eq!(fetched.name, "Wedding");
        assert_eq!(fetched.branding, branding);
        assert_eq!(fetched.settings["countdown"], 3);
    }

    #[test]
    fn missing_event_is_none() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();
        assert!(get_event(&conn, EventId::new()).unwrap().is_none());
    }

    #[test]
    fn duplicate_slug_rejected() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();
        let b = BrandingSpec::default();
        let v = serde_json::json!({});
        create_event(&conn, "A", "party", &b, &v).unwrap();
        let err = create_event(&conn, "B", "party", &b, &v).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn list_and_delete() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();
        let b = BrandingSpec::default();
        let v = serde_json::json!({});
        let first = create_event(&conn, "A", "a", &b, &v).unwrap();
        let second = create_event(&conn, "B", "b", &b, &v).unwrap();

        let all = list_events(&conn).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, second.id);

        assert!(delete_event(&conn, first.id).unwrap());
        assert!(!delete_event(&conn, first.id).unwrap());
        assert_eq!(list_events(&conn).unwrap().len(), 1);
    }
}
