//! Event profile CRUD route handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use bf_core::ports::{EventProfile, EventStore};
use bf_core::{BrandingSpec, Error};

use super::parse_event_id;
use crate::context::AppContext;
use crate::error::AppError;

/// Request body for creating an event.
#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    pub name: String,
    /// Derived from `name` when absent.
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub branding: BrandingSpec,
    #[serde(default)]
    pub settings: serde_json::Value,
}

/// Lowercase ASCII alphanumerics joined by single dashes.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// GET /api/events
pub async fn list_events(
    State(ctx): State<AppContext>,
) -> Result<Json<Vec<EventProfile>>, AppError> {
    Ok(Json(ctx.db.list_events().await?))
}

/// POST /api/events
pub async fn create_event(
    State(ctx): State<AppContext>,
    Json(payload): Json<CreateEventRequest>,
) -> Result<impl IntoResponse, AppError> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(Error::Validation("name is required".into()).into());
    }
    let slug = slugify(payload.slug.as_deref().unwrap_or(name));
    if slug.is_empty() {
        return Err(Error::Validation("slug must contain letters or digits".into()).into());
    }
    let settings = if payload.settings.is_null() {
        serde_json::json!({})
    } else {
        payload.settings
    };

    let event = ctx
        .db
        .create_event(name.to_string(), slug, payload.branding, settings)
        .await?;
    tracing::info!(event_id = %event.id, slug = %event.slug, "Event created");
    Ok((StatusCode::CREATED, Json(event)))
}

/// GET /api/events/{id}
pub async fn get_event(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Json<EventProfile>, AppError> {
    let event_id = parse_event_id(&id)?;
    let event = ctx
        .db
        .get_event(event_id)
        .await?
        .ok_or_else(|| Error::not_found("event", event_id))?;
    Ok(Json(event))
}

/// DELETE /api/events/{id}
///
/// Stored objects are removed first; the artifact records then go with the
/// event through the cascade.
pub async fn delete_event(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let event_id = parse_event_id(&id)?;
    let wiped = ctx.service.wipe_artifacts(event_id).await?;
    if !ctx.db.delete_event(event_id).await? {
        return Err(Error::not_found("event", event_id).into());
    }
    tracing::info!(%event_id, artifacts = wiped, "Event deleted");
    Ok(StatusCode::NO_CONTENT)
}
