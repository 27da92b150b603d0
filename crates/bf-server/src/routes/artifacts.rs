//! Artifact listing and wipe.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use bf_core::Artifact;

use super::parse_event_id;
use crate::context::AppContext;
use crate::error::AppError;

#[derive(Debug, Serialize)]
pub struct WipeResponse {
    pub deleted: usize,
}

/// GET /api/events/{id}/artifacts
pub async fn list_artifacts(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Artifact>>, AppError> {
    let event_id = parse_event_id(&id)?;
    Ok(Json(ctx.service.list_artifacts(event_id).await?))
}

/// DELETE /api/events/{id}/artifacts
pub async fn wipe_artifacts(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Json<WipeResponse>, AppError> {
    let event_id = parse_event_id(&id)?;
    let deleted = ctx.service.wipe_artifacts(event_id).await?;
    Ok(Json(WipeResponse { deleted }))
}
