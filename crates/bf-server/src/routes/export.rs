//! Bulk ZIP export.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};

use super::parse_event_id;
use crate::context::AppContext;
use crate::error::AppError;

/// GET /api/events/{id}/archive
///
/// Errors are only possible before the headers go out. Once streaming
/// starts, failed entries are skipped inside the archive.
pub async fn download_archive(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let event_id = parse_event_id(&id)?;
    let download = ctx.service.export_archive(event_id).await?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        download.filename.replace('"', "")
    );
    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CACHE_CONTROL, "no-store".to_string()),
        ],
        Body::from_stream(download.stream),
    )
        .into_response())
}
