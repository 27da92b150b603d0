//! Capture endpoints: every route turns posted frames into one artifact.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use bf_av::intake::frames_from_payloads;
use bf_av::{Frame, PhotoFilter};
use bf_core::{Artifact, ArtifactKind, Error, EventId, SessionId, StyleChoice};
use tokio_util::sync::CancellationToken;

use super::parse_event_id;
use crate::context::AppContext;
use crate::error::AppError;

/// Upper bound on frames accepted by one request.
pub const MAX_FRAMES_PER_REQUEST: usize = 60;

/// Body shared by every capture endpoint.
///
/// Single-frame endpoints read `frame` (or the first of `frames`);
/// multi-frame endpoints read `frames`.
#[derive(Debug, Default, Deserialize)]
pub struct CaptureRequest {
    #[serde(default)]
    pub frame: Option<String>,
    #[serde(default)]
    pub frames: Vec<String>,
    #[serde(default)]
    pub session_id: Option<SessionId>,
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
}

impl CaptureRequest {
    fn single_frame(&self) -> Result<Frame, Error> {
        let payload = self
            .frame
            .as_deref()
            .or_else(|| self.frames.first().map(String::as_str))
            .ok_or_else(|| Error::Validation("frame is required".into()))?;
        Frame::from_payload(0, payload)
    }

    fn all_frames(&self) -> Result<Vec<Frame>, Error> {
        if self.frames.len() > MAX_FRAMES_PER_REQUEST {
            return Err(Error::Validation(format!(
                "too many frames: {} (max {MAX_FRAMES_PER_REQUEST})",
                self.frames.len()
            )));
        }
        if self.frames.is_empty() {
            if let Some(frame) = &self.frame {
                return Ok(vec![Frame::from_payload(0, frame)?]);
            }
        }
        frames_from_payloads(&self.frames)
    }
}

type Created = (StatusCode, Json<Artifact>);

fn created(artifact: Artifact) -> Created {
    (StatusCode::CREATED, Json(artifact))
}

/// POST /api/events/{id}/photos
pub async fn create_photo(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    Json(req): Json<CaptureRequest>,
) -> Result<Created, AppError> {
    let event_id = parse_event_id(&id)?;
    let frame = req.single_frame()?;
    let artifact = ctx
        .service
        .encode_single(frame, event_id, req.session_id)
        .await?;
    Ok(created(artifact))
}

/// POST /api/events/{id}/filtered
pub async fn create_filtered(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    Json(req): Json<CaptureRequest>,
) -> Result<Created, AppError> {
    let event_id = parse_event_id(&id)?;
    let filter: PhotoFilter = req
        .filter
        .as_deref()
        .ok_or_else(|| Error::Validation("filter is required".into()))?
        .parse()?;
    let frame = req.single_frame()?;
    let artifact = ctx
        .service
        .encode_filtered(frame, filter, event_id, req.session_id)
        .await?;
    Ok(created(artifact))
}

/// POST /api/events/{id}/strips
pub async fn create_strip(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    Json(req): Json<CaptureRequest>,
) -> Result<Created, AppError> {
    let event_id = parse_event_id(&id)?;
    let frames = req.all_frames()?;
    let artifact = ctx
        .service
        .encode_strip(frames, event_id, req.session_id)
        .await?;
    Ok(created(artifact))
}

/// POST /api/events/{id}/gifs
pub async fn create_gif(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    Json(req): Json<CaptureRequest>,
) -> Result<Created, AppError> {
    sequence(ctx, &id, req, ArtifactKind::Gif).await
}

/// POST /api/events/{id}/boomerangs
pub async fn create_boomerang(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    Json(req): Json<CaptureRequest>,
) -> Result<Created, AppError> {
    sequence(ctx, &id, req, ArtifactKind::Boomerang).await
}

async fn sequence(
    ctx: AppContext,
    id: &str,
    req: CaptureRequest,
    kind: ArtifactKind,
) -> Result<Created, AppError> {
    let event_id = parse_event_id(id)?;
    let frames = req.all_frames()?;
    let artifact = ctx
        .service
        .encode_sequence(frames, event_id, kind, req.session_id)
        .await?;
    Ok(created(artifact))
}

/// POST /api/events/{id}/restyle
///
/// The request owns a cancellation token; if the client disconnects the
/// handler future is dropped, the guard fires, and any pending wait on a
/// loading model ends early.
pub async fn create_restyle(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    Json(req): Json<CaptureRequest>,
) -> Result<Created, AppError> {
    let event_id: EventId = parse_event_id(&id)?;
    let choice: StyleChoice = req
        .style
        .as_deref()
        .ok_or_else(|| Error::Validation("style is required".into()))?
        .parse()?;
    let frame = req.single_frame()?;

    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();
    let artifact = ctx
        .service
        .restyle(frame, &choice, event_id, req.session_id, &cancel)
        .await?;
    Ok(created(artifact))
}
