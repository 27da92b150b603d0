//! Style catalog listing.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::context::AppContext;

/// Public view of a preset; prompts stay server-side.
#[derive(Debug, Serialize)]
pub struct StyleResponse {
    pub key: String,
    pub name: String,
}

/// GET /api/styles
pub async fn list_styles(State(ctx): State<AppContext>) -> Json<Vec<StyleResponse>> {
    Json(
        ctx.styles
            .all()
            .into_iter()
            .map(|s| StyleResponse {
                key: s.key.clone(),
                name: s.name.clone(),
            })
            .collect(),
    )
}
