//! Axum router construction.
//!
//! Builds the full application router with the `/api` route group, stored
//! media under `/media`, middleware layers, and optional static UI serving.

use std::path::PathBuf;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::context::AppContext;
use crate::routes;

/// Build the complete Axum router.
pub fn build_router(ctx: AppContext, static_dir: Option<PathBuf>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Frames travel base64-encoded in JSON, well past axum's 2 MB default.
    let captures = Router::new()
        .route("/events/{id}/photos", post(routes::captures::create_photo))
        .route(
            "/events/{id}/filtered",
            post(routes::captures::create_filtered),
        )
        .route("/events/{id}/strips", post(routes::captures::create_strip))
        .route("/events/{id}/gifs", post(routes::captures::create_gif))
        .route(
            "/events/{id}/boomerangs",
            post(routes::captures::create_boomerang),
        )
        .route(
            "/events/{id}/restyle",
            post(routes::captures::create_restyle),
        )
        .layer(DefaultBodyLimit::max(ctx.config.server.max_body_bytes));

    let api = Router::new()
        // Events
        .route(
            "/events",
            get(routes::event_profiles::list_events).post(routes::event_profiles::create_event),
        )
        .route(
            "/events/{id}",
            get(routes::event_profiles::get_event).delete(routes::event_profiles::delete_event),
        )
        .merge(captures)
        // Artifacts
        .route(
            "/events/{id}/artifacts",
            get(routes::artifacts::list_artifacts).delete(routes::artifacts::wipe_artifacts),
        )
        .route("/events/{id}/archive", get(routes::export::download_archive))
        // Live updates
        .route("/events/{id}/live", get(routes::live::live_updates))
        // Styles
        .route("/styles", get(routes::styles::list_styles));

    let media = ServeDir::new(ctx.storage.root());

    let mut app = Router::new()
        .route("/health", get(routes::health::health))
        .nest("/api", api)
        .nest_service("/media", media)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx);

    // Static file serving for the booth UI build.
    if let Some(dir) = static_dir {
        if dir.exists() {
            tracing::info!("Serving static files from {:?}", dir);
            let index_path = dir.join("index.html");
            app = app.fallback_service(
                ServeDir::new(&dir)
                    .append_index_html_on_directories(true)
                    .not_found_service(ServeFile::new(index_path)),
            );
        }
    }

    app
}
