//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which builds a full [`AppContext`] over an
//! in-memory database, a temporary media directory, a scripted image model,
//! and a manual clock, then serves the router on a random port. The real
//! [`RemoteFetcher`] is used so exports fetch artifacts over HTTP from the
//! harness itself.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::Bytes;
use tempfile::TempDir;

use bf_av::ToolRegistry;
use bf_core::config::Config;
use bf_core::{BrandingSpec, EventId};
use bf_db::SqliteStore;
use bf_export::RemoteFetcher;
use bf_restyle::{ImageModel, ManualClock, ModelReply};
use bf_server::context::AppContext;
use bf_server::router::build_router;

/// Image model that plays back a fixed script of replies.
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<ModelReply>>,
    calls: AtomicU32,
}

impl ScriptedModel {
    pub fn new(replies: Vec<ModelReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageModel for ScriptedModel {
    async fn generate(&self, _model: &str, _prompt: &str, _negative: &str, _image: Bytes) -> ModelReply {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ModelReply::Failed {
                status: None,
                message: "script exhausted".into(),
            })
    }
}

/// Test harness wrapping a running server.
pub struct TestHarness {
    pub ctx: AppContext,
    pub addr: SocketAddr,
    pub model: Arc<ScriptedModel>,
    pub clock: Arc<ManualClock>,
    pub media: TempDir,
}

impl TestHarness {
    /// Start a server whose model always fails.
    pub async fn start() -> Self {
        Self::start_with(Vec::new(), |_| {}).await
    }

    /// Start a server with a scripted model and a config hook.
    pub async fn start_with(replies: Vec<ModelReply>, configure: impl FnOnce(&mut Config)) -> Self {
        // Bind first: the public media URL needs the port.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        let media = tempfile::tempdir().expect("failed to create media dir");
        let mut config = Config::default();
        config.server.media_dir = media.path().to_path_buf();
        config.server.public_base_url = format!("http://{addr}/media");
        configure(&mut config);

        let db = SqliteStore::in_memory().expect("failed to create in-memory store");
        let tools = ToolRegistry::discover(&config.tools);
        let model = Arc::new(ScriptedModel::new(replies));
        let clock = Arc::new(ManualClock::new());
        let fetcher = Arc::new(RemoteFetcher::new(&config.fetch).expect("fetcher"));

        let ctx = AppContext::with_collaborators(
            config,
            db,
            tools,
            model.clone(),
            clock.clone(),
            fetcher,
        );
        let app = build_router(ctx.clone(), None);

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            ctx,
            addr,
            model,
            clock,
            media,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Create an event directly in the store.
    pub async fn create_event(&self, name: &str, branding: BrandingSpec) -> EventId {
        let slug = name.to_lowercase().replace(' ', "-");
        self.ctx
            .db
            .create_event(name.into(), slug, branding, serde_json::json!({}))
            .await
            .expect("failed to create event")
            .id
    }

    pub fn has_ffmpeg(&self) -> bool {
        self.ctx.tools.require("ffmpeg").is_ok()
    }

    /// POST a capture body and return the response.
    pub async fn post_json(&self, path: &str, body: serde_json::Value) -> reqwest::Response {
        reqwest::Client::new()
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .expect("request failed")
    }
}

/// Encoded image of a solid colour.
pub fn image_bytes(width: u32, height: u32, color: [u8; 3], format: image::ImageFormat) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb(color));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, format).expect("encode test image");
    out.into_inner()
}

/// A PNG frame as a `data:` URL, the way the booth UI posts it.
pub fn png_data_url(width: u32, height: u32, color: [u8; 3]) -> String {
    let png = image_bytes(width, height, color, image::ImageFormat::Png);
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}
