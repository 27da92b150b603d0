//! Application context shared across route handlers.
//!
//! [`AppContext`] is cheap to clone: everything it holds is immutable after
//! startup and wrapped in `Arc`s. The style catalog is built once from the
//! builtin presets plus any configured overrides.

use std::sync::Arc;

use bf_av::{Compositor, StripComposer, TextRenderer, ToolRegistry};
use bf_core::config::Config;
use bf_core::events::EventBus;
use bf_core::storage::LocalStorage;
use bf_core::{Result, StyleCatalog};
use bf_db::SqliteStore;
use bf_export::{ArchiveStreamer, Fetch, RemoteFetcher};
use bf_restyle::{Clock, ImageModel, InferenceClient, RestyleGateway, TokioClock};

use crate::service::{ArtifactService, Collaborators, Engines};

#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub db: SqliteStore,
    pub storage: Arc<LocalStorage>,
    pub event_bus: Arc<EventBus>,
    pub tools: Arc<ToolRegistry>,
    pub styles: Arc<StyleCatalog>,
    pub service: Arc<ArtifactService>,
}

impl AppContext {
    /// Build the production context: HTTP model client, real clock, and the
    /// validating remote fetcher.
    pub fn new(config: Config, db: SqliteStore, tools: ToolRegistry) -> Result<Self> {
        let model: Arc<dyn ImageModel> = Arc::new(InferenceClient::new(&config.restyle)?);
        let fetcher: Arc<dyn Fetch> = Arc::new(RemoteFetcher::new(&config.fetch)?);
        Ok(Self::with_collaborators(
            config,
            db,
            tools,
            model,
            Arc::new(TokioClock),
            fetcher,
        ))
    }

    /// Build a context around explicit model, clock, and fetcher
    /// implementations.
    pub fn with_collaborators(
        config: Config,
        db: SqliteStore,
        tools: ToolRegistry,
        model: Arc<dyn ImageModel>,
        clock: Arc<dyn Clock>,
        fetcher: Arc<dyn Fetch>,
    ) -> Self {
        let storage = Arc::new(LocalStorage::new(
            &config.server.media_dir,
            config.server.public_base_url.clone(),
        ));
        let event_bus = Arc::new(EventBus::default());
        let tools = Arc::new(tools);
        let styles = Arc::new(StyleCatalog::with_overrides(&config.restyle.styles));

        let text = TextRenderer::new();
        let engines = Engines {
            compositor: Compositor::new(config.compositor.clone(), text.clone()),
            strips: StripComposer::new(config.compositor.clone(), text),
            tools: Arc::clone(&tools),
            sequence: config.sequence.clone(),
            restyle: RestyleGateway::new(
                &config.restyle,
                Arc::clone(&styles),
                model,
                clock,
                event_bus.clone(),
            ),
            archive: ArchiveStreamer::new(Arc::clone(&fetcher), &config.export),
            logos: fetcher,
        };

        let ports = Collaborators {
            events: Arc::new(db.clone()),
            artifacts: Arc::new(db.clone()),
            storage: storage.clone(),
            live: event_bus.clone(),
        };

        Self {
            config: Arc::new(config),
            db,
            storage,
            event_bus,
            tools,
            styles,
            service: Arc::new(ArtifactService::new(ports, engines)),
        }
    }
}
