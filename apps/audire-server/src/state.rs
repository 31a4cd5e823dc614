//! Application state management

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::export::{DocumentConverter, Exporter, SofficeConverter};
use crate::findings::{RefinementOrchestrator, Refiner, StubRefiner};
use crate::prompts::{load_prompts, PromptSet};
use crate::storage::DocumentStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    store: DocumentStore,
    orchestrator: RefinementOrchestrator,
    exporter: Exporter,
    prompts: PromptSet,
}

impl AppState {
    /// Build the state from configuration with the default collaborators
    ///
    /// Prompts are read from disk here, once.
    pub fn new(config: Config) -> Self {
        let refiner = Arc::new(StubRefiner::new(config.refine_latency()));
        let converter = Arc::new(SofficeConverter::new(
            config.export.soffice_path.clone(),
            config.conversion_timeout(),
        ));
        let prompts = load_prompts(&config.prompts.dir);
        Self::with_parts(config, refiner, converter, prompts)
    }

    /// Build the state with injected refinement and conversion capabilities
    pub fn with_parts(
        config: Config,
        refiner: Arc<dyn Refiner>,
        converter: Arc<dyn DocumentConverter>,
        prompts: PromptSet,
    ) -> Self {
        // Per-item refinement budget
        let item_timeout = config.refine_latency() * 4 + Duration::from_secs(30);
        let orchestrator = RefinementOrchestrator::new(refiner, config.processing.failure_policy)
            .with_item_timeout(item_timeout);
        let exporter = Exporter::new(
            config.export.export_dir.clone(),
            config.export.public_base_url.clone(),
            converter,
            config.extraction_timeout(),
        );

        Self {
            inner: Arc::new(AppStateInner {
                store: DocumentStore::new(config.storage.temp_dir.clone()),
                orchestrator,
                exporter,
                prompts,
                config,
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the upload store
    pub fn store(&self) -> &DocumentStore {
        &self.inner.store
    }

    /// Get the refinement orchestrator
    pub fn orchestrator(&self) -> &RefinementOrchestrator {
        &self.inner.orchestrator
    }

    /// Get the exporter
    pub fn exporter(&self) -> &Exporter {
        &self.inner.exporter
    }

    /// Get the prompts loaded at startup
    pub fn prompts(&self) -> &PromptSet {
        &self.inner.prompts
    }
}
