use std::sync::Arc;

use crate::candidates::parser::ProfileParser;
use crate::config::Config;
use crate::embeddings::Embedder;
use crate::explainer::Explainer;
use crate::matching::pipeline::MatchPipeline;
use crate::store::MatchStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MatchStore>,
    pub embedder: Arc<dyn Embedder>,
    pub explainer: Arc<dyn Explainer>,
    pub profile_parser: Arc<dyn ProfileParser>,
    pub config: Config,
}

impl AppState {
    /// Pipeline over this state's collaborators. Clones only `Arc`s.
    pub fn pipeline(&self) -> MatchPipeline {
        MatchPipeline::new(
            self.store.clone(),
            self.embedder.clone(),
            self.explainer.clone(),
            self.config.matching.clone(),
        )
    }
}
