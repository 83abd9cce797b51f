use crate::config::Config;
use crate::extraction::engine::Extractor;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Holds the process-wide segmenter, loaded once at startup.
    pub extractor: Extractor,
}
