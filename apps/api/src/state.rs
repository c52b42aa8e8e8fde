use std::sync::Arc;

use crate::interview::Engine;
use crate::llm_client::ModelBackend;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// The one live interview for this process.
    pub engine: Arc<Engine>,
    /// Same backend the engine uses; the peer helper calls it directly.
    pub llm: Arc<dyn ModelBackend>,
}
