//! Application state shared across handlers.

use std::sync::Arc;

use crate::engine::GenerationEngine;
use crate::models::ModelRegistry;
use crate::ws::ConnectionHub;

/// One hub per broadcast domain, one engine and registry per process. Passed
/// explicitly to every handler that needs it; there is no global.
#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<ConnectionHub>,
    pub models: Arc<ModelRegistry>,
    pub engine: Arc<dyn GenerationEngine>,
}

impl AppState {
    pub fn new(models: Arc<ModelRegistry>, engine: Arc<dyn GenerationEngine>) -> Self {
        Self {
            hub: Arc::new(ConnectionHub::new()),
            models,
            engine,
        }
    }
}
