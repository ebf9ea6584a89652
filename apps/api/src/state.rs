use std::sync::Arc;

use crate::config::Config;
use crate::refinement::WorkflowEngine;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// One engine serves every request; each `run()` owns its own state.
    pub engine: Arc<WorkflowEngine>,
    pub config: Config,
}
