use std::sync::Arc;

use crate::assessments::orchestrator::SuggestionOrchestrator;
use crate::assessments::store::AssessmentStore;
use crate::config::Config;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub suggestions: Arc<SuggestionOrchestrator>,
    /// Same store the orchestrator writes to; read directly by the dashboard endpoints.
    pub store: Arc<dyn AssessmentStore>,
}
