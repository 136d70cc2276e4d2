use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::LanguageModel;
use crate::store::CsvStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub store: CsvStore,
    /// `LlmClient` in production; a scripted model in router tests.
    pub llm: Arc<dyn LanguageModel>,
    pub config: Config,
}
