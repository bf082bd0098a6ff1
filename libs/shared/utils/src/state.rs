use std::sync::Arc;

use shared_config::AppConfig;
use shared_storage::{DocumentStore, RestDocumentStore};

/// Shared application state threaded through all routers. The engine itself
/// is stateless between calls; this only carries configuration and the
/// storage handle.
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn DocumentStore>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn DocumentStore>) -> Arc<Self> {
        Arc::new(Self { config, store })
    }

    pub fn from_env() -> Arc<Self> {
        let config = AppConfig::from_env();
        let store = Arc::new(RestDocumentStore::new(&config));
        Self::new(config, store)
    }
}
