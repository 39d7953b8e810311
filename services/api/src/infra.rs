use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use study_match::config::MatchingConfig;
use study_match::matching::{MatchingService, MemoryStore};

pub(crate) type InMemoryMatchingService = MatchingService<MemoryStore, MemoryStore, MemoryStore>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Matching service over a single process-local store shared by all three collections.
pub(crate) fn in_memory_service(config: MatchingConfig) -> Arc<InMemoryMatchingService> {
    let store = Arc::new(MemoryStore::default());
    Arc::new(MatchingService::new(store.clone(), store.clone(), store, config))
}
