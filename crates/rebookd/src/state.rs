//! Shared handler state

use rebook_config::RescheduleSettings;
use rebook_core::{Projector, RescheduleEngine};
use rebook_store::Store;
use std::sync::Arc;

/// Cloned into every handler; all fields are shared handles
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RescheduleEngine>,
    pub projector: Arc<Projector>,
    pub store: Arc<dyn Store>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, settings: RescheduleSettings) -> Self {
        Self {
            engine: Arc::new(RescheduleEngine::new(store.clone(), settings)),
            projector: Arc::new(Projector::new(store.clone())),
            store,
        }
    }
}
