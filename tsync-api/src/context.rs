//! Application context
//!
//! Everything the sync layer needs is passed in explicitly through one
//! `AppContext`: the content store, the capability check, the lifecycle
//! observer and the site URL used to build canonical links.

use std::sync::Arc;
use tracing::info;

use crate::auth::CapabilityCheck;
use crate::model::EntityRef;
use crate::store::ContentStore;

/// Receives notifications after successful writes
///
/// Both hooks default to doing nothing.
pub trait SyncObserver: Send + Sync {
    fn on_entity_saved(&self, _entity: &EntityRef, _external_id: &str, _created: bool) {}

    fn on_entity_deleted(&self, _external_id: &str) {}
}

/// Observer that records lifecycle events in the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl SyncObserver for LoggingObserver {
    fn on_entity_saved(&self, entity: &EntityRef, external_id: &str, created: bool) {
        info!(
            "{} transcription {} as entity {} ({})",
            if created { "Created" } else { "Updated" },
            external_id,
            entity.id,
            entity.url
        );
    }

    fn on_entity_deleted(&self, external_id: &str) {
        info!("Deleted transcription {}", external_id);
    }
}

/// Shared handles for the identity index, upsert engine and endpoint
#[derive(Clone)]
pub struct AppContext {
    pub store: Arc<dyn ContentStore>,
    pub capability: Arc<dyn CapabilityCheck>,
    pub observer: Arc<dyn SyncObserver>,
    /// Site URL without a trailing slash
    pub site_base: String,
}

impl AppContext {
    /// Create a context with the logging observer
    pub fn new(
        store: Arc<dyn ContentStore>,
        capability: Arc<dyn CapabilityCheck>,
        site_base: impl Into<String>,
    ) -> Self {
        let site_base = site_base.into().trim_end_matches('/').to_string();
        Self {
            store,
            capability,
            observer: Arc::new(LoggingObserver),
            site_base,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn SyncObserver>) -> Self {
        self.observer = observer;
        self
    }
}
