// Dual-write persistence: local cache always, remote store when signed in.

use std::sync::Arc;

use tracing::warn;

use crate::auth::Identity;
use crate::db::LocalCache;
use crate::remote::DocumentStore;
use crate::team::model::AppData;

/// Writes the document to both persistence targets. Neither failure is
/// surfaced to the caller: losing one copy must never interrupt the coach
/// mid-match, and the next successful save repairs it.
pub struct PersistenceGateway {
    cache: Arc<LocalCache>,
    store: Arc<dyn DocumentStore>,
}

impl PersistenceGateway {
    pub fn new(cache: Arc<LocalCache>, store: Arc<dyn DocumentStore>) -> Self {
        PersistenceGateway { cache, store }
    }

    pub fn cache(&self) -> &LocalCache {
        &self.cache
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Save locally, then remotely when an identity is active.
    pub async fn save(&self, data: &AppData, identity: Option<&Identity>) {
        if let Err(err) = self.cache.save_document(data) {
            warn!(error = %err, "failed to save document to local cache");
        }
        if let Some(identity) = identity {
            if let Err(err) = self.store.put_app_data(&identity.uid, data).await {
                warn!(uid = %identity.uid, error = %err, "failed to save document to remote store");
            }
        }
    }

    /// Load from the local cache; never fails.
    pub fn load(&self) -> AppData {
        self.cache.load_document()
    }
}
