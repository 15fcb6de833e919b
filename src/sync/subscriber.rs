// Application of live snapshots pushed by the remote store.
//
// A snapshot can arrive after the user signed out or switched accounts; the
// identity guards drop those instead of resurrecting stale data.

use tracing::{info, warn};

use crate::db::LocalCache;
use crate::remote::RemoteChange;
use crate::team::migrate::migrate;
use crate::team::model::{documents_equal, AppData};

/// What a delivered snapshot did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOutcome {
    /// No identity, or the snapshot belongs to another account. Dropped.
    Stale,
    /// The incoming document matches what the session already holds.
    Unchanged,
    /// The document was replaced; a re-render is due.
    Replaced,
    /// The remote copy was deleted; memory and cache were reset.
    Reset,
}

/// Apply one remote change to the session's document and the local cache.
/// `active_uid` is the currently signed-in account (None when signed out),
/// `subscribed_uid` the account the subscription was opened for.
pub fn apply_remote_change(
    data: &mut AppData,
    cache: &LocalCache,
    change: RemoteChange,
    active_uid: Option<&str>,
    subscribed_uid: &str,
) -> SnapshotOutcome {
    let Some(active) = active_uid else {
        info!("snapshot received while signed out, ignoring");
        return SnapshotOutcome::Stale;
    };
    if active != subscribed_uid {
        info!(active, subscribed = subscribed_uid, "snapshot for previous account, ignoring");
        return SnapshotOutcome::Stale;
    }

    match change {
        RemoteChange::Updated(incoming) => {
            if documents_equal(data, &incoming) {
                return SnapshotOutcome::Unchanged;
            }
            let mut incoming = incoming;
            migrate(&mut incoming);
            *data = incoming;
            if let Err(err) = cache.save_document(data) {
                warn!(error = %err, "failed to cache remotely updated document");
            }
            SnapshotOutcome::Replaced
        }
        RemoteChange::Deleted => {
            warn!("remote document deleted externally, resetting local data");
            *data = AppData::skeleton();
            if let Err(err) = cache.clear_document() {
                warn!(error = %err, "failed to clear cached document");
            }
            SnapshotOutcome::Reset
        }
    }
}
