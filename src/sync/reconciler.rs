// Sign-in reconciliation between the cached and the remote document.
//
// The decision table, remote-wins on conflict:
//
//   remote | local  | same bytes | action
//   -------+--------+------------+----------------------------------------
//   yes    | yes    | no         | adopt remote into memory and the cache
//   yes    | no     | -          | adopt remote into memory and the cache
//   yes    | yes    | yes        | adopt remote, no re-render due
//   no     | yes    | -          | push current document
//   no     | no     | -          | push current (skeleton) document
//
// Byte comparison uses the canonical serialization on both sides, so it is
// sensitive to formatting but never to map ordering.

use tracing::{info, warn};

use crate::db::LocalCache;
use crate::remote::{DocumentStore, StoreError};
use crate::team::migrate::migrate;
use crate::team::model::{to_canonical_json, AppData};

/// Outcome of a sign-in reconciliation.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    /// The document the session should hold from now on.
    pub data: AppData,
    /// Whether the remote copy replaced what the session had, in which case
    /// a re-render is due.
    pub pulled_remote: bool,
}

/// Reconcile `current` (the session's in-memory document) against the remote
/// copy for `uid`. A remote fetch failure propagates so the caller can fall
/// back to local-only mode.
pub async fn reconcile(
    current: &AppData,
    cache: &LocalCache,
    store: &dyn DocumentStore,
    uid: &str,
) -> Result<Reconciliation, StoreError> {
    let remote = store.fetch_app_data(uid).await?;

    match remote {
        Some(mut remote_data) => {
            let remote_json = to_canonical_json(&remote_data).map_err(|err| {
                StoreError::Unavailable(format!("remote document unparsable: {err}"))
            })?;
            let local_json = match cache.raw_document() {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "failed to read cached document during reconciliation");
                    None
                }
            };

            let pulled_remote = match local_json {
                Some(local) if local == remote_json => {
                    info!("remote and local documents identical, adopting remote");
                    false
                }
                Some(_) => {
                    info!("document conflict, remote copy wins");
                    true
                }
                None => {
                    info!("no local document, pulling remote copy");
                    true
                }
            };

            migrate(&mut remote_data);
            if pulled_remote {
                // The adopted copy must survive a crash or sign-out, so the
                // cache is brought up to date here, not on the next save.
                if let Err(err) = cache.save_document(&remote_data) {
                    warn!(error = %err, "failed to cache the adopted remote document");
                }
            }
            Ok(Reconciliation { data: remote_data, pulled_remote })
        }
        None => {
            // First sign-in from this account, or a fresh device and empty
            // account: the session's document becomes the remote copy.
            info!("no remote document, pushing current document");
            if let Err(err) = store.put_app_data(uid, current).await {
                warn!(uid, error = %err, "failed to push document during reconciliation");
            }
            Ok(Reconciliation { data: current.clone(), pulled_remote: false })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemoryStore;
    use crate::team::model::documents_equal;

    fn cache() -> LocalCache {
        LocalCache::open(":memory:").unwrap()
    }

    fn doc(team_name: &str) -> AppData {
        let mut data = AppData::skeleton();
        data.add_team(team_name, "2025-2026").unwrap();
        data
    }

    #[tokio::test]
    async fn local_work_is_pushed_when_remote_is_empty() {
        let cache = cache();
        let store = MemoryStore::new();
        let local = doc("Les Aigles");
        cache.save_document(&local).unwrap();

        let outcome = reconcile(&local, &cache, &store, "uid-1").await.unwrap();

        assert!(!outcome.pulled_remote);
        assert!(documents_equal(&outcome.data, &local));
        let pushed = store.fetch_app_data("uid-1").await.unwrap().unwrap();
        assert!(documents_equal(&pushed, &local));
    }

    #[tokio::test]
    async fn remote_copy_is_pulled_onto_a_fresh_device() {
        let cache = cache();
        let store = MemoryStore::new();
        let remote = doc("VC Annecy");
        store.put_app_data("uid-1", &remote).await.unwrap();

        let outcome = reconcile(&AppData::skeleton(), &cache, &store, "uid-1")
            .await
            .unwrap();

        assert!(outcome.pulled_remote);
        assert!(documents_equal(&outcome.data, &remote));
        // The cache holds the adopted copy too, not just memory.
        assert!(documents_equal(&cache.load_document(), &remote));
    }

    #[tokio::test]
    async fn conflict_resolves_in_favor_of_remote() {
        let cache = cache();
        let store = MemoryStore::new();
        let local = doc("Local Worked Here");
        cache.save_document(&local).unwrap();
        let remote = doc("Remote Wins");
        store.put_app_data("uid-1", &remote).await.unwrap();

        let outcome = reconcile(&local, &cache, &store, "uid-1").await.unwrap();

        assert!(outcome.pulled_remote);
        assert_eq!(outcome.data.teams[0].name, "Remote Wins");
        // The losing local work was not pushed over the remote copy, and the
        // cache was overwritten with the winner.
        let kept = store.fetch_app_data("uid-1").await.unwrap().unwrap();
        assert_eq!(kept.teams[0].name, "Remote Wins");
        assert_eq!(cache.load_document().teams[0].name, "Remote Wins");
    }

    #[tokio::test]
    async fn identical_copies_need_no_rerender() {
        let cache = cache();
        let store = MemoryStore::new();
        let data = doc("Les Aigles");
        cache.save_document(&data).unwrap();
        store.put_app_data("uid-1", &data).await.unwrap();

        let outcome = reconcile(&data, &cache, &store, "uid-1").await.unwrap();

        assert!(!outcome.pulled_remote);
        assert!(documents_equal(&outcome.data, &data));
    }

    #[tokio::test]
    async fn fetch_failure_propagates() {
        let cache = cache();
        let store = MemoryStore::new();
        store.set_fail_reads(true);
        let result = reconcile(&AppData::skeleton(), &cache, &store, "uid-1").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn adopted_remote_document_is_migrated() {
        let cache = cache();
        let store = MemoryStore::new();
        let mut remote = doc("Les Aigles");
        remote.current_team_id = Some(424242);
        store.put_app_data("uid-1", &remote).await.unwrap();

        let outcome = reconcile(&AppData::skeleton(), &cache, &store, "uid-1")
            .await
            .unwrap();
        assert_eq!(
            outcome.data.current_team_id,
            Some(outcome.data.teams[0].id)
        );
    }
}
