// Remote document store: per-account application documents and profiles.
//
// The hosted backend stores each account's data under its uid: an account
// record at `users/{uid}`, the profile at `users/{uid}/profile/data` and the
// application document at `users/{uid}/appData/data`. This module keeps that
// shape behind a trait so the sync layer and tests never touch the network.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;

use crate::team::model::AppData;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("remote store unavailable: {0}")]
    Unavailable(String),
    #[error("remote store denied access: {0}")]
    Forbidden(String),
}

/// Account profile document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub lastname: String,
    #[serde(default)]
    pub is_admin: bool,
}

/// Parent account record, the row the admin directory lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// One change pushed by the store's live subscription.
#[derive(Debug, Clone)]
pub enum RemoteChange {
    Updated(AppData),
    Deleted,
}

/// The hosted document store, per-account.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn fetch_app_data(&self, uid: &str) -> Result<Option<AppData>, StoreError>;
    async fn put_app_data(&self, uid: &str, data: &AppData) -> Result<(), StoreError>;
    async fn delete_app_data(&self, uid: &str) -> Result<(), StoreError>;

    async fn fetch_profile(&self, uid: &str) -> Result<Option<Profile>, StoreError>;
    async fn put_profile(&self, uid: &str, profile: &Profile) -> Result<(), StoreError>;

    async fn put_user_record(&self, uid: &str, record: &UserRecord) -> Result<(), StoreError>;
    async fn list_users(&self) -> Result<Vec<(String, UserRecord)>, StoreError>;

    /// Subscribe to live changes of one account's application document.
    /// Dropping the receiver detaches the subscription.
    fn subscribe(&self, uid: &str) -> broadcast::Receiver<RemoteChange>;
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

#[derive(Default)]
struct AccountDocs {
    record: Option<UserRecord>,
    profile: Option<Profile>,
    app_data: Option<AppData>,
}

/// In-memory `DocumentStore` for tests and the binary's offline mode.
/// `fail_reads` makes every fetch return `Unavailable`, which is how tests
/// exercise the local-only fallback.
#[derive(Default)]
pub struct MemoryStore {
    accounts: Mutex<HashMap<String, AccountDocs>>,
    senders: Mutex<HashMap<String, broadcast::Sender<RemoteChange>>>,
    fail_reads: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle read-failure injection.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    fn check_reads(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected read failure".to_string()));
        }
        Ok(())
    }

    fn sender(&self, uid: &str) -> broadcast::Sender<RemoteChange> {
        let mut senders = self.senders.lock().expect("store mutex poisoned");
        senders
            .entry(uid.to_string())
            .or_insert_with(|| broadcast::channel(16).0)
            .clone()
    }

    fn broadcast(&self, uid: &str, change: RemoteChange) {
        // No receiver attached is fine; send only fails then.
        let _ = self.sender(uid).send(change);
    }

    fn with_account<R>(&self, uid: &str, f: impl FnOnce(&mut AccountDocs) -> R) -> R {
        let mut accounts = self.accounts.lock().expect("store mutex poisoned");
        f(accounts.entry(uid.to_string()).or_default())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn fetch_app_data(&self, uid: &str) -> Result<Option<AppData>, StoreError> {
        self.check_reads()?;
        Ok(self.with_account(uid, |docs| docs.app_data.clone()))
    }

    async fn put_app_data(&self, uid: &str, data: &AppData) -> Result<(), StoreError> {
        self.with_account(uid, |docs| docs.app_data = Some(data.clone()));
        self.broadcast(uid, RemoteChange::Updated(data.clone()));
        Ok(())
    }

    async fn delete_app_data(&self, uid: &str) -> Result<(), StoreError> {
        self.with_account(uid, |docs| docs.app_data = None);
        self.broadcast(uid, RemoteChange::Deleted);
        Ok(())
    }

    async fn fetch_profile(&self, uid: &str) -> Result<Option<Profile>, StoreError> {
        self.check_reads()?;
        Ok(self.with_account(uid, |docs| docs.profile.clone()))
    }

    async fn put_profile(&self, uid: &str, profile: &Profile) -> Result<(), StoreError> {
        self.with_account(uid, |docs| docs.profile = Some(profile.clone()));
        Ok(())
    }

    async fn put_user_record(&self, uid: &str, record: &UserRecord) -> Result<(), StoreError> {
        self.with_account(uid, |docs| docs.record = Some(record.clone()));
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<(String, UserRecord)>, StoreError> {
        self.check_reads()?;
        let accounts = self.accounts.lock().expect("store mutex poisoned");
        let mut users: Vec<(String, UserRecord)> = accounts
            .iter()
            .filter_map(|(uid, docs)| docs.record.clone().map(|r| (uid.clone(), r)))
            .collect();
        users.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(users)
    }

    fn subscribe(&self, uid: &str) -> broadcast::Receiver<RemoteChange> {
        self.sender(uid).subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_fetch_round_trip() {
        let store = MemoryStore::new();
        let mut data = AppData::skeleton();
        data.add_team("A", "").unwrap();
        store.put_app_data("uid-1", &data).await.unwrap();

        let fetched = store.fetch_app_data("uid-1").await.unwrap().unwrap();
        assert_eq!(fetched.teams.len(), 1);
        assert!(store.fetch_app_data("uid-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn subscription_sees_updates_and_deletion() {
        let store = MemoryStore::new();
        let mut rx = store.subscribe("uid-1");

        let data = AppData::skeleton();
        store.put_app_data("uid-1", &data).await.unwrap();
        store.delete_app_data("uid-1").await.unwrap();

        assert!(matches!(rx.recv().await.unwrap(), RemoteChange::Updated(_)));
        assert!(matches!(rx.recv().await.unwrap(), RemoteChange::Deleted));
    }

    #[tokio::test]
    async fn subscription_is_per_account() {
        let store = MemoryStore::new();
        let mut rx = store.subscribe("uid-1");
        store.put_app_data("uid-2", &AppData::skeleton()).await.unwrap();
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn fail_reads_only_affects_fetches() {
        let store = MemoryStore::new();
        store.put_app_data("uid-1", &AppData::skeleton()).await.unwrap();
        store.set_fail_reads(true);
        assert!(store.fetch_app_data("uid-1").await.is_err());
        assert!(store.put_app_data("uid-1", &AppData::skeleton()).await.is_ok());
        store.set_fail_reads(false);
        assert!(store.fetch_app_data("uid-1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn list_users_requires_a_record() {
        let store = MemoryStore::new();
        store.put_app_data("ghost", &AppData::skeleton()).await.unwrap();
        store
            .put_user_record(
                "uid-1",
                &UserRecord { email: "a@b.fr".to_string(), created_at: Utc::now() },
            )
            .await
            .unwrap();

        let users = store.list_users().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].0, "uid-1");
        assert_eq!(users[0].1.email, "a@b.fr");
    }
}
