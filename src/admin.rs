// Administrative directory: account listing, profile edits, read-only data
// inspection. Everything is gated on the viewer's `is_admin` profile flag.

use std::sync::Arc;

use thiserror::Error;

use crate::remote::{DocumentStore, Profile, StoreError, UserRecord};
use crate::team::migrate::migrate;
use crate::team::model::AppData;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AdminError {
    #[error("Accès refusé. Vous n'êtes pas administrateur.")]
    NotAuthorized,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One row of the account listing: record plus profile when one exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSummary {
    pub uid: String,
    pub record: UserRecord,
    pub profile: Option<Profile>,
}

impl AccountSummary {
    /// "Prénom Nom" when a profile exists, otherwise the account email.
    pub fn display_name(&self) -> String {
        match &self.profile {
            Some(p) if !p.firstname.is_empty() || !p.lastname.is_empty() => {
                format!("{} {}", p.firstname, p.lastname).trim().to_string()
            }
            _ => self.record.email.clone(),
        }
    }
}

/// Admin view over the document store. Construction checks nothing; every
/// operation re-checks the viewer's profile so a revoked flag takes effect
/// immediately.
pub struct AdminDirectory {
    store: Arc<dyn DocumentStore>,
    viewer_uid: String,
}

impl AdminDirectory {
    pub fn new(store: Arc<dyn DocumentStore>, viewer_uid: impl Into<String>) -> Self {
        AdminDirectory {
            store,
            viewer_uid: viewer_uid.into(),
        }
    }

    async fn require_admin(&self) -> Result<(), AdminError> {
        let profile = self.store.fetch_profile(&self.viewer_uid).await?;
        match profile {
            Some(p) if p.is_admin => Ok(()),
            _ => Err(AdminError::NotAuthorized),
        }
    }

    /// All accounts with a record, each joined with its profile. A missing
    /// profile is not an error; the row degrades to email-only.
    pub async fn list_accounts(&self) -> Result<Vec<AccountSummary>, AdminError> {
        self.require_admin().await?;
        let mut accounts = Vec::new();
        for (uid, record) in self.store.list_users().await? {
            let profile = self.store.fetch_profile(&uid).await.unwrap_or(None);
            accounts.push(AccountSummary { uid, record, profile });
        }
        Ok(accounts)
    }

    /// Update an account's display name, preserving its admin flag.
    pub async fn update_profile(
        &self,
        uid: &str,
        firstname: &str,
        lastname: &str,
    ) -> Result<(), AdminError> {
        self.require_admin().await?;
        let mut profile = self.store.fetch_profile(uid).await?.unwrap_or_default();
        profile.firstname = firstname.trim().to_string();
        profile.lastname = lastname.trim().to_string();
        self.store.put_profile(uid, &profile).await?;
        Ok(())
    }

    /// Read-only view of an account's application document, migrated like
    /// any other loaded copy.
    pub async fn inspect_app_data(&self, uid: &str) -> Result<Option<AppData>, AdminError> {
        self.require_admin().await?;
        let data = self.store.fetch_app_data(uid).await?.map(|mut data| {
            migrate(&mut data);
            data
        });
        Ok(data)
    }
}
