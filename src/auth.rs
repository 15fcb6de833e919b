// Identity provider seam and account registration.
//
// Error codes mirror the hosted provider's vocabulary; `user_message` gives
// the French text shown to the user.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tracing::warn;

use crate::remote::{DocumentStore, Profile, UserRecord};

/// A signed-in account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub uid: String,
    pub email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorCode {
    InvalidEmail,
    UserDisabled,
    UserNotFound,
    WrongPassword,
    EmailAlreadyInUse,
    WeakPassword,
    OperationNotAllowed,
    NetworkRequestFailed,
    Other,
}

/// Provider failure, displayed to the user in French.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", self.user_message())]
pub struct AuthError {
    pub code: AuthErrorCode,
    /// Raw provider text, shown verbatim for unmapped codes.
    pub detail: Option<String>,
}

impl AuthError {
    pub fn new(code: AuthErrorCode) -> Self {
        AuthError { code, detail: None }
    }

    pub fn other(detail: impl Into<String>) -> Self {
        AuthError {
            code: AuthErrorCode::Other,
            detail: Some(detail.into()),
        }
    }

    pub fn user_message(&self) -> String {
        match self.code {
            AuthErrorCode::InvalidEmail => "L'adresse email n'est pas valide.".to_string(),
            AuthErrorCode::UserDisabled => {
                "Ce compte utilisateur a été désactivé.".to_string()
            }
            AuthErrorCode::UserNotFound => "Aucun compte trouvé pour cet email.".to_string(),
            AuthErrorCode::WrongPassword => "Mot de passe incorrect.".to_string(),
            AuthErrorCode::EmailAlreadyInUse => {
                "Cette adresse email est déjà utilisée par un autre compte.".to_string()
            }
            AuthErrorCode::WeakPassword => {
                "Le mot de passe est trop faible (minimum 6 caractères).".to_string()
            }
            AuthErrorCode::OperationNotAllowed => {
                "La connexion par email/mot de passe n'est pas activée.".to_string()
            }
            AuthErrorCode::NetworkRequestFailed => {
                "Erreur réseau. Vérifiez votre connexion internet.".to_string()
            }
            AuthErrorCode::Other => self
                .detail
                .clone()
                .unwrap_or_else(|| "Erreur d'authentification inconnue.".to_string()),
        }
    }
}

/// The hosted identity provider.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AuthError>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError>;
    async fn sign_out(&self) -> Result<(), AuthError>;
    async fn send_password_reset(&self, email: &str) -> Result<(), AuthError>;
}

/// Validation or provider failure during account registration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignUpError {
    #[error("Veuillez entrer votre prénom et votre nom.")]
    MissingName,
    #[error("Veuillez entrer un email et un mot de passe.")]
    MissingCredentials,
    #[error("Erreur d'inscription : {0}")]
    Provider(AuthError),
}

/// Create the account, then write the account record and profile documents.
///
/// The record makes the account visible to the admin directory and the
/// profile holds the display name. Either write may fail after the account
/// exists; registration still succeeds, degraded to email-only display.
pub async fn register_user(
    provider: &dyn AuthProvider,
    store: &dyn DocumentStore,
    email: &str,
    password: &str,
    firstname: &str,
    lastname: &str,
) -> Result<Identity, SignUpError> {
    let email = email.trim();
    let password = password.trim();
    let firstname = firstname.trim();
    let lastname = lastname.trim();

    if firstname.is_empty() || lastname.is_empty() {
        return Err(SignUpError::MissingName);
    }
    if email.is_empty() || password.is_empty() {
        return Err(SignUpError::MissingCredentials);
    }

    let identity = provider
        .sign_up(email, password)
        .await
        .map_err(SignUpError::Provider)?;

    let record = UserRecord {
        email: email.to_string(),
        created_at: Utc::now(),
    };
    if let Err(err) = store.put_user_record(&identity.uid, &record).await {
        warn!(uid = %identity.uid, error = %err, "failed to create account record");
    }

    let profile = Profile {
        firstname: firstname.to_string(),
        lastname: lastname.to_string(),
        is_admin: false,
    };
    if let Err(err) = store.put_profile(&identity.uid, &profile).await {
        warn!(uid = %identity.uid, error = %err, "failed to create account profile");
    }

    Ok(identity)
}

// ---------------------------------------------------------------------------
// In-memory provider
// ---------------------------------------------------------------------------

struct MemoryAccount {
    uid: String,
    password: String,
    disabled: bool,
}

/// In-memory `AuthProvider` for tests and offline use. Applies the same
/// surface rules as the hosted provider: six-character password minimum,
/// unique emails, an `@` in the address.
#[derive(Default)]
pub struct MemoryAuthProvider {
    accounts: Mutex<HashMap<String, MemoryAccount>>,
}

impl MemoryAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable an account, as a hosted admin console could.
    pub fn disable(&self, email: &str) {
        let mut accounts = self.accounts.lock().expect("auth mutex poisoned");
        if let Some(account) = accounts.get_mut(email) {
            account.disabled = true;
        }
    }
}

#[async_trait]
impl AuthProvider for MemoryAuthProvider {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        if !email.contains('@') {
            return Err(AuthError::new(AuthErrorCode::InvalidEmail));
        }
        if password.len() < 6 {
            return Err(AuthError::new(AuthErrorCode::WeakPassword));
        }
        let mut accounts = self.accounts.lock().expect("auth mutex poisoned");
        if accounts.contains_key(email) {
            return Err(AuthError::new(AuthErrorCode::EmailAlreadyInUse));
        }
        let uid = format!("uid-{}", accounts.len() + 1);
        accounts.insert(
            email.to_string(),
            MemoryAccount {
                uid: uid.clone(),
                password: password.to_string(),
                disabled: false,
            },
        );
        Ok(Identity { uid, email: email.to_string() })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let accounts = self.accounts.lock().expect("auth mutex poisoned");
        let account = accounts
            .get(email)
            .ok_or_else(|| AuthError::new(AuthErrorCode::UserNotFound))?;
        if account.disabled {
            return Err(AuthError::new(AuthErrorCode::UserDisabled));
        }
        if account.password != password {
            return Err(AuthError::new(AuthErrorCode::WrongPassword));
        }
        Ok(Identity {
            uid: account.uid.clone(),
            email: email.to_string(),
        })
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        Ok(())
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), AuthError> {
        let accounts = self.accounts.lock().expect("auth mutex poisoned");
        if !accounts.contains_key(email) {
            return Err(AuthError::new(AuthErrorCode::UserNotFound));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemoryStore;

    #[tokio::test]
    async fn sign_up_then_sign_in() {
        let provider = MemoryAuthProvider::new();
        let id = provider.sign_up("coach@club.fr", "secret1").await.unwrap();
        let again = provider.sign_in("coach@club.fr", "secret1").await.unwrap();
        assert_eq!(id, again);
    }

    #[tokio::test]
    async fn provider_rules_map_to_codes() {
        let provider = MemoryAuthProvider::new();
        assert_eq!(
            provider.sign_up("not-an-email", "secret1").await.unwrap_err().code,
            AuthErrorCode::InvalidEmail
        );
        assert_eq!(
            provider.sign_up("a@b.fr", "12345").await.unwrap_err().code,
            AuthErrorCode::WeakPassword
        );
        provider.sign_up("a@b.fr", "123456").await.unwrap();
        assert_eq!(
            provider.sign_up("a@b.fr", "abcdef").await.unwrap_err().code,
            AuthErrorCode::EmailAlreadyInUse
        );
        assert_eq!(
            provider.sign_in("a@b.fr", "wrong!").await.unwrap_err().code,
            AuthErrorCode::WrongPassword
        );
        assert_eq!(
            provider.sign_in("ghost@b.fr", "123456").await.unwrap_err().code,
            AuthErrorCode::UserNotFound
        );
        provider.disable("a@b.fr");
        assert_eq!(
            provider.sign_in("a@b.fr", "123456").await.unwrap_err().code,
            AuthErrorCode::UserDisabled
        );
    }

    #[test]
    fn error_messages_are_french() {
        assert_eq!(
            AuthError::new(AuthErrorCode::WrongPassword).user_message(),
            "Mot de passe incorrect."
        );
        assert_eq!(
            AuthError::new(AuthErrorCode::WeakPassword).user_message(),
            "Le mot de passe est trop faible (minimum 6 caractères)."
        );
        // Unmapped codes surface the provider's own text.
        assert_eq!(AuthError::other("boom").user_message(), "boom");
    }

    #[tokio::test]
    async fn register_writes_record_and_profile() {
        let provider = MemoryAuthProvider::new();
        let store = MemoryStore::new();
        let id = register_user(&provider, &store, "coach@club.fr", "secret1", "Claire", "Martin")
            .await
            .unwrap();

        let profile = store.fetch_profile(&id.uid).await.unwrap().unwrap();
        assert_eq!(profile.firstname, "Claire");
        assert!(!profile.is_admin);
        let users = store.list_users().await.unwrap();
        assert_eq!(users[0].1.email, "coach@club.fr");
    }

    #[tokio::test]
    async fn register_validates_before_calling_provider() {
        let provider = MemoryAuthProvider::new();
        let store = MemoryStore::new();
        assert_eq!(
            register_user(&provider, &store, "a@b.fr", "secret1", " ", "Martin").await,
            Err(SignUpError::MissingName)
        );
        assert_eq!(
            register_user(&provider, &store, "", "secret1", "Claire", "Martin").await,
            Err(SignUpError::MissingCredentials)
        );
    }

    #[tokio::test]
    async fn register_tolerates_profile_write_failure() {
        let provider = MemoryAuthProvider::new();
        let store = MemoryStore::new();
        // Failure injection only covers reads; registration writes always
        // succeed here, so exercise the degraded path via a failing store.
        struct WriteFailStore(MemoryStore);

        #[async_trait]
        impl DocumentStore for WriteFailStore {
            async fn fetch_app_data(
                &self,
                uid: &str,
            ) -> Result<Option<crate::team::model::AppData>, crate::remote::StoreError> {
                self.0.fetch_app_data(uid).await
            }
            async fn put_app_data(
                &self,
                uid: &str,
                data: &crate::team::model::AppData,
            ) -> Result<(), crate::remote::StoreError> {
                self.0.put_app_data(uid, data).await
            }
            async fn delete_app_data(&self, uid: &str) -> Result<(), crate::remote::StoreError> {
                self.0.delete_app_data(uid).await
            }
            async fn fetch_profile(
                &self,
                uid: &str,
            ) -> Result<Option<Profile>, crate::remote::StoreError> {
                self.0.fetch_profile(uid).await
            }
            async fn put_profile(
                &self,
                _uid: &str,
                _profile: &Profile,
            ) -> Result<(), crate::remote::StoreError> {
                Err(crate::remote::StoreError::Unavailable("down".to_string()))
            }
            async fn put_user_record(
                &self,
                uid: &str,
                record: &UserRecord,
            ) -> Result<(), crate::remote::StoreError> {
                self.0.put_user_record(uid, record).await
            }
            async fn list_users(
                &self,
            ) -> Result<Vec<(String, UserRecord)>, crate::remote::StoreError> {
                self.0.list_users().await
            }
            fn subscribe(
                &self,
                uid: &str,
            ) -> tokio::sync::broadcast::Receiver<crate::remote::RemoteChange> {
                self.0.subscribe(uid)
            }
        }

        let failing = WriteFailStore(store);
        let id = register_user(&provider, &failing, "coach@club.fr", "secret1", "C", "M")
            .await
            .unwrap();
        // Account exists even though the profile write failed.
        assert!(failing.fetch_profile(&id.uid).await.unwrap().is_none());
    }
}
