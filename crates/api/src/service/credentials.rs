//! Credential manager: account registration and password login.

use std::sync::Arc;

use verity_core::clock::Clock;
use verity_core::error::{AuthError, AuthResult};
use verity_core::roles::default_roles;
use verity_core::types::{Identity, IdentityField};
use verity_db::models::account::{Account, Insertion, NewAccount};
use verity_db::models::verification_token::VerificationToken;
use verity_db::store::{AccountStore, Stores, VerificationLedger};

use crate::auth::password::CredentialHasher;

/// Checked on the unknown-or-disabled branch: every rejected login pays one
/// digest verification.
const DECOY_PASSWORD: &str = "verity-decoy-credential";

pub struct CredentialManager {
    accounts: Arc<dyn AccountStore>,
    ledger: Arc<dyn VerificationLedger>,
    hasher: Arc<dyn CredentialHasher>,
    clock: Arc<dyn Clock>,
    decoy_digest: Option<String>,
}

impl CredentialManager {
    pub fn new(stores: &Stores, hasher: Arc<dyn CredentialHasher>, clock: Arc<dyn Clock>) -> Self {
        let decoy_digest = match hasher.hash(DECOY_PASSWORD) {
            Ok(digest) => Some(digest),
            Err(e) => {
                tracing::warn!(error = %e, "Could not prepare decoy digest");
                None
            }
        };
        Self {
            accounts: Arc::clone(&stores.accounts),
            ledger: Arc::clone(&stores.ledger),
            hasher,
            clock,
            decoy_digest,
        }
    }

    /// Create an enabled, unverified account with the default role set and
    /// persist `first_token` with it.
    ///
    /// Username collisions are reported before email collisions. The
    /// `exists_*` checks only short-circuit the hash for obvious duplicates;
    /// uniqueness itself is enforced by the conditional insert. The account
    /// and token are stored together or not at all.
    pub async fn create_account(
        &self,
        username: &str,
        email: &str,
        password: &str,
        first_token: &VerificationToken,
    ) -> AuthResult<Account> {
        if self.accounts.exists_by_username(username).await? {
            return Err(duplicate(IdentityField::Username, username));
        }
        if self.accounts.exists_by_email(email).await? {
            return Err(duplicate(IdentityField::Email, username));
        }

        let password_hash = self
            .hasher
            .hash(password)
            .map_err(|e| AuthError::Internal(format!("password hashing failed: {e}")))?;

        let new_account = NewAccount {
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
            roles: default_roles(),
            created_at: self.clock.now(),
        };

        match self.ledger.enroll(new_account, first_token).await? {
            Insertion::Inserted(account) => {
                tracing::info!(username = %account.username, email = %account.email, "Account registered");
                Ok(account)
            }
            Insertion::Duplicate(field) => Err(duplicate(field, username)),
        }
    }

    /// Check a username-or-email plus password.
    ///
    /// Unknown, disabled, and wrong-password attempts all fail with
    /// [`AuthError::InvalidCredentials`]. [`AuthError::NotVerified`] is only
    /// reported once the password has matched.
    pub async fn authenticate(&self, identifier: &str, password: &str) -> AuthResult<Identity> {
        let account = match self.accounts.find_by_username(identifier).await? {
            Some(account) => Some(account),
            None => self.accounts.find_by_email(identifier).await?,
        };

        let Some(account) = account.filter(|a| a.enabled) else {
            if let Some(decoy) = &self.decoy_digest {
                let _ = self.hasher.verify(password, decoy);
            }
            tracing::debug!(identifier, "Login rejected: unknown or disabled account");
            return Err(AuthError::InvalidCredentials);
        };

        let matches = self
            .hasher
            .verify(password, &account.password_hash)
            .map_err(|e| {
                tracing::error!(username = %account.username, error = %e, "Stored credential is unreadable");
                AuthError::Internal(format!("password verification failed: {e}"))
            })?;
        if !matches {
            tracing::debug!(username = %account.username, "Login rejected: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        if !account.verified {
            tracing::debug!(username = %account.username, "Login rejected: email not verified");
            return Err(AuthError::NotVerified);
        }

        Ok(account.identity())
    }
}

fn duplicate(field: IdentityField, username: &str) -> AuthError {
    tracing::debug!(username, %field, "Registration rejected: duplicate identity");
    AuthError::DuplicateIdentity { field }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use assert_matches::assert_matches;
    use chrono::Duration;
    use verity_core::clock::ManualClock;
    use verity_core::types::TokenKind;
    use verity_db::memory::MemoryStore;

    use super::*;
    use crate::auth::password::{Argon2Hasher, HashError};

    fn manager(store: Arc<MemoryStore>) -> CredentialManager {
        CredentialManager::new(
            &Stores::shared(store),
            Arc::new(Argon2Hasher),
            Arc::new(ManualClock::starting_now()),
        )
    }

    fn first_token(email: &str) -> VerificationToken {
        let now = chrono::Utc::now();
        VerificationToken {
            id: format!("link-{email}"),
            email: email.to_string(),
            code: None,
            kind: TokenKind::Link,
            expires_at: now + Duration::hours(24),
            used: false,
            created_at: now,
        }
    }

    async fn register(manager: &CredentialManager, username: &str, email: &str) -> AuthResult<Account> {
        manager
            .create_account(username, email, "pw123", &first_token(email))
            .await
    }

    /// Counts `verify` calls and delegates to Argon2.
    #[derive(Default)]
    struct CountingHasher {
        verifications: AtomicUsize,
    }

    impl CredentialHasher for CountingHasher {
        fn hash(&self, plaintext: &str) -> Result<String, HashError> {
            Argon2Hasher.hash(plaintext)
        }

        fn verify(&self, plaintext: &str, digest: &str) -> Result<bool, HashError> {
            self.verifications.fetch_add(1, Ordering::SeqCst);
            Argon2Hasher.verify(plaintext, digest)
        }
    }

    #[tokio::test]
    async fn new_accounts_are_enabled_unverified_users() {
        let store = Arc::new(MemoryStore::new());
        let account = register(&manager(store.clone()), "alice", "alice@x.com")
            .await
            .expect("registration should succeed");

        assert!(account.enabled);
        assert!(!account.verified);
        assert_eq!(account.roles, default_roles());
        assert_ne!(account.password_hash, "pw123");
        assert_eq!(store.account_count().await, 1);
        assert_eq!(store.tokens_for("alice@x.com").await.len(), 1);
    }

    #[tokio::test]
    async fn username_collision_is_reported_before_email() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager(store.clone());
        register(&manager, "alice", "alice@x.com").await.unwrap();

        assert_matches!(
            register(&manager, "alice", "alice@x.com").await,
            Err(AuthError::DuplicateIdentity { field: IdentityField::Username })
        );
        assert_matches!(
            register(&manager, "alice2", "alice@x.com").await,
            Err(AuthError::DuplicateIdentity { field: IdentityField::Email })
        );
        assert_eq!(store.account_count().await, 1);
        assert_eq!(store.token_count().await, 1);
    }

    #[tokio::test]
    async fn unknown_disabled_and_wrong_password_look_the_same() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager(store.clone());
        let mut account = register(&manager, "bob", "bob@x.com").await.unwrap();

        assert_matches!(
            manager.authenticate("nobody", "pw123").await,
            Err(AuthError::InvalidCredentials)
        );
        assert_matches!(
            manager.authenticate("bob", "wrong").await,
            Err(AuthError::InvalidCredentials)
        );

        account.enabled = false;
        account.verified = true;
        store.save(&account).await.unwrap();
        assert_matches!(
            manager.authenticate("bob", "pw123").await,
            Err(AuthError::InvalidCredentials)
        );
    }

    #[tokio::test]
    async fn unknown_account_still_runs_a_digest_verification() {
        let store = Arc::new(MemoryStore::new());
        let hasher = Arc::new(CountingHasher::default());
        let manager = CredentialManager::new(
            &Stores::shared(store.clone()),
            hasher.clone(),
            Arc::new(ManualClock::starting_now()),
        );

        assert_matches!(
            manager.authenticate("nobody", "pw123").await,
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(hasher.verifications.load(Ordering::SeqCst), 1);

        let mut account = register(&manager, "bea", "bea@x.com").await.unwrap();
        account.enabled = false;
        store.save(&account).await.unwrap();
        assert_matches!(
            manager.authenticate("bea", "pw123").await,
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(hasher.verifications.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unverified_account_needs_the_right_password_to_learn_it_is_unverified() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager(store);
        register(&manager, "carol", "carol@x.com").await.unwrap();

        assert_matches!(
            manager.authenticate("carol", "wrong").await,
            Err(AuthError::InvalidCredentials)
        );
        assert_matches!(
            manager.authenticate("carol", "pw123").await,
            Err(AuthError::NotVerified)
        );
    }

    #[tokio::test]
    async fn email_works_as_the_login_identifier() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager(store.clone());
        let mut account = register(&manager, "dave", "dave@x.com").await.unwrap();
        account.verified = true;
        store.save(&account).await.unwrap();

        let identity = manager.authenticate("dave@x.com", "pw123").await.unwrap();
        assert_eq!(identity.username, "dave");
        assert_eq!(identity.roles, default_roles());
    }
}
