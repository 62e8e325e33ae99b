//! In-process store backend.
//!
//! A single async mutex guards accounts and tokens together, so the
//! conditional insert, enrollment and the redemption transaction are each one
//! critical section.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use verity_core::types::{IdentityField, Timestamp};

use crate::models::account::{Account, Insertion, NewAccount};
use crate::models::verification_token::{Consumption, VerificationToken};
use crate::store::{AccountStore, TokenStore, VerificationLedger};
use crate::StoreResult;

#[derive(Default)]
struct Inner {
    /// Keyed by username.
    accounts: HashMap<String, Account>,
    /// Email -> username.
    emails: HashMap<String, String>,
    /// Keyed by token id.
    tokens: HashMap<String, VerificationToken>,
}

impl Inner {
    fn account_by_email(&self, email: &str) -> Option<&Account> {
        self.emails
            .get(email)
            .and_then(|username| self.accounts.get(username))
    }

    fn upsert_account(&mut self, account: Account) {
        if let Some(previous) = self.accounts.get(&account.username) {
            if previous.email != account.email {
                self.emails.remove(&previous.email);
            }
        }
        self.emails
            .insert(account.email.clone(), account.username.clone());
        self.accounts.insert(account.username.clone(), account);
    }

    fn insert_if_absent(&mut self, account: NewAccount) -> Insertion {
        if self.accounts.contains_key(&account.username) {
            return Insertion::Duplicate(IdentityField::Username);
        }
        if self.emails.contains_key(&account.email) {
            return Insertion::Duplicate(IdentityField::Email);
        }
        let account = account.into_account();
        self.upsert_account(account.clone());
        Insertion::Inserted(account)
    }
}

/// Accounts and tokens held in memory.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn account_count(&self) -> usize {
        self.inner.lock().await.accounts.len()
    }

    pub async fn token_count(&self) -> usize {
        self.inner.lock().await.tokens.len()
    }

    /// All tokens issued to `email`, oldest first.
    pub async fn tokens_for(&self, email: &str) -> Vec<VerificationToken> {
        let inner = self.inner.lock().await;
        let mut tokens: Vec<_> = inner
            .tokens
            .values()
            .filter(|t| t.email == email)
            .cloned()
            .collect();
        tokens.sort_by_key(|t| t.created_at);
        tokens
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn find_by_username(&self, username: &str) -> StoreResult<Option<Account>> {
        Ok(self.inner.lock().await.accounts.get(username).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        Ok(self.inner.lock().await.account_by_email(email).cloned())
    }

    async fn exists_by_username(&self, username: &str) -> StoreResult<bool> {
        Ok(self.inner.lock().await.accounts.contains_key(username))
    }

    async fn exists_by_email(&self, email: &str) -> StoreResult<bool> {
        Ok(self.inner.lock().await.emails.contains_key(email))
    }

    async fn insert_if_absent(&self, account: NewAccount) -> StoreResult<Insertion> {
        Ok(self.inner.lock().await.insert_if_absent(account))
    }

    async fn save(&self, account: &Account) -> StoreResult<()> {
        self.inner.lock().await.upsert_account(account.clone());
        Ok(())
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn find_by_id(&self, id: &str) -> StoreResult<Option<VerificationToken>> {
        Ok(self.inner.lock().await.tokens.get(id).cloned())
    }

    async fn find_by_email_and_code_unused(
        &self,
        email: &str,
        code: &str,
    ) -> StoreResult<Option<VerificationToken>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .tokens
            .values()
            .filter(|t| !t.used && t.email == email && t.code.as_deref() == Some(code))
            .max_by_key(|t| t.created_at)
            .cloned())
    }

    async fn save(&self, token: &VerificationToken) -> StoreResult<()> {
        self.inner
            .lock()
            .await
            .tokens
            .insert(token.id.clone(), token.clone());
        Ok(())
    }

    async fn delete_expired_before(&self, instant: Timestamp) -> StoreResult<u64> {
        let mut inner = self.inner.lock().await;
        let before = inner.tokens.len();
        inner.tokens.retain(|_, t| t.expires_at >= instant);
        Ok((before - inner.tokens.len()) as u64)
    }
}

#[async_trait]
impl VerificationLedger for MemoryStore {
    async fn enroll(
        &self,
        account: NewAccount,
        token: &VerificationToken,
    ) -> StoreResult<Insertion> {
        let mut inner = self.inner.lock().await;
        let insertion = inner.insert_if_absent(account);
        if let Insertion::Inserted(_) = insertion {
            inner.tokens.insert(token.id.clone(), token.clone());
        }
        Ok(insertion)
    }

    async fn consume_and_verify(
        &self,
        token_id: &str,
        now: Timestamp,
    ) -> StoreResult<Consumption> {
        let mut inner = self.inner.lock().await;

        let Some(token) = inner.tokens.get(token_id) else {
            return Ok(Consumption::NotFound);
        };
        if token.used {
            return Ok(Consumption::AlreadyUsed);
        }
        if token.is_expired_at(now) {
            return Ok(Consumption::Expired);
        }
        let Some(mut account) = inner.account_by_email(&token.email).cloned() else {
            return Ok(Consumption::AccountMissing);
        };
        let mut token = token.clone();

        account.verified = true;
        token.used = true;
        inner.upsert_account(account.clone());
        inner.tokens.insert(token.id.clone(), token.clone());

        Ok(Consumption::Verified { account, token })
    }
}
