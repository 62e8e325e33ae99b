//! Store contracts consumed by the lifecycle services.
//!
//! "Not found" is an `Ok(None)`, never an error. The operations that carry a
//! race in a read-then-write implementation are expressed as single
//! conditional writes: [`AccountStore::insert_if_absent`],
//! [`VerificationLedger::enroll`] and [`VerificationLedger::consume_and_verify`].

use std::sync::Arc;

use async_trait::async_trait;
use verity_core::types::Timestamp;

use crate::models::account::{Account, Insertion, NewAccount};
use crate::models::verification_token::{Consumption, VerificationToken};
use crate::StoreResult;

/// Account records keyed by username, with a unique secondary key on email.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> StoreResult<Option<Account>>;

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Account>>;

    async fn exists_by_username(&self, username: &str) -> StoreResult<bool>;

    async fn exists_by_email(&self, email: &str) -> StoreResult<bool>;

    /// Insert the account unless its username or email is already taken.
    ///
    /// Must be atomic: two concurrent calls with the same key produce exactly
    /// one [`Insertion::Inserted`].
    async fn insert_if_absent(&self, account: NewAccount) -> StoreResult<Insertion>;

    /// Upsert by username.
    async fn save(&self, account: &Account) -> StoreResult<()>;
}

/// Verification tokens keyed by id, with a lookup by `(email, code)`.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn find_by_id(&self, id: &str) -> StoreResult<Option<VerificationToken>>;

    /// The most recent unconsumed token carrying this email and code.
    async fn find_by_email_and_code_unused(
        &self,
        email: &str,
        code: &str,
    ) -> StoreResult<Option<VerificationToken>>;

    /// Upsert by id.
    async fn save(&self, token: &VerificationToken) -> StoreResult<()>;

    /// Delete tokens whose expiry is before `instant`. Returns the number removed.
    async fn delete_expired_before(&self, instant: Timestamp) -> StoreResult<u64>;
}

/// The cross-record transactions behind registration and token redemption.
#[async_trait]
pub trait VerificationLedger: Send + Sync {
    /// Insert a new account together with its first verification token.
    ///
    /// Both records are written or neither is. A username or email collision
    /// returns [`Insertion::Duplicate`] and leaves the token unsaved.
    async fn enroll(
        &self,
        account: NewAccount,
        token: &VerificationToken,
    ) -> StoreResult<Insertion>;

    /// Redeem `token_id` at `now`.
    ///
    /// In one transaction scoped to the token: classify it (missing, used,
    /// expired), resolve its account by email, then mark the token used and
    /// the account verified together. Concurrent calls for the same token
    /// yield exactly one [`Consumption::Verified`]; the rest observe
    /// [`Consumption::AlreadyUsed`].
    async fn consume_and_verify(&self, token_id: &str, now: Timestamp)
        -> StoreResult<Consumption>;
}

/// One backend seen through all three contracts.
#[derive(Clone)]
pub struct Stores {
    pub accounts: Arc<dyn AccountStore>,
    pub tokens: Arc<dyn TokenStore>,
    pub ledger: Arc<dyn VerificationLedger>,
}

impl Stores {
    /// Share a single backend that implements every contract.
    pub fn shared<S>(backend: Arc<S>) -> Self
    where
        S: AccountStore + TokenStore + VerificationLedger + 'static,
    {
        Self {
            accounts: backend.clone(),
            tokens: backend.clone(),
            ledger: backend,
        }
    }
}
