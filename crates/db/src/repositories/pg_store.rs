//! Store contracts implemented over a PostgreSQL pool.

use async_trait::async_trait;
use verity_core::types::Timestamp;

use super::{AccountRepo, VerificationTokenRepo};
use crate::models::account::{Account, Insertion, NewAccount};
use crate::models::verification_token::{Consumption, VerificationToken};
use crate::store::{AccountStore, TokenStore, VerificationLedger};
use crate::{DbPool, StoreResult};

/// PostgreSQL-backed store. Cheap to clone.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgStore {
    async fn find_by_username(&self, username: &str) -> StoreResult<Option<Account>> {
        AccountRepo::find_by_username(&self.pool, username).await
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        AccountRepo::find_by_email(&self.pool, email).await
    }

    async fn exists_by_username(&self, username: &str) -> StoreResult<bool> {
        AccountRepo::exists_by_username(&self.pool, username).await
    }

    async fn exists_by_email(&self, email: &str) -> StoreResult<bool> {
        AccountRepo::exists_by_email(&self.pool, email).await
    }

    async fn insert_if_absent(&self, account: NewAccount) -> StoreResult<Insertion> {
        let mut conn = self.pool.acquire().await?;
        AccountRepo::insert_if_absent(&mut *conn, &account).await
    }

    async fn save(&self, account: &Account) -> StoreResult<()> {
        AccountRepo::save(&self.pool, account).await
    }
}

#[async_trait]
impl TokenStore for PgStore {
    async fn find_by_id(&self, id: &str) -> StoreResult<Option<VerificationToken>> {
        VerificationTokenRepo::find_by_id(&self.pool, id).await
    }

    async fn find_by_email_and_code_unused(
        &self,
        email: &str,
        code: &str,
    ) -> StoreResult<Option<VerificationToken>> {
        VerificationTokenRepo::find_by_email_and_code_unused(&self.pool, email, code).await
    }

    async fn save(&self, token: &VerificationToken) -> StoreResult<()> {
        VerificationTokenRepo::save(&self.pool, token).await
    }

    async fn delete_expired_before(&self, instant: Timestamp) -> StoreResult<u64> {
        VerificationTokenRepo::delete_expired_before(&self.pool, instant).await
    }
}

#[async_trait]
impl VerificationLedger for PgStore {
    /// A duplicate or any failure drops the transaction, so neither row is kept.
    async fn enroll(
        &self,
        account: NewAccount,
        token: &VerificationToken,
    ) -> StoreResult<Insertion> {
        let mut tx = self.pool.begin().await?;

        let insertion = AccountRepo::insert_if_absent(&mut *tx, &account).await?;
        if let Insertion::Inserted(_) = insertion {
            VerificationTokenRepo::insert(&mut *tx, token).await?;
            tx.commit().await?;
        }
        Ok(insertion)
    }

    /// Runs under a `SELECT ... FOR UPDATE` lock on the token row; a second
    /// redeemer blocks until the first commits and then sees `used = TRUE`.
    /// Every early return drops the transaction, which rolls it back.
    async fn consume_and_verify(
        &self,
        token_id: &str,
        now: Timestamp,
    ) -> StoreResult<Consumption> {
        let mut tx = self.pool.begin().await?;

        let Some(mut token) = VerificationTokenRepo::find_for_update(&mut *tx, token_id).await?
        else {
            return Ok(Consumption::NotFound);
        };
        if token.used {
            return Ok(Consumption::AlreadyUsed);
        }
        if token.is_expired_at(now) {
            return Ok(Consumption::Expired);
        }

        let Some(account) = AccountRepo::mark_verified_by_email(&mut *tx, &token.email).await?
        else {
            return Ok(Consumption::AccountMissing);
        };
        VerificationTokenRepo::mark_used(&mut *tx, &token.id).await?;
        tx.commit().await?;

        token.used = true;
        tracing::debug!(token_kind = %token.kind, email = %token.email, "Token consumed");
        Ok(Consumption::Verified { account, token })
    }
}
