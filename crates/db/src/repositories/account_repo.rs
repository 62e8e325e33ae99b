//! Repository for the `accounts` table.

use sqlx::{FromRow, PgPool};
use verity_core::types::{IdentityField, Timestamp};

use crate::models::account::{Account, Insertion, NewAccount};
use crate::{StoreError, StoreResult};

/// Column list shared across queries to avoid repetition.
pub(crate) const COLUMNS: &str =
    "username, email, password_hash, roles, enabled, verified, created_at";

/// Raw `accounts` row; roles arrive as a `TEXT[]`.
#[derive(Debug, FromRow)]
pub(crate) struct AccountRow {
    username: String,
    email: String,
    password_hash: String,
    roles: Vec<String>,
    enabled: bool,
    verified: bool,
    created_at: Timestamp,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Account {
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            roles: row.roles.into_iter().collect(),
            enabled: row.enabled,
            verified: row.verified,
            created_at: row.created_at,
        }
    }
}

/// Provides keyed access to accounts.
pub struct AccountRepo;

impl AccountRepo {
    /// Find an account by username (case-sensitive).
    pub async fn find_by_username(pool: &PgPool, username: &str) -> StoreResult<Option<Account>> {
        let query = format!("SELECT {COLUMNS} FROM accounts WHERE username = $1");
        let row = sqlx::query_as::<_, AccountRow>(&query)
            .bind(username)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(Account::from))
    }

    /// Find an account by email (case-sensitive).
    pub async fn find_by_email(pool: &PgPool, email: &str) -> StoreResult<Option<Account>> {
        let query = format!("SELECT {COLUMNS} FROM accounts WHERE email = $1");
        let row = sqlx::query_as::<_, AccountRow>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(Account::from))
    }

    pub async fn exists_by_username(pool: &PgPool, username: &str) -> StoreResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM accounts WHERE username = $1)")
                .bind(username)
                .fetch_one(pool)
                .await?;
        Ok(exists)
    }

    pub async fn exists_by_email(pool: &PgPool, email: &str) -> StoreResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM accounts WHERE email = $1)")
                .bind(email)
                .fetch_one(pool)
                .await?;
        Ok(exists)
    }

    /// Insert unless the username or email is taken, in a single statement.
    ///
    /// On conflict nothing is written; the colliding key is then classified
    /// with username checked first. Takes a connection so enrollment can run
    /// it inside its own transaction.
    pub async fn insert_if_absent(
        conn: &mut sqlx::PgConnection,
        input: &NewAccount,
    ) -> StoreResult<Insertion> {
        let query = format!(
            "INSERT INTO accounts (username, email, password_hash, roles, enabled, verified, created_at)
             VALUES ($1, $2, $3, $4, TRUE, FALSE, $5)
             ON CONFLICT DO NOTHING
             RETURNING {COLUMNS}"
        );
        let roles: Vec<String> = input.roles.iter().cloned().collect();
        let row = sqlx::query_as::<_, AccountRow>(&query)
            .bind(&input.username)
            .bind(&input.email)
            .bind(&input.password_hash)
            .bind(&roles)
            .bind(input.created_at)
            .fetch_optional(&mut *conn)
            .await?;

        if let Some(row) = row {
            return Ok(Insertion::Inserted(row.into()));
        }
        let username_taken: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM accounts WHERE username = $1)")
                .bind(&input.username)
                .fetch_one(&mut *conn)
                .await?;
        if username_taken {
            return Ok(Insertion::Duplicate(IdentityField::Username));
        }
        let email_taken: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM accounts WHERE email = $1)")
                .bind(&input.email)
                .fetch_one(&mut *conn)
                .await?;
        if email_taken {
            return Ok(Insertion::Duplicate(IdentityField::Email));
        }
        Err(StoreError::Corrupt(format!(
            "insert of account {} conflicted on an unknown key",
            input.username
        )))
    }

    /// Upsert an account by username.
    pub async fn save(pool: &PgPool, account: &Account) -> StoreResult<()> {
        let roles: Vec<String> = account.roles.iter().cloned().collect();
        sqlx::query(
            "INSERT INTO accounts (username, email, password_hash, roles, enabled, verified, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (username) DO UPDATE SET
                email = EXCLUDED.email,
                password_hash = EXCLUDED.password_hash,
                roles = EXCLUDED.roles,
                enabled = EXCLUDED.enabled,
                verified = EXCLUDED.verified",
        )
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(&roles)
        .bind(account.enabled)
        .bind(account.verified)
        .bind(account.created_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Mark the account owning `email` verified inside an open transaction.
    ///
    /// Returns `None` if no account carries that email.
    pub(crate) async fn mark_verified_by_email(
        conn: &mut sqlx::PgConnection,
        email: &str,
    ) -> StoreResult<Option<Account>> {
        let query =
            format!("UPDATE accounts SET verified = TRUE WHERE email = $1 RETURNING {COLUMNS}");
        let row = sqlx::query_as::<_, AccountRow>(&query)
            .bind(email)
            .fetch_optional(conn)
            .await?;
        Ok(row.map(Account::from))
    }
}
