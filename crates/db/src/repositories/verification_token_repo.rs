//! Repository for the `verification_tokens` table.

use sqlx::{FromRow, PgPool};
use verity_core::types::{Timestamp, TokenKind};

use crate::models::verification_token::VerificationToken;
use crate::{StoreError, StoreResult};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, email, code, kind, expires_at, used, created_at";

/// Raw `verification_tokens` row; `kind` is stored as its text label.
#[derive(Debug, FromRow)]
pub(crate) struct VerificationTokenRow {
    id: String,
    email: String,
    code: Option<String>,
    kind: String,
    expires_at: Timestamp,
    used: bool,
    created_at: Timestamp,
}

impl TryFrom<VerificationTokenRow> for VerificationToken {
    type Error = StoreError;

    fn try_from(row: VerificationTokenRow) -> Result<Self, Self::Error> {
        let kind = TokenKind::parse(&row.kind).ok_or_else(|| {
            StoreError::Corrupt(format!("token {} has unknown kind {:?}", row.id, row.kind))
        })?;
        Ok(VerificationToken {
            id: row.id,
            email: row.email,
            code: row.code,
            kind,
            expires_at: row.expires_at,
            used: row.used,
            created_at: row.created_at,
        })
    }
}

/// Provides keyed access to verification tokens.
pub struct VerificationTokenRepo;

impl VerificationTokenRepo {
    pub async fn find_by_id(pool: &PgPool, id: &str) -> StoreResult<Option<VerificationToken>> {
        let query = format!("SELECT {COLUMNS} FROM verification_tokens WHERE id = $1");
        sqlx::query_as::<_, VerificationTokenRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?
            .map(VerificationToken::try_from)
            .transpose()
    }

    /// Most recent unconsumed token for this `(email, code)` pair.
    pub async fn find_by_email_and_code_unused(
        pool: &PgPool,
        email: &str,
        code: &str,
    ) -> StoreResult<Option<VerificationToken>> {
        let query = format!(
            "SELECT {COLUMNS} FROM verification_tokens
             WHERE email = $1 AND code = $2 AND used = FALSE
             ORDER BY created_at DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, VerificationTokenRow>(&query)
            .bind(email)
            .bind(code)
            .fetch_optional(pool)
            .await?
            .map(VerificationToken::try_from)
            .transpose()
    }

    /// Upsert a token by id.
    pub async fn save(pool: &PgPool, token: &VerificationToken) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO verification_tokens (id, email, code, kind, expires_at, used, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (id) DO UPDATE SET used = EXCLUDED.used",
        )
        .bind(&token.id)
        .bind(&token.email)
        .bind(&token.code)
        .bind(token.kind.as_str())
        .bind(token.expires_at)
        .bind(token.used)
        .bind(token.created_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Insert a new token inside an open transaction.
    pub(crate) async fn insert(
        conn: &mut sqlx::PgConnection,
        token: &VerificationToken,
    ) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO verification_tokens (id, email, code, kind, expires_at, used, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&token.id)
        .bind(&token.email)
        .bind(&token.code)
        .bind(token.kind.as_str())
        .bind(token.expires_at)
        .bind(token.used)
        .bind(token.created_at)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Delete tokens that expired before `cutoff`. Returns the number removed.
    pub async fn delete_expired_before(pool: &PgPool, cutoff: Timestamp) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM verification_tokens WHERE expires_at < $1")
            .bind(cutoff)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Lock a token row for the rest of the enclosing transaction.
    pub(crate) async fn find_for_update(
        conn: &mut sqlx::PgConnection,
        id: &str,
    ) -> StoreResult<Option<VerificationToken>> {
        let query = format!("SELECT {COLUMNS} FROM verification_tokens WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, VerificationTokenRow>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await?
            .map(VerificationToken::try_from)
            .transpose()
    }

    pub(crate) async fn mark_used(conn: &mut sqlx::PgConnection, id: &str) -> StoreResult<()> {
        sqlx::query("UPDATE verification_tokens SET used = TRUE WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }
}
