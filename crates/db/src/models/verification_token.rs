//! Verification token model.

use verity_core::types::{Timestamp, TokenKind};

use super::account::Account;

/// A link or code verification artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationToken {
    /// Opaque unique id, also the redemption value for link tokens.
    pub id: String,
    pub email: String,
    /// Present only for [`TokenKind::Code`].
    pub code: Option<String>,
    pub kind: TokenKind,
    /// Fixed at creation, never extended.
    pub expires_at: Timestamp,
    pub used: bool,
    pub created_at: Timestamp,
}

impl VerificationToken {
    /// A token is expired strictly after its expiry instant.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        now > self.expires_at
    }
}

/// Outcome of redeeming a token against the ledger.
///
/// Only [`Consumption::Verified`] mutates anything; every other variant leaves
/// both the token and the account untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Consumption {
    /// The token is now used and its account verified.
    Verified {
        account: Account,
        token: VerificationToken,
    },
    NotFound,
    AlreadyUsed,
    Expired,
    /// No account carries the token's email.
    AccountMissing,
}
