//! Account entity model and DTOs.

use verity_core::types::{Identity, IdentityField, RoleSet, Timestamp};

/// A registered account.
///
/// Contains the password hash -- never hand this to a transport layer
/// directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub roles: RoleSet,
    /// Account-level kill switch, independent of verification.
    pub enabled: bool,
    /// Flips to `true` once, through a token redemption.
    pub verified: bool,
    pub created_at: Timestamp,
}

impl Account {
    /// The principal this account authenticates as.
    pub fn identity(&self) -> Identity {
        Identity {
            username: self.username.clone(),
            roles: self.roles.clone(),
        }
    }
}

/// DTO for creating an account. New accounts start enabled and unverified.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub roles: RoleSet,
    pub created_at: Timestamp,
}

impl NewAccount {
    pub fn into_account(self) -> Account {
        Account {
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            roles: self.roles,
            enabled: true,
            verified: false,
            created_at: self.created_at,
        }
    }
}

/// Outcome of an atomic conditional insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Insertion {
    Inserted(Account),
    /// Nothing was written. Username collisions are reported before email ones.
    Duplicate(IdentityField),
}
