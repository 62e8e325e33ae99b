//! Well-known role labels.

use crate::types::RoleSet;

/// Role granted to every newly registered account.
pub const ROLE_USER: &str = "USER";

/// Role set assigned on registration.
pub fn default_roles() -> RoleSet {
    RoleSet::from([ROLE_USER.to_string()])
}
