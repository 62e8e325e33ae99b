use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Role labels attached to an account. Ordered so encodings are canonical.
pub type RoleSet = BTreeSet<String>;

/// Which kind of verification artifact a token represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TokenKind {
    /// Opaque id redeemed through a verification link.
    Link,
    /// Short numeric code redeemed together with the email address.
    Code,
}

impl TokenKind {
    /// Stable storage label (`"LINK"` / `"CODE"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Link => "LINK",
            TokenKind::Code => "CODE",
        }
    }

    /// Parse a storage label produced by [`TokenKind::as_str`].
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "LINK" => Some(TokenKind::Link),
            "CODE" => Some(TokenKind::Code),
            _ => None,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The unique key of an account that collided during registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityField {
    Username,
    Email,
}

impl fmt::Display for IdentityField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityField::Username => f.write_str("username"),
            IdentityField::Email => f.write_str("email"),
        }
    }
}

/// An authenticated principal: who logged in and what they may do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub username: String,
    pub roles: RoleSet,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_kind_labels_parse_back() {
        assert_eq!(TokenKind::parse(TokenKind::Link.as_str()), Some(TokenKind::Link));
        assert_eq!(TokenKind::parse(TokenKind::Code.as_str()), Some(TokenKind::Code));
        assert_eq!(TokenKind::parse("link"), None);
    }

    #[test]
    fn identity_field_display_names_the_key() {
        assert_eq!(IdentityField::Username.to_string(), "username");
        assert_eq!(IdentityField::Email.to_string(), "email");
    }
}
