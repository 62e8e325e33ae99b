//! Session token issuance and validation.
//!
//! Session tokens are HS256-signed JWTs carrying a [`SessionClaims`] payload.
//! They are self-contained: validation needs the secret and a clock, never a
//! store lookup. Expiry is checked against the injected [`Clock`] rather than
//! the wall clock, so lifetimes are testable.

use std::sync::Arc;

use chrono::{DateTime, Duration};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use verity_core::clock::Clock;
use verity_core::config::SessionConfig;
use verity_core::error::{AuthError, AuthResult};
use verity_core::types::{Identity, RoleSet, Timestamp};

/// JWT claims embedded in every session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject -- the account's username.
    pub sub: String,
    /// Role labels, serialized in sorted order.
    pub roles: RoleSet,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
}

/// A freshly minted session token plus the facts it encodes.
#[derive(Debug, Clone)]
pub struct SessionToken {
    pub token: String,
    pub subject: String,
    pub roles: RoleSet,
    pub issued_at: Timestamp,
    pub expires_at: Timestamp,
}

/// Converts an authenticated [`Identity`] into a signed bearer token.
pub struct SessionIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: Duration,
    clock: Arc<dyn Clock>,
}

impl SessionIssuer {
    pub fn new(config: &SessionConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            lifetime: config.lifetime,
            clock,
        }
    }

    /// Mint a token for `identity`, valid from now for the configured lifetime.
    pub fn issue(&self, identity: &Identity) -> AuthResult<SessionToken> {
        let issued_at = truncate_to_seconds(self.clock.now());
        let expires_at = issued_at + self.lifetime;

        let claims = SessionClaims {
            sub: identity.username.clone(),
            roles: identity.roles.clone(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Internal(format!("failed to sign session token: {e}")))?;

        Ok(SessionToken {
            token,
            subject: claims.sub,
            roles: claims.roles,
            issued_at,
            expires_at,
        })
    }

    /// Check the signature, then the expiry against the injected clock.
    pub fn validate(&self, token: &str) -> AuthResult<SessionClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is judged below with the injected clock.
        validation.validate_exp = false;

        let claims = decode::<SessionClaims>(token, &self.decoding, &validation)
            .map_err(|_| AuthError::SessionInvalid)?
            .claims;

        if self.clock.now().timestamp() > claims.exp {
            return Err(AuthError::SessionExpired);
        }
        Ok(claims)
    }
}

/// JWT timestamps are whole seconds; keep the reported instants consistent
/// with what the token actually says.
fn truncate_to_seconds(instant: Timestamp) -> Timestamp {
    DateTime::from_timestamp(instant.timestamp(), 0).unwrap_or(instant)
}
