use crate::types::IdentityField;

/// Every failure the credential and verification lifecycle can report.
///
/// All variants except [`AuthError::Internal`] are local, recoverable
/// conditions the caller can act on. Transport layers map them to status codes
/// via [`AuthError::code`].
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{}", duplicate_message(.field))]
    DuplicateIdentity { field: IdentityField },

    /// Unknown account, disabled account, or wrong password. Deliberately
    /// indistinguishable.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Please verify your email before logging in")]
    NotVerified,

    #[error("Invalid verification token")]
    TokenNotFound,

    #[error("Verification token already used")]
    TokenAlreadyUsed,

    #[error("Verification token has expired")]
    TokenExpired,

    /// Wrong code or already-consumed code. Deliberately indistinguishable.
    #[error("Invalid verification code")]
    InvalidCode,

    #[error("Account not found")]
    AccountNotFound,

    #[error("Invalid session token")]
    SessionInvalid,

    #[error("Session token has expired")]
    SessionExpired,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience alias for lifecycle operations.
pub type AuthResult<T> = Result<T, AuthError>;

impl AuthError {
    /// Machine-readable error code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::DuplicateIdentity { .. } => "DUPLICATE_IDENTITY",
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::NotVerified => "NOT_VERIFIED",
            AuthError::TokenNotFound => "TOKEN_NOT_FOUND",
            AuthError::TokenAlreadyUsed => "TOKEN_ALREADY_USED",
            AuthError::TokenExpired => "TOKEN_EXPIRED",
            AuthError::InvalidCode => "INVALID_CODE",
            AuthError::AccountNotFound => "ACCOUNT_NOT_FOUND",
            AuthError::SessionInvalid => "SESSION_INVALID",
            AuthError::SessionExpired => "SESSION_EXPIRED",
            AuthError::Validation(_) => "VALIDATION_ERROR",
            AuthError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

fn duplicate_message(field: &IdentityField) -> &'static str {
    match field {
        IdentityField::Username => "Username is already taken",
        IdentityField::Email => "Email is already in use",
    }
}
