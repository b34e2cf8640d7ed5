//! Authentication error types.

use thiserror::Error;

use super::token::TokenError;
use crate::db::RepositoryError;

/// Errors that can occur during signup and signin.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] wardrobe_core::EmailError),

    /// Invalid phone number.
    #[error("invalid phone: {0}")]
    InvalidPhone(#[from] wardrobe_core::PhoneError),

    /// A required field is missing or blank.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Email or phone already registered. Carries the field name.
    #[error("{0} already registered")]
    DuplicateField(&'static str),

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Invalid credentials (wrong password or unknown email).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,

    /// Token signing error.
    #[error(transparent)]
    Token(#[from] TokenError),
}

impl AuthError {
    /// Message safe to show the client.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::InvalidEmail(e) => format!("Invalid email: {e}"),
            Self::InvalidPhone(e) => format!("Invalid phone: {e}"),
            Self::InvalidInput(reason) | Self::WeakPassword(reason) => reason.clone(),
            Self::DuplicateField("phone") => {
                "An account with this phone number already exists".to_owned()
            }
            Self::DuplicateField(_) => "An account with this email already exists".to_owned(),
            Self::InvalidCredentials => "Invalid email or password".to_owned(),
            Self::Repository(_) | Self::PasswordHash | Self::Token(_) => {
                "Internal server error".to_owned()
            }
        }
    }

    /// Whether the client sent something unacceptable (as opposed to a server fault).
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidEmail(_)
                | Self::InvalidPhone(_)
                | Self::InvalidInput(_)
                | Self::DuplicateField(_)
                | Self::WeakPassword(_)
                | Self::InvalidCredentials
        )
    }
}
