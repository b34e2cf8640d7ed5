//! Signed session tokens.
//!
//! Tokens are HS256 JWTs carrying `{ id, iat, exp }`. They are verified on
//! every authenticated request without touching the store.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use wardrobe_core::UserId;

use crate::models::Principal;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("failed to sign token: {0}")]
    Sign(#[source] jsonwebtoken::errors::Error),

    /// Bad signature, malformed token, or expired.
    #[error("invalid token: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),
}

/// Token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub id: UserId,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies tokens with one server secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    #[must_use]
    pub fn new(secret: &SecretString, ttl: Duration) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            validation: Validation::new(Algorithm::HS256),
            ttl,
        }
    }

    /// Sign a token for `user`, valid for the configured lifetime.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Sign` if encoding fails.
    pub fn issue(&self, user: UserId) -> Result<String, TokenError> {
        let iat = Utc::now().timestamp();
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        self.sign(&Claims {
            id: user,
            iat,
            exp: iat.saturating_add(ttl),
        })
    }

    fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding).map_err(TokenError::Sign)
    }

    /// Verify signature and expiry and return the caller.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Invalid` for any token that does not verify.
    pub fn verify(&self, token: &str) -> Result<Principal, TokenError> {
        let data =
            decode::<Claims>(token, &self.decoding, &self.validation).map_err(TokenError::Invalid)?;
        Ok(Principal { id: data.claims.id })
    }
}
