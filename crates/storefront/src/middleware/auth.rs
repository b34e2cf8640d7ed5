//! Identity gate.
//!
//! [`RequireUser`] verifies the request's signed token and yields the caller's
//! [`Principal`]. Rejection happens during extraction, so a protected handler
//! body never runs for an unauthenticated request. The gate never reads the
//! store.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};

use crate::error::{AppError, set_sentry_user};
use crate::models::Principal;
use crate::state::AppState;

/// Legacy header carrying the bare token.
pub const AUTH_TOKEN_HEADER: &str = "auth-token";

/// Extractor that requires a valid token.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireUser(principal): RequireUser) -> String {
///     format!("Hello, user {}!", principal.id)
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RequireUser(pub Principal);

/// Pull the token from `auth-token`, falling back to `Authorization: Bearer`.
fn token_from_headers(headers: &HeaderMap) -> Option<&str> {
    let legacy = headers
        .get(AUTH_TOKEN_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty());

    legacy.or_else(|| {
        headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
    })
}

impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = token_from_headers(&parts.headers).ok_or(AppError::Unauthorized)?;

        let state = AppState::from_ref(state);
        let principal = state.tokens().verify(token).map_err(|e| {
            tracing::debug!(error = %e, "token rejected");
            AppError::InvalidToken
        })?;

        tracing::Span::current().record("user_id", principal.id.as_i32());
        set_sentry_user(&principal.id);

        Ok(Self(principal))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn legacy_header_wins_over_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTH_TOKEN_HEADER, HeaderValue::from_static("legacy"));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer modern"));
        assert_eq!(token_from_headers(&headers), Some("legacy"));
    }

    #[test]
    fn bearer_is_accepted() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(token_from_headers(&headers), Some("abc.def.ghi"));
    }

    #[test]
    fn missing_or_blank_is_none() {
        let mut headers = HeaderMap::new();
        assert_eq!(token_from_headers(&headers), None);

        headers.insert(AUTH_TOKEN_HEADER, HeaderValue::from_static("  "));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
        assert_eq!(token_from_headers(&headers), None);
    }
}
