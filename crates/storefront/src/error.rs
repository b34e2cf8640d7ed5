//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to Sentry
//! before responding to the client. All route handlers return
//! `Result<T, AppError>`; once a handler produces an error nothing after the
//! `?` runs.
//!
//! Response bodies keep the shapes clients of the shop already parse:
//!
//! | Source | Body |
//! |---|---|
//! | identity gate | `{"error": "Unauthorized" \| "Invalid token"}` |
//! | signup/signin | `{"success": false, "error": ...}` |
//! | upload | `{"success": 0, "error": ...}` |
//! | everything else | `{"message": ..., "details": ...}` |

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::cart::CartError;
use crate::services::payments::PaymentError;
use crate::services::uploads::UploadError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Signup/signin failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Cart mutation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Checkout failed.
    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    /// Image upload failed.
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    /// No credential on a protected route.
    #[error("Unauthorized")]
    Unauthorized,

    /// Credential present but not valid.
    #[error("Invalid token")]
    InvalidToken,

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(err) => match err {
                // Signin failures are a normal answer, not an HTTP error.
                AuthError::InvalidCredentials => StatusCode::OK,
                e if e.is_client_error() => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Cart(err) => match err {
                CartError::UserNotFound => StatusCode::NOT_FOUND,
                CartError::Conflict => StatusCode::CONFLICT,
                CartError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Payment(err) => match err {
                PaymentError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                PaymentError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
                PaymentError::Http(_) | PaymentError::Provider { .. } | PaymentError::Parse(_) => {
                    StatusCode::BAD_GATEWAY
                }
                PaymentError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Upload(UploadError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Upload(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized | Self::InvalidToken => StatusCode::UNAUTHORIZED,
        }
    }

    /// Server-side faults are reported to Sentry; client mistakes are not.
    fn is_reportable(&self) -> bool {
        self.status().is_server_error()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        let reference = if self.is_reportable() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
            Some(format!("reference {event_id}"))
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
            None
        };

        // Don't expose internal error details to clients
        let body = match &self {
            Self::Unauthorized | Self::InvalidToken => json!({ "error": self.to_string() }),
            Self::Auth(err) => json!({ "success": false, "error": err.public_message() }),
            Self::Upload(err) => {
                let error = reference
                    .as_ref()
                    .map_or_else(|| err.to_string(), |_| "Failed to store image".to_owned());
                json!({ "success": 0, "error": error })
            }
            _ => {
                let (message, details) = match &self {
                    Self::NotFound(what) => ("Not found", what.clone()),
                    Self::Database(RepositoryError::NotFound) => {
                        ("Not found", "resource does not exist".to_owned())
                    }
                    Self::BadRequest(why) => ("Bad request", why.clone()),
                    Self::Cart(CartError::UserNotFound) => {
                        ("Not found", "user does not exist".to_owned())
                    }
                    Self::Cart(CartError::Conflict) => (
                        "Cart was modified concurrently",
                        "retry the request".to_owned(),
                    ),
                    Self::Payment(PaymentError::InvalidRequest(why)) => {
                        ("Invalid checkout request", why.clone())
                    }
                    Self::Payment(PaymentError::NotConfigured) => (
                        "Payments unavailable",
                        "no payment provider is configured".to_owned(),
                    ),
                    Self::Payment(
                        PaymentError::Http(_)
                        | PaymentError::Provider { .. }
                        | PaymentError::Parse(_),
                    ) => (
                        "Payment provider error",
                        reference.clone().unwrap_or_default(),
                    ),
                    _ => (
                        "Internal server error",
                        reference.clone().unwrap_or_default(),
                    ),
                };
                json!({ "message": message, "details": details })
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
