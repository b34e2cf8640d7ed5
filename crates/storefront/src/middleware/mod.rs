//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Security headers
//! 5. CORS
//! 6. Rate limiting (governor) on signup/signin, checkout and upload
//!
//! The identity gate is not a layer: protected handlers take the
//! [`RequireUser`] extractor.

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;

pub use auth::{AUTH_TOKEN_HEADER, RequireUser};
pub use rate_limit::{api_rate_limiter, auth_rate_limiter};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
