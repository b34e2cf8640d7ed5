//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (store reachable)
//!
//! # Catalog
//! POST /addproduct             - Create a product, assigns the next id
//! POST /removeproduct          - Delete a product by id
//! GET  /allproducts            - Every product in id order
//! GET  /women, /men, /kids     - Products of one category
//! GET  /popular/{category}     - First four products of a category
//! GET  /newcollections         - Latest eight products after the first
//!
//! # Accounts (rate limited)
//! POST /signup                 - Create account, returns token
//! POST /signin                 - Check credentials, returns token
//!
//! # Cart (requires auth-token)
//! POST /addtocart              - Add one unit of a product
//! POST /removefromcart         - Remove one unit of a product
//! POST /getcartdata            - Current cart
//!
//! # Checkout and media
//! POST /payment                - Create a checkout session (requires auth-token)
//! POST /upload                 - Store a product image
//! GET  /images/{file}          - Serve stored images
//! ```

pub mod auth;
pub mod cart;
pub mod health;
pub mod payment;
pub mod products;
pub mod upload;

use std::time::Duration;

use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRequest, rejection::JsonRejection},
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use wardrobe_core::Category;

use crate::error::AppError;
use crate::middleware::rate_limit::RateLimiterLayer;
use crate::middleware::{
    api_rate_limiter, auth_rate_limiter, request_id_middleware, security_headers_middleware,
};
use crate::state::AppState;

/// Largest accepted image upload.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// JSON body extractor whose rejections render as `AppError::BadRequest`.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

fn rate_limited(
    router: Router<AppState>,
    enabled: bool,
    layer: impl FnOnce() -> RateLimiterLayer,
) -> Router<AppState> {
    if enabled {
        router.layer(layer())
    } else {
        router
    }
}

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    let router = Router::new()
        .route("/addproduct", post(products::add_product))
        .route("/removeproduct", post(products::remove_product))
        .route("/allproducts", get(products::all_products))
        .route("/popular/{category}", get(products::popular))
        .route("/newcollections", get(products::new_collections));

    Category::ALL.into_iter().fold(router, |router, category| {
        router.route(
            &format!("/{}", category.route_segment()),
            products::category_products(category),
        )
    })
}

/// Create the signup/signin router.
pub fn auth_routes(rate_limit: bool) -> Router<AppState> {
    let router = Router::new()
        .route("/signup", post(auth::signup))
        .route("/signin", post(auth::signin));
    rate_limited(router, rate_limit, auth_rate_limiter)
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/addtocart", post(cart::add_to_cart))
        .route("/removefromcart", post(cart::remove_from_cart))
        .route("/getcartdata", post(cart::cart_data))
}

/// Create the checkout and upload router.
pub fn checkout_routes(rate_limit: bool) -> Router<AppState> {
    let router = Router::new()
        .route("/payment", post(payment::create_session))
        .route(
            "/upload",
            post(upload::upload_image).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        );
    rate_limited(router, rate_limit, api_rate_limiter)
}

/// Create all API routes for the storefront.
pub fn routes(rate_limit: bool) -> Router<AppState> {
    Router::new()
        .merge(catalog_routes())
        .merge(auth_routes(rate_limit))
        .merge(cart_routes())
        .merge(checkout_routes(rate_limit))
}

/// The complete application: API routes, health checks, image serving and the
/// middleware stack.
pub fn app(state: AppState) -> Router {
    let rate_limit = state.config().rate_limit;
    let upload_dir = state.config().upload_dir.clone();

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .merge(routes(rate_limit))
        .nest_service("/images", ServeDir::new(upload_dir))
        .layer(
            // Outermost first: CORS answers preflights before anything else runs.
            ServiceBuilder::new()
                .layer(CorsLayer::permissive())
                // Box the traced body so CORS's `ResBody: Default` bound is met.
                .map_response(|response: axum::http::Response<_>| {
                    response.map(axum::body::Body::new)
                })
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(|request: &axum::http::Request<_>| {
                            tracing::info_span!(
                                "http_request",
                                method = %request.method(),
                                uri = %request.uri(),
                                request_id = tracing::field::Empty,
                                user_id = tracing::field::Empty,
                                status = tracing::field::Empty,
                                latency_ms = tracing::field::Empty,
                            )
                        })
                        .on_response(
                            |response: &axum::http::Response<_>, latency: Duration, span: &Span| {
                                span.record("status", response.status().as_u16());
                                span.record(
                                    "latency_ms",
                                    u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                                );
                                DefaultOnResponse::default().on_response(response, latency, span);
                            },
                        ),
                )
                .layer(axum::middleware::from_fn(request_id_middleware))
                .layer(axum::middleware::from_fn(security_headers_middleware)),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}
