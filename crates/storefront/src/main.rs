//! Wardrobe Storefront - JSON API for the shop.
//!
//! This binary serves the public API on port 4000.
//!
//! # Architecture
//!
//! - Axum web framework, JSON in and out
//! - `PostgreSQL` (or an in-process store for demos) for catalog, accounts, carts and orders
//! - Stripe Checkout for payments
//! - Product images stored on local disk and served from `/images`

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::SocketAddr;

use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wardrobe_storefront::config::{LogFormat, StoreBackend, StorefrontConfig};
use wardrobe_storefront::db::{self, Stores};
use wardrobe_storefront::routes;
use wardrobe_storefront::state::AppState;

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing(format: LogFormat) {
    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "wardrobe_storefront=info,tower_http=debug".into());

    let (json_layer, text_layer) = match format {
        LogFormat::Json => (Some(tracing_subscriber::fmt::layer().json()), None),
        LogFormat::Pretty => (None, Some(tracing_subscriber::fmt::layer())),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = StorefrontConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);
    init_tracing(config.log_format);

    let stores = match &config.store {
        StoreBackend::Postgres { database_url } => {
            let pool = db::create_pool(database_url)
                .await
                .expect("Failed to create database pool");
            tracing::info!("Database pool created");

            // NOTE: Migrations are NOT run automatically on startup.
            // Run them explicitly via: cargo run -p wardrobe-cli -- migrate
            Stores::postgres(pool)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on restart");
            Stores::memory()
        }
    };

    let state = AppState::new(config.clone(), stores)
        .expect("Failed to initialize application state");
    if config.stripe.is_none() {
        tracing::warn!("STRIPE_SECRET_KEY not set; /payment answers 503");
    }

    let app = routes::app(state);

    // Start server
    let addr = config.socket_addr();
    tracing::info!("storefront listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server error");
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
