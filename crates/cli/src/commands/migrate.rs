//! Database migration commands.
//!
//! # Usage
//!
//! ```bash
//! wd-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! Migrations live in `crates/storefront/migrations/` and are embedded at
//! compile time.

use wardrobe_storefront::db;

use super::{CommandError, database_url};

/// Run storefront database migrations.
///
/// # Errors
///
/// Returns an error if the URL is missing, the database is unreachable or a
/// migration fails.
pub async fn storefront() -> Result<(), CommandError> {
    let database_url = database_url()?;

    tracing::info!("Connecting to storefront database...");
    let pool = db::create_pool(&database_url).await?;

    tracing::info!("Running storefront migrations...");
    sqlx::migrate!("../storefront/migrations").run(&pool).await?;

    tracing::info!("Storefront migrations complete!");
    Ok(())
}
