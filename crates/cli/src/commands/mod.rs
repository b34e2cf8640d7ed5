//! CLI subcommands.

pub mod migrate;
pub mod seed;

use secrecy::SecretString;

/// Storefront database URL from `STOREFRONT_DATABASE_URL`, falling back to
/// `DATABASE_URL`. Loads `.env` first.
///
/// # Errors
///
/// Returns `CommandError::MissingEnvVar` if neither variable is set.
pub fn database_url() -> Result<SecretString, CommandError> {
    dotenvy::dotenv().ok();

    std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("STOREFRONT_DATABASE_URL"))
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}
