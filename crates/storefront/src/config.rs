//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`; not needed with `STOREFRONT_STORE=memory`)
//! - `STOREFRONT_TOKEN_SECRET` - Token signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `STOREFRONT_STORE` - `postgres` (default) or `memory`
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 4000)
//! - `STOREFRONT_BASE_URL` - Public URL, used for image links (default: `http://localhost:4000`)
//! - `STOREFRONT_TOKEN_TTL_SECS` - Token lifetime (default: 7 days)
//! - `STOREFRONT_UPLOAD_DIR` - Image directory (default: `upload/images`)
//! - `STOREFRONT_RATE_LIMIT` - Rate limit signup/signin (default: true)
//! - `STOREFRONT_ARGON2_MEMORY_KIB`, `STOREFRONT_ARGON2_ITERATIONS`,
//!   `STOREFRONT_ARGON2_PARALLELISM` - Password hashing cost
//! - `STOREFRONT_LOG_FORMAT` - `pretty` (default) or `json`
//! - `STRIPE_SECRET_KEY` - Enables checkout when set
//! - `STRIPE_API_BASE` - Stripe API URL (default: `https://api.stripe.com`)
//! - `STRIPE_CURRENCY` - Checkout currency (default: usd)
//! - `STOREFRONT_CHECKOUT_SUCCESS_URL`, `STOREFRONT_CHECKOUT_CANCEL_URL` -
//!   Where the provider sends the shopper back
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_TOKEN_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_TOKEN_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Where catalog, accounts and orders live.
#[derive(Clone)]
pub enum StoreBackend {
    Postgres { database_url: SecretString },
    Memory,
}

impl std::fmt::Debug for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Postgres { .. } => f
                .debug_struct("Postgres")
                .field("database_url", &"[REDACTED]")
                .finish(),
            Self::Memory => f.write_str("Memory"),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("expected `pretty` or `json`, got `{other}`")),
        }
    }
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordHashingConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordHashingConfig {
    fn default() -> Self {
        Self {
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

/// Stripe API credentials.
///
/// Implements `Debug` manually to redact the secret key.
#[derive(Clone)]
pub struct StripeConfig {
    pub secret_key: SecretString,
    pub api_base: String,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Provider-independent checkout settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutConfig {
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    pub store: StoreBackend,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Token signing secret
    pub token_secret: SecretString,
    pub token_ttl: Duration,
    /// Directory uploaded images are written to and served from
    pub upload_dir: PathBuf,
    /// Apply rate limiting to signup/signin
    pub rate_limit: bool,
    pub password_hashing: PasswordHashingConfig,
    /// Payment provider; checkout answers 503 without it
    pub stripe: Option<StripeConfig>,
    pub checkout: CheckoutConfig,
    pub log_format: LogFormat,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_source(&EnvSource::Process)
    }

    /// Load configuration from an explicit set of variables.
    ///
    /// # Errors
    ///
    /// Same as [`StorefrontConfig::from_env`].
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_source(&EnvSource::Map(vars))
    }

    fn from_source(env: &EnvSource<'_>) -> Result<Self, ConfigError> {
        let store = match env.or_default("STOREFRONT_STORE", "postgres").as_str() {
            "memory" => StoreBackend::Memory,
            "postgres" => StoreBackend::Postgres {
                database_url: env.database_url("STOREFRONT_DATABASE_URL")?,
            },
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "STOREFRONT_STORE".to_owned(),
                    format!("expected `postgres` or `memory`, got `{other}`"),
                ));
            }
        };

        let host = env.parsed("STOREFRONT_HOST", "127.0.0.1")?;
        let port = env.parsed("STOREFRONT_PORT", "4000")?;
        let base_url = env.or_default("STOREFRONT_BASE_URL", "http://localhost:4000");
        url::Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("STOREFRONT_BASE_URL".to_owned(), e.to_string())
        })?;

        let token_secret = env.validated_secret("STOREFRONT_TOKEN_SECRET")?;
        validate_token_secret(&token_secret, "STOREFRONT_TOKEN_SECRET")?;
        let token_ttl = Duration::from_secs(env.parsed(
            "STOREFRONT_TOKEN_TTL_SECS",
            &DEFAULT_TOKEN_TTL_SECS.to_string(),
        )?);

        let defaults = PasswordHashingConfig::default();
        let password_hashing = PasswordHashingConfig {
            memory_kib: env.parsed(
                "STOREFRONT_ARGON2_MEMORY_KIB",
                &defaults.memory_kib.to_string(),
            )?,
            iterations: env.parsed(
                "STOREFRONT_ARGON2_ITERATIONS",
                &defaults.iterations.to_string(),
            )?,
            parallelism: env.parsed(
                "STOREFRONT_ARGON2_PARALLELISM",
                &defaults.parallelism.to_string(),
            )?,
        };

        let stripe = match env.optional("STRIPE_SECRET_KEY") {
            Some(key) => {
                validate_secret_strength(&key, "STRIPE_SECRET_KEY")?;
                Some(StripeConfig {
                    secret_key: SecretString::from(key),
                    api_base: env.or_default("STRIPE_API_BASE", "https://api.stripe.com"),
                })
            }
            None => None,
        };

        let checkout = CheckoutConfig {
            currency: env.or_default("STRIPE_CURRENCY", "usd").to_ascii_lowercase(),
            success_url: env.or_default(
                "STOREFRONT_CHECKOUT_SUCCESS_URL",
                "http://localhost:5173/success",
            ),
            cancel_url: env.or_default(
                "STOREFRONT_CHECKOUT_CANCEL_URL",
                "http://localhost:5173/cancel",
            ),
        };

        Ok(Self {
            store,
            host,
            port,
            base_url,
            token_secret,
            token_ttl,
            upload_dir: PathBuf::from(env.or_default("STOREFRONT_UPLOAD_DIR", "upload/images")),
            rate_limit: env.parsed("STOREFRONT_RATE_LIMIT", "true")?,
            password_hashing,
            stripe,
            checkout,
            log_format: env.parsed("STOREFRONT_LOG_FORMAT", "pretty")?,
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Where variables are read from.
enum EnvSource<'a> {
    Process,
    Map(&'a HashMap<String, String>),
}

impl EnvSource<'_> {
    /// Get an optional variable; empty values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        let value = match self {
            Self::Process => std::env::var(key).ok(),
            Self::Map(vars) => vars.get(key).cloned(),
        };
        value.filter(|v| !v.trim().is_empty())
    }

    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_owned()))
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_owned())
    }

    /// Parse a variable (or its default).
    fn parsed<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.or_default(key, default)
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_owned(), e.to_string()))
    }

    /// Get database URL with fallback to generic `DATABASE_URL`.
    fn database_url(&self, primary_key: &str) -> Result<SecretString, ConfigError> {
        self.optional(primary_key)
            .or_else(|| self.optional("DATABASE_URL"))
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar(primary_key.to_owned()))
    }

    /// Load and validate a secret.
    fn validated_secret(&self, key: &str) -> Result<SecretString, ConfigError> {
        let value = self.required(key)?;
        validate_secret_strength(&value, key)?;
        Ok(SecretString::from(value))
    }
}

/// Validate that a token secret meets minimum length requirements.
fn validate_token_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_TOKEN_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_TOKEN_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}
