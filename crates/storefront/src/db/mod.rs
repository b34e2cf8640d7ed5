//! Persistence for the storefront.
//!
//! # Stores
//!
//! Handlers talk to three repository traits so the same service code runs
//! against either backend:
//!
//! - [`CatalogStore`] - products and the product id sequence
//! - [`UserStore`] - accounts and their embedded carts
//! - [`OrderStore`] - orders recorded at checkout
//!
//! [`postgres`] implements them on `PostgreSQL` (schema `storefront`);
//! [`memory`] implements them in process for local development and tests.
//!
//! # Migrations
//!
//! Migrations live in `crates/storefront/migrations/` and are run via:
//! ```bash
//! cargo run -p wardrobe-cli -- migrate
//! ```

pub mod memory;
pub mod orders;
pub mod products;
pub mod users;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use wardrobe_core::{Cart, Category, Email, Phone, ProductId, UserId};

use crate::models::{NewOrder, NewProduct, NewUser, Order, Product, StoredCart, User};

pub use memory::MemoryStore;
pub use orders::PgOrderStore;
pub use products::PgCatalogStore;
pub use users::PgUserStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Unique constraint violation; carries the offending field (`email`, `phone`).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// Conditional write lost against a concurrent writer.
    #[error("stale write: expected version {expected}")]
    VersionMismatch { expected: i64 },

    /// The product id sequence ran out of `i32` values.
    #[error("product id sequence exhausted")]
    SequenceExhausted,
}

/// Lazy, store-ordered stream of products.
pub type ProductStream<'a> = BoxStream<'a, Result<Product, RepositoryError>>;

/// Product catalog.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Insert a product, assigning it the next id from the sequence.
    async fn insert_product(&self, product: NewProduct) -> Result<Product, RepositoryError>;

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Delete a product, returning it. `RepositoryError::NotFound` if absent.
    async fn delete_product(&self, id: ProductId) -> Result<Product, RepositoryError>;

    /// Products in insertion order, optionally restricted to one category.
    fn stream_products(&self, category: Option<Category>) -> ProductStream<'_>;
}

/// Accounts and carts.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert an account. `RepositoryError::Conflict("email" | "phone")` on a
    /// uniqueness violation.
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError>;

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Account and password hash for signin.
    async fn find_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError>;

    async fn email_exists(&self, email: &Email) -> Result<bool, RepositoryError>;

    async fn phone_exists(&self, phone: &Phone) -> Result<bool, RepositoryError>;

    /// Current cart and its version; `None` if the user does not exist.
    async fn load_cart(&self, id: UserId) -> Result<Option<StoredCart>, RepositoryError>;

    /// Replace the whole cart if it is still at `expected_version`.
    ///
    /// Returns the new version. `RepositoryError::VersionMismatch` when another
    /// writer got there first, `RepositoryError::NotFound` for unknown users.
    async fn save_cart(
        &self,
        id: UserId,
        expected_version: i64,
        cart: &Cart,
    ) -> Result<i64, RepositoryError>;
}

/// Orders.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn create_order(&self, order: NewOrder) -> Result<Order, RepositoryError>;

    /// A user's orders, oldest first.
    async fn orders_for_user(&self, user: UserId) -> Result<Vec<Order>, RepositoryError>;
}

/// The repositories a running storefront uses, plus the pool (if any) for
/// readiness checks.
#[derive(Clone)]
pub struct Stores {
    pub catalog: Arc<dyn CatalogStore>,
    pub users: Arc<dyn UserStore>,
    pub orders: Arc<dyn OrderStore>,
    pool: Option<PgPool>,
}

impl Stores {
    /// `PostgreSQL`-backed repositories sharing one pool.
    #[must_use]
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            catalog: Arc::new(PgCatalogStore::new(pool.clone())),
            users: Arc::new(PgUserStore::new(pool.clone())),
            orders: Arc::new(PgOrderStore::new(pool.clone())),
            pool: Some(pool),
        }
    }

    /// In-process repositories backed by one [`MemoryStore`].
    #[must_use]
    pub fn memory() -> Self {
        Self::from_memory(Arc::new(MemoryStore::new()))
    }

    /// Wrap an existing [`MemoryStore`] (lets tests inspect it directly).
    #[must_use]
    pub fn from_memory(store: Arc<MemoryStore>) -> Self {
        Self {
            catalog: store.clone(),
            users: store.clone(),
            orders: store,
            pool: None,
        }
    }

    /// Verify the backing database answers. Always `Ok` for the memory store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the probe query fails.
    pub async fn ping(&self) -> Result<(), RepositoryError> {
        if let Some(pool) = &self.pool {
            sqlx::query("SELECT 1").execute(pool).await?;
        }
        Ok(())
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
