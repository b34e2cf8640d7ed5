//! `PostgreSQL` product repository.
//!
//! Public product ids come from `storefront.product_id_counter`, bumped in the
//! same transaction as the insert. The counter row lock serializes concurrent
//! inserts, so two requests can never receive the same id.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;

use wardrobe_core::{Category, ProductId};

use super::{CatalogStore, ProductStream, RepositoryError};
use crate::models::{NewProduct, Product};

const PRODUCT_COLUMNS: &str =
    "id, name, image, category, new_price, old_price, sizes, available, created_at";

/// Row shape of `storefront.product` (minus the storage key).
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    image: String,
    category: String,
    new_price: Decimal,
    old_price: Decimal,
    sizes: Vec<String>,
    available: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let category = row.category.parse::<Category>().map_err(|e| {
            RepositoryError::DataCorruption(format!("product {}: {e}", row.id))
        })?;

        Ok(Self {
            id: row.id,
            name: row.name,
            image: row.image,
            category,
            new_price: row.new_price,
            old_price: row.old_price,
            sizes: row.sizes,
            available: row.available,
            created_at: row.created_at,
        })
    }
}

/// Product repository backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    #[instrument(skip(self, product), fields(name = %product.name))]
    async fn insert_product(&self, product: NewProduct) -> Result<Product, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let (last_id,): (i32,) = sqlx::query_as(
            r"
            UPDATE storefront.product_id_counter
            SET last_id = last_id + 1
            WHERE singleton
            RETURNING last_id
            ",
        )
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e {
            // 22003: numeric_value_out_of_range
            sqlx::Error::Database(ref db_err) if db_err.code().as_deref() == Some("22003") => {
                RepositoryError::SequenceExhausted
            }
            other => RepositoryError::Database(other),
        })?;

        let row: ProductRow = sqlx::query_as(&format!(
            r"
            INSERT INTO storefront.product
                (id, name, image, category, new_price, old_price, sizes, available)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(ProductId::new(last_id))
        .bind(&product.name)
        .bind(&product.image)
        .bind(product.category.as_str())
        .bind(product.new_price)
        .bind(product.old_price)
        .bind(&product.sizes)
        .bind(product.available)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Product::try_from(row)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.product WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Product::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn delete_product(&self, id: ProductId) -> Result<Product, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "DELETE FROM storefront.product WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map_or(Err(RepositoryError::NotFound), Product::try_from)
    }

    fn stream_products(&self, category: Option<Category>) -> ProductStream<'_> {
        sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, name, image, category, new_price, old_price, sizes, available, created_at
            FROM storefront.product
            WHERE ($1::text IS NULL OR category = $1)
            ORDER BY key
            ",
        )
        .bind(category.map(Category::as_str))
        .fetch(&self.pool)
        .map(|row| row.map_err(RepositoryError::from).and_then(Product::try_from))
        .boxed()
    }
}
