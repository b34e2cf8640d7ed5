//! Catalog queries and mutations.

use std::collections::VecDeque;
use std::sync::Arc;

use futures::{StreamExt, TryStreamExt};
use tracing::instrument;

use wardrobe_core::{Category, ProductId};

use crate::db::{CatalogStore, RepositoryError};
use crate::models::{NewProduct, Product};

/// Products shown per category on the popular strip.
pub const POPULAR_LIMIT: usize = 4;

/// Size of the new-collections window.
pub const NEW_COLLECTION_SIZE: usize = 8;

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
}

impl CatalogService {
    #[must_use]
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::SequenceExhausted` when no ids are left, or a
    /// store error.
    #[instrument(skip(self, product), fields(name = %product.name))]
    pub async fn add(&self, product: NewProduct) -> Result<Product, RepositoryError> {
        let product = self.store.insert_product(product).await?;
        tracing::info!(product_id = %product.id, "product added");
        Ok(product)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no product has `id`.
    #[instrument(skip(self))]
    pub async fn remove(&self, id: ProductId) -> Result<Product, RepositoryError> {
        let product = self.store.delete_product(id).await?;
        tracing::info!(product_id = %id, "product removed");
        Ok(product)
    }

    /// # Errors
    ///
    /// Returns a store error.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        self.store.get_product(id).await
    }

    /// All products in store order, optionally limited to one category.
    ///
    /// # Errors
    ///
    /// Returns the first store error hit while reading.
    pub async fn list(&self, category: Option<Category>) -> Result<Vec<Product>, RepositoryError> {
        self.store.stream_products(category).try_collect().await
    }

    /// The first `n` products of `category`, in store order.
    ///
    /// # Errors
    ///
    /// Returns the first store error hit while reading.
    pub async fn popular(
        &self,
        category: Category,
        n: usize,
    ) -> Result<Vec<Product>, RepositoryError> {
        self.store
            .stream_products(Some(category))
            .take(n)
            .try_collect()
            .await
    }

    /// The whole catalog minus its first product, keeping the last eight.
    ///
    /// # Errors
    ///
    /// Returns the first store error hit while reading.
    pub async fn new_collections(&self) -> Result<Vec<Product>, RepositoryError> {
        let mut window = VecDeque::with_capacity(NEW_COLLECTION_SIZE + 1);
        let mut products = self.store.stream_products(None).skip(1);
        while let Some(product) = products.next().await {
            window.push_back(product?);
            if window.len() > NEW_COLLECTION_SIZE {
                window.pop_front();
            }
        }
        Ok(window.into())
    }
}
