//! Catalog product types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use wardrobe_core::{Category, ProductId, check_price};

/// A catalog product as returned by the listing endpoints.
///
/// `id` is the public catalog number from the id sequence, not the row key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Public image URL (usually one returned by `/upload`).
    pub image: String,
    pub category: Category,
    #[serde(with = "rust_decimal::serde::float")]
    pub new_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub old_price: Decimal,
    pub sizes: Vec<String>,
    pub available: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /addproduct` and the entries of a seed catalog file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub image: String,
    pub category: Category,
    #[serde(with = "rust_decimal::serde::float")]
    pub new_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub old_price: Decimal,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default = "default_available")]
    pub available: bool,
}

const fn default_available() -> bool {
    true
}

impl NewProduct {
    /// Check the fields a client controls.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason when the name or image is blank, or a
    /// price is negative, finer than a cent or too large to store.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name cannot be empty".to_owned());
        }
        if self.image.trim().is_empty() {
            return Err("image cannot be empty".to_owned());
        }
        check_price(self.new_price).map_err(|e| format!("new_price: {e}"))?;
        check_price(self.old_price).map_err(|e| format!("old_price: {e}"))?;
        Ok(())
    }

    /// Materialize the product once the store has assigned its id.
    #[must_use]
    pub fn into_product(self, id: ProductId, created_at: DateTime<Utc>) -> Product {
        Product {
            id,
            name: self.name,
            image: self.image,
            category: self.category,
            new_price: self.new_price,
            old_price: self.old_price,
            sizes: self.sizes,
            available: self.available,
            created_at,
        }
    }
}
