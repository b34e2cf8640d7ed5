//! Seed the catalog from a YAML file.
//!
//! Products go through the same store as `POST /addproduct`, so they receive
//! ids from the catalog sequence in file order.
//!
//! ```yaml
//! products:
//!   - name: Striped Flutter Sleeve Blouse
//!     image: http://localhost:4000/images/product_1.png
//!     category: women
//!     new_price: 50.0
//!     old_price: 80.5
//!     sizes: [S, M, L]
//! ```

use std::path::Path;

use serde::Deserialize;
use tracing::{error, info};

use wardrobe_storefront::db::{self, CatalogStore, PgCatalogStore};
use wardrobe_storefront::models::NewProduct;

use super::database_url;

#[derive(Debug, Deserialize)]
struct CatalogFile {
    products: Vec<NewProduct>,
}

/// Parse a catalog file and collect every invalid entry.
fn parse_catalog(content: &str) -> Result<Vec<NewProduct>, Box<dyn std::error::Error>> {
    let file: CatalogFile = serde_yaml::from_str(content)?;

    let errors: Vec<String> = file
        .products
        .iter()
        .enumerate()
        .filter_map(|(i, product)| {
            product
                .validate()
                .err()
                .map(|why| format!("product #{} ({}): {why}", i + 1, product.name))
        })
        .collect();

    if !errors.is_empty() {
        error!("Catalog validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    Ok(file.products)
}

/// Insert every product in `file_path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or fails validation, the
/// database URL is missing, or an insert fails.
pub async fn catalog(file_path: &Path, dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !file_path.exists() {
        return Err(format!("File not found: {}", file_path.display()).into());
    }

    info!(path = %file_path.display(), "Loading catalog from file");
    let content = tokio::fs::read_to_string(file_path).await?;
    let products = parse_catalog(&content)?;
    info!(products = products.len(), "Catalog validated successfully");

    if dry_run {
        info!("Dry run, nothing inserted");
        return Ok(());
    }

    let pool = db::create_pool(&database_url()?).await?;
    info!("Connected to database");

    let store = PgCatalogStore::new(pool);
    for product in products {
        let product = store.insert_product(product).await?;
        info!(id = %product.id, name = %product.name, "Inserted product");
    }

    info!("Seeding complete!");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use wardrobe_core::Category;

    use super::*;

    #[test]
    fn parses_catalog_file() {
        let products = parse_catalog(
            "products:
  - name: Blouse
    image: http://localhost:4000/images/a.png
    category: women
    new_price: 50.0
    old_price: 80.5
  - name: Jacket
    image: http://localhost:4000/images/b.png
    category: kid
    new_price: 85
    old_price: 120
    sizes: [S, M]
",
        )
        .unwrap();

        assert_eq!(products.len(), 2);
        assert_eq!(products[0].category, Category::Women);
        assert!(products[0].available);
        assert_eq!(products[1].sizes, vec!["S", "M"]);
    }

    #[test]
    fn rejects_invalid_entries() {
        let result = parse_catalog(
            "products:
  - name: ''
    image: x.png
    category: men
    new_price: 1
    old_price: 1
",
        );
        assert!(result.is_err());
    }
}
