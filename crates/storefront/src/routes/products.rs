//! Catalog route handlers.

use axum::{
    Json,
    extract::{Path, State},
    routing::{MethodRouter, get},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use wardrobe_core::{Category, ProductId};

use super::ApiJson;
use crate::db::RepositoryError;
use crate::error::{AppError, Result};
use crate::models::{NewProduct, Product};
use crate::services::catalog::POPULAR_LIMIT;
use crate::state::AppState;

/// `POST /addproduct`
#[instrument(skip(state, product), fields(name = %product.name))]
pub async fn add_product(
    State(state): State<AppState>,
    ApiJson(product): ApiJson<NewProduct>,
) -> Result<Json<Value>> {
    product.validate().map_err(AppError::BadRequest)?;
    let product = state.catalog().add(product).await?;

    Ok(Json(json!({
        "success": 1,
        "id": product.id,
        "name": product.name,
    })))
}

#[derive(Debug, Deserialize)]
pub struct RemoveProduct {
    pub id: ProductId,
}

/// `POST /removeproduct`
#[instrument(skip(state))]
pub async fn remove_product(
    State(state): State<AppState>,
    ApiJson(RemoveProduct { id }): ApiJson<RemoveProduct>,
) -> Result<Json<Value>> {
    let removed = state.catalog().remove(id).await.map_err(|e| match e {
        RepositoryError::NotFound => AppError::NotFound(format!("product {id} does not exist")),
        other => other.into(),
    })?;

    Ok(Json(json!({
        "success": 1,
        "message": format!("Product {} removed", removed.name),
        "id": removed.id,
        "name": removed.name,
    })))
}

/// `GET /allproducts`
pub async fn all_products(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    Ok(Json(state.catalog().list(None).await?))
}

/// `GET /women`, `GET /men`, `GET /kids`
pub fn category_products(category: Category) -> MethodRouter<AppState> {
    get(move |State(state): State<AppState>| async move {
        let products = state.catalog().list(Some(category)).await?;
        Ok::<_, AppError>(Json(products))
    })
}

/// `GET /popular/{category}`: the first four products of the category.
pub async fn popular(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Json<Vec<Product>>> {
    let category = category
        .parse::<Category>()
        .map_err(|e| AppError::NotFound(e.to_string()))?;
    Ok(Json(state.catalog().popular(category, POPULAR_LIMIT).await?))
}

/// `GET /newcollections`
pub async fn new_collections(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    Ok(Json(state.catalog().new_collections().await?))
}
