//! Cart route handlers. All three require a signed-in user.

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use wardrobe_core::{Cart, ProductId};

use super::ApiJson;
use crate::error::Result;
use crate::middleware::RequireUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartChange {
    pub item_id: ProductId,
    #[serde(default)]
    pub size: Option<String>,
}

fn cart_response(cart: Cart) -> Json<Value> {
    Json(json!({ "success": true, "cartData": cart }))
}

/// `POST /addtocart`
#[instrument(skip(state), fields(user_id = %user.id))]
pub async fn add_to_cart(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    ApiJson(change): ApiJson<CartChange>,
) -> Result<Json<Value>> {
    let cart = state
        .carts()
        .add_item(user.id, change.item_id, change.size.as_deref())
        .await?;
    Ok(cart_response(cart))
}

/// `POST /removefromcart`
#[instrument(skip(state), fields(user_id = %user.id))]
pub async fn remove_from_cart(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    ApiJson(change): ApiJson<CartChange>,
) -> Result<Json<Value>> {
    let cart = state.carts().remove_item(user.id, change.item_id).await?;
    Ok(cart_response(cart))
}

/// `POST /getcartdata`
pub async fn cart_data(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<Cart>> {
    Ok(Json(state.carts().get(user.id).await?))
}
