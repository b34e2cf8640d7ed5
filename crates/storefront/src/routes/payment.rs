//! Checkout session creation.

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use super::ApiJson;
use crate::error::Result;
use crate::middleware::RequireUser;
use crate::models::LineItem;
use crate::state::AppState;

/// Either `{items, address?}` or a bare array of line items.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PaymentBody {
    Order {
        items: Vec<LineItem>,
        #[serde(default)]
        address: Option<Value>,
    },
    Items(Vec<LineItem>),
}

impl PaymentBody {
    fn into_parts(self) -> (Vec<LineItem>, Option<Value>) {
        match self {
            Self::Order { items, address } => (items, address),
            Self::Items(items) => (items, None),
        }
    }
}

/// `POST /payment`: answers `{id}` with the provider's session id.
#[instrument(skip(state, body), fields(user_id = %user.id))]
pub async fn create_session(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    ApiJson(body): ApiJson<PaymentBody>,
) -> Result<Json<Value>> {
    let (items, address) = body.into_parts();
    let session = state.checkout().checkout(user.id, items, address).await?;
    Ok(Json(json!({ "id": session.id })))
}
