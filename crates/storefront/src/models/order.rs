//! Orders recorded when a checkout session is created.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use wardrobe_core::{OrderId, UserId};

/// Status every new order starts in.
pub const DEFAULT_ORDER_STATUS: &str = "Order under process";

/// A checkout line as sent by the client: `{name, price, quantity?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    /// Unit price in major units.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
}

impl LineItem {
    /// Quantity to charge; absent means 1.
    #[must_use]
    pub fn effective_quantity(&self) -> u32 {
        self.quantity.unwrap_or(1)
    }
}

/// A persisted order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<LineItem>,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub address: Option<serde_json::Value>,
    pub status: String,
    /// Flipped by the provider's payment confirmation, which is handled outside
    /// this service.
    pub payment: bool,
    pub checkout_session_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An order to insert.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub items: Vec<LineItem>,
    pub amount: Decimal,
    pub address: Option<serde_json::Value>,
    pub checkout_session_id: Option<String>,
}
