//! `PostgreSQL` order repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::instrument;

use wardrobe_core::{OrderId, UserId};

use super::{OrderStore, RepositoryError};
use crate::models::{LineItem, NewOrder, Order};

const ORDER_COLUMNS: &str =
    "id, user_id, items, amount, address, status, payment, checkout_session_id, created_at";

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    items: Json<Vec<LineItem>>,
    amount: Decimal,
    address: Option<Json<serde_json::Value>>,
    status: String,
    payment: bool,
    checkout_session_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            items: row.items.0,
            amount: row.amount,
            address: row.address.map(|a| a.0),
            status: row.status,
            payment: row.payment,
            checkout_session_id: row.checkout_session_id,
            created_at: row.created_at,
        }
    }
}

/// Order repository backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    #[instrument(skip(self, order), fields(user_id = %order.user_id, amount = %order.amount))]
    async fn create_order(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        let row: OrderRow = sqlx::query_as(&format!(
            r"
            INSERT INTO storefront.checkout_order
                (user_id, items, amount, address, checkout_session_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(order.user_id)
        .bind(Json(&order.items))
        .bind(order.amount)
        .bind(order.address.as_ref().map(Json))
        .bind(&order.checkout_session_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn orders_for_user(&self, user: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM storefront.checkout_order WHERE user_id = $1 ORDER BY id"
        ))
        .bind(user)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Order::from).collect())
    }
}
