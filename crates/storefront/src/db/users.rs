//! `PostgreSQL` account repository.
//!
//! The cart is stored inline on the account row as JSONB together with a
//! `cart_version` counter. Cart writes only land if the version still matches
//! the one the caller read.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::instrument;

use wardrobe_core::{Cart, CartItem, Email, Phone, UserId};

use super::{RepositoryError, UserStore};
use crate::models::{NewUser, StoredCart, User};

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: UserId,
    name: String,
    email: Email,
    phone: Phone,
    gender: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            gender: row.gender,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

#[derive(Debug, sqlx::FromRow)]
struct CartRow {
    cart_data: Json<Vec<CartItem>>,
    cart_version: i64,
}

/// Map a unique violation to the field it guards.
fn map_unique_violation(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        let field = match db_err.constraint() {
            Some("user_account_phone_key") => "phone",
            _ => "email",
        };
        return RepositoryError::Conflict(field.to_owned());
    }
    RepositoryError::Database(e)
}

/// Account repository backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    #[instrument(skip(self, user), fields(email = %user.email))]
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let row: UserRow = sqlx::query_as(
            r"
            INSERT INTO storefront.user_account (name, email, phone, gender, password_hash)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, email, phone, gender, created_at
            ",
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.gender)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        Ok(row.into())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(
            r"
            SELECT id, name, email, phone, gender, created_at
            FROM storefront.user_account
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    async fn find_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row: Option<CredentialRow> = sqlx::query_as(
            r"
            SELECT id, name, email, phone, gender, created_at, password_hash
            FROM storefront.user_account
            WHERE email = $1
            ",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| (r.user.into(), r.password_hash)))
    }

    async fn email_exists(&self, email: &Email) -> Result<bool, RepositoryError> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM storefront.user_account WHERE email = $1)",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn phone_exists(&self, phone: &Phone) -> Result<bool, RepositoryError> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM storefront.user_account WHERE phone = $1)",
        )
        .bind(phone)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn load_cart(&self, id: UserId) -> Result<Option<StoredCart>, RepositoryError> {
        let row: Option<CartRow> = sqlx::query_as(
            "SELECT cart_data, cart_version FROM storefront.user_account WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| StoredCart {
            cart: Cart::from_items(r.cart_data.0),
            version: r.cart_version,
        }))
    }

    #[instrument(skip(self, cart), fields(entries = cart.len()))]
    async fn save_cart(
        &self,
        id: UserId,
        expected_version: i64,
        cart: &Cart,
    ) -> Result<i64, RepositoryError> {
        let updated: Option<(i64,)> = sqlx::query_as(
            r"
            UPDATE storefront.user_account
            SET cart_data = $1, cart_version = cart_version + 1
            WHERE id = $2 AND cart_version = $3
            RETURNING cart_version
            ",
        )
        .bind(Json(cart.items()))
        .bind(id)
        .bind(expected_version)
        .fetch_optional(&self.pool)
        .await?;

        if let Some((version,)) = updated {
            return Ok(version);
        }

        // Nothing matched: either the user is gone or someone else wrote first.
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM storefront.user_account WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;

        if exists {
            Err(RepositoryError::VersionMismatch {
                expected: expected_version,
            })
        } else {
            Err(RepositoryError::NotFound)
        }
    }
}
