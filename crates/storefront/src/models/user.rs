//! User domain types.

use chrono::{DateTime, Utc};

use wardrobe_core::{Cart, Email, Phone, UserId};

/// A shopper account (domain type). The password hash never leaves the
/// repository layer except through `UserStore::find_credentials`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub phone: Phone,
    pub gender: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A validated signup, ready to insert. New accounts start with an empty cart.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: Email,
    pub phone: Phone,
    pub gender: Option<String>,
    /// Argon2 PHC string.
    pub password_hash: String,
}

/// A user's cart together with the revision it was read at.
///
/// Writes are conditional on `version` so a concurrent writer cannot be
/// silently overwritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCart {
    pub cart: Cart,
    pub version: i64,
}
