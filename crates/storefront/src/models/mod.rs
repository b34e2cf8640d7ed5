//! Domain models for the storefront.
//!
//! These are validated domain objects, separate from database row types
//! (see `db::*` for the row structs and their conversions).

pub mod order;
pub mod principal;
pub mod product;
pub mod user;

pub use order::{DEFAULT_ORDER_STATUS, LineItem, NewOrder, Order};
pub use principal::Principal;
pub use product::{NewProduct, Product};
pub use user::{NewUser, StoredCart, User};
