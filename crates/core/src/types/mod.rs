//! Core types for Wardrobe.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod category;
pub mod email;
pub mod id;
pub mod money;
pub mod phone;

pub use category::{Category, CategoryError};
pub use email::{Email, EmailError};
pub use id::*;
pub use money::{
    MoneyError, PRICE_INTEGER_DIGITS, TOTAL_INTEGER_DIGITS, check_amount, check_price,
    to_minor_units,
};
pub use phone::{Phone, PhoneError};
