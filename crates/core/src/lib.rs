//! Wardrobe Core - Shared domain types.
//!
//! This crate provides the types used across all Wardrobe components:
//! - `storefront` - Public JSON API (catalog, carts, signup/signin, checkout)
//! - `cli` - Command-line tools for migrations and catalog seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database access,
//! no HTTP clients. Cart reconciliation lives here so that every store backend
//! applies exactly the same rules.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, emails, phone numbers, categories, money
//! - [`cart`] - Cart items and add/remove reconciliation
//! - [`sequence`] - Atomic product id sequence

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod sequence;
pub mod types;

pub use cart::{Cart, CartItem, DEFAULT_SIZE};
pub use sequence::ProductIdSequence;
pub use types::*;
