//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - signup/signin, password hashing, signed tokens
//! - `catalog` - product listing and id-assigned inserts
//! - `cart` - serialized, version-checked cart mutations
//! - `payments` - checkout sessions with the payment provider
//! - `uploads` - product image storage

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod payments;
pub mod uploads;
