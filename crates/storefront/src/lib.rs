//! Wardrobe Storefront library.
//!
//! The JSON API behind the shop: catalog, accounts, carts, checkout and product
//! images. The binary in `main.rs` only wires configuration, telemetry and the
//! listener around [`routes::app`]; everything else lives here so it can be
//! driven in-process by the integration tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
