//! ShopLite Core - Shared domain types.
//!
//! This crate provides the types used across all ShopLite components:
//! - `storefront` - REST API server (catalog, cart, orders, payments, reviews)
//! - `cli` - Command-line tools for migrations, seeding, and admin management
//!
//! # Architecture
//!
//! The core crate contains only types and pure rules - no I/O, no database access,
//! no HTTP clients. Database support (sqlx `Type`/`Encode`/`Decode`) is gated behind
//! the `postgres` feature.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, prices, ratings, statuses, and order numbers

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
