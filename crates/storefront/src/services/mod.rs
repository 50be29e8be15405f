//! Business logic services for the storefront.
//!
//! Services borrow the pool (and whatever shared client or cache they need)
//! for the lifetime of a request. Handlers build them on demand from
//! [`AppState`](crate::state::AppState).
//!
//! # Services
//!
//! - `auth` - Signup, login, and JWT verification
//! - `users` - Account management
//! - `categories` / `products` - Catalog, backed by [`CatalogCache`]
//! - `cart` - Per-user cart lines
//! - `orders` - Order placement, status changes, and stock accounting
//! - `payments` - Toss Payments confirm/cancel flow
//! - `reviews` - Reviews, likes, reports, and moderation
//! - `wishlist` - Saved products
//! - `files` - Image uploads on local disk

pub mod auth;
pub mod cart;
pub mod catalog_cache;
pub mod categories;
mod error;
pub mod files;
pub mod orders;
pub mod payments;
pub mod products;
pub mod reviews;
pub mod toss;
pub mod users;
pub mod wishlist;

pub use catalog_cache::CatalogCache;
pub use error::ServiceError;
