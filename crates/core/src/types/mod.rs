//! Core types for ShopLite.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod order_number;
pub mod price;
pub mod rating;
pub mod review;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use order_number::OrderNumber;
pub use price::{Price, PriceError};
pub use rating::{Rating, RatingError, RatingSummary};
pub use review::{REPORT_HIDE_THRESHOLD, helpfulness_score, status_after_reports};
pub use status::*;
