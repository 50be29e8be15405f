//! External order numbers.
//!
//! Order numbers are what the payment provider sees as `orderId`, so they are
//! opaque, unique, and safe to put in URLs.

use core::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix shared by all generated order numbers.
pub const ORDER_NUMBER_PREFIX: &str = "ORDER_";

const RANDOM_LEN: usize = 12;

/// An order number such as `ORDER_3F9A1C0B7E2D`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Generate a fresh order number from a random UUID.
    #[must_use]
    pub fn generate() -> Self {
        let hex = Uuid::new_v4().simple().to_string();
        let random: String = hex.chars().take(RANDOM_LEN).collect();
        Self(format!("{ORDER_NUMBER_PREFIX}{}", random.to_uppercase()))
    }

    /// Wrap an existing order number (e.g. read back from the database or a request).
    #[must_use]
    pub fn from_string(value: String) -> Self {
        Self(value)
    }

    /// The order number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_format() {
        let number = OrderNumber::generate();
        let suffix = number
            .as_str()
            .strip_prefix(ORDER_NUMBER_PREFIX)
            .unwrap_or_default();
        assert_eq!(suffix.len(), RANDOM_LEN);
        assert!(
            suffix
                .chars()
                .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
        );
    }

    #[test]
    fn test_generated_numbers_differ() {
        assert_ne!(OrderNumber::generate(), OrderNumber::generate());
    }
}
