//! Domain rule violations raised by the service layer.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::toss::TossError;

/// Errors returned by the catalog, cart, order, payment, review, and wishlist services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A referenced record does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The request is malformed or breaks a field rule.
    #[error("{0}")]
    Validation(String),

    /// The request conflicts with existing state (duplicate, wrong status, ...).
    #[error("{0}")]
    Conflict(String),

    /// Not enough stock for the requested quantity.
    #[error("Insufficient stock. Available: {available}")]
    InsufficientStock { available: i32 },

    /// The caller may not act on this record.
    #[error("{0}")]
    Forbidden(&'static str),

    /// The payment provider rejected or failed a call.
    #[error(transparent)]
    Payment(#[from] TossError),

    /// Repository/database error.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl ServiceError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }
}
