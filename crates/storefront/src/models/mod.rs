//! Domain models and API payloads.
//!
//! Row types derive `sqlx::FromRow` and double as response DTOs where the stored
//! shape already matches what clients see. Request types are validated in the
//! service layer, not here.

pub mod cart;
pub mod category;
pub mod order;
pub mod payment;
pub mod product;
pub mod review;
pub mod user;
pub mod wishlist;

use serde::Serialize;

/// Standard `{success, message, data}` envelope used by the review endpoints.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// A successful envelope carrying `data`.
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

/// One page of results.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub total_elements: i64,
    pub total_pages: i64,
    pub current_page: i64,
    pub size: i64,
}

impl<T> Page<T> {
    /// Wrap one page of `content` out of `total_elements` rows.
    #[must_use]
    pub fn new(content: Vec<T>, total_elements: i64, current_page: i64, size: i64) -> Self {
        let total_pages = if size > 0 {
            (total_elements + size - 1) / size
        } else {
            0
        };
        Self {
            content,
            total_elements,
            total_pages,
            current_page,
            size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_counts() {
        let page = Page::new(vec![1, 2, 3], 21, 0, 10);
        assert_eq!(page.total_pages, 3);

        let empty: Page<i32> = Page::new(Vec::new(), 0, 0, 10);
        assert_eq!(empty.total_pages, 0);

        let exact: Page<i32> = Page::new(Vec::new(), 20, 1, 10);
        assert_eq!(exact.total_pages, 2);
    }
}
