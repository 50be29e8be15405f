//! Reviews, ratings, and reader reactions.

use sqlx::PgPool;
use tracing::info;

use shoplite_core::{
    ProductId, REPORT_HIDE_THRESHOLD, RatingSummary, ReviewActionType, ReviewId, ReviewStatus,
    UserId,
};

use super::ServiceError;
use super::catalog_cache::CatalogCache;
use crate::db::RepositoryError;
use crate::db::orders::OrderRepository;
use crate::db::products::ProductRepository;
use crate::db::reviews::{NewReview, ReviewRepository};
use crate::models::Page;
use crate::models::review::{MAX_REVIEW_IMAGES, PageQuery, Review, ReviewFilter, ReviewRequest};

pub struct ReviewService<'a> {
    reviews: ReviewRepository<'a>,
    products: ProductRepository<'a>,
    orders: OrderRepository<'a>,
    cache: &'a CatalogCache,
}

impl<'a> ReviewService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, cache: &'a CatalogCache) -> Self {
        Self {
            reviews: ReviewRepository::new(pool),
            products: ProductRepository::new(pool),
            orders: OrderRepository::new(pool),
            cache,
        }
    }

    /// Write a review. A user gets one review per product.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the product does not exist.
    /// Returns `ServiceError::Conflict` if the user already reviewed it.
    /// Returns `ServiceError::Validation` for too many images.
    pub async fn create(
        &self,
        user_id: UserId,
        product_id: ProductId,
        request: &ReviewRequest,
        image_urls: &[String],
    ) -> Result<Review, ServiceError> {
        self.ensure_product(product_id).await?;
        let image_urls = clean_image_urls(image_urls)?;

        let verified_purchase = self.orders.has_purchased(user_id, product_id).await?;
        let id = self
            .reviews
            .create(&NewReview {
                product_id,
                user_id,
                rating: request.rating,
                comment: request.comment.as_deref(),
                verified_purchase,
                image_urls: &image_urls,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => {
                    ServiceError::conflict("You have already reviewed this product")
                }
                other => ServiceError::Repository(other),
            })?;

        self.refresh_product(product_id).await?;
        info!(review_id = %id, %product_id, %user_id, verified_purchase, "Review created");
        self.get(id, Some(user_id)).await
    }

    /// Change rating and comment. Only the author may edit.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Forbidden` for anyone but the author.
    pub async fn update(
        &self,
        user_id: UserId,
        review_id: ReviewId,
        request: &ReviewRequest,
    ) -> Result<Review, ServiceError> {
        let review = self.get(review_id, Some(user_id)).await?;
        if review.user_id != user_id {
            return Err(ServiceError::Forbidden("You can only edit your own reviews"));
        }

        self.reviews
            .update(review_id, request.rating, request.comment.as_deref())
            .await?;
        self.refresh_product(review.product_id).await?;
        self.get(review_id, Some(user_id)).await
    }

    /// Delete a review as its author or an administrator.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Forbidden` for anyone else.
    pub async fn delete(
        &self,
        user_id: UserId,
        is_admin: bool,
        review_id: ReviewId,
    ) -> Result<(), ServiceError> {
        let review = self.get(review_id, None).await?;
        if review.user_id != user_id && !is_admin {
            return Err(ServiceError::Forbidden("You can only delete your own reviews"));
        }

        self.reviews.delete(review_id).await?;
        self.refresh_product(review.product_id).await?;
        info!(review_id = %review_id, "Review deleted");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the review does not exist.
    pub async fn get(&self, id: ReviewId, viewer: Option<UserId>) -> Result<Review, ServiceError> {
        self.reviews
            .get_by_id(id, viewer)
            .await?
            .ok_or(ServiceError::NotFound("Review"))
    }

    /// Active reviews for a product, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn list_by_product(
        &self,
        product_id: ProductId,
        page: PageQuery,
        viewer: Option<UserId>,
    ) -> Result<Page<Review>, ServiceError> {
        let (reviews, total) = self
            .reviews
            .list_by_product(product_id, page, viewer)
            .await?;
        Ok(Page::new(reviews, total, page.page(), page.size()))
    }

    /// Active reviews narrowed and ordered by `filter`.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn list_filtered(
        &self,
        product_id: ProductId,
        filter: &ReviewFilter,
        page: PageQuery,
        viewer: Option<UserId>,
    ) -> Result<Page<Review>, ServiceError> {
        let (reviews, total) = self
            .reviews
            .list_filtered(product_id, filter, page, viewer)
            .await?;
        Ok(Page::new(reviews, total, page.page(), page.size()))
    }

    /// Average, total, and per-star counts for a product.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the product does not exist.
    pub async fn summary(&self, product_id: ProductId) -> Result<RatingSummary, ServiceError> {
        self.ensure_product(product_id).await?;
        let counts = self.reviews.rating_counts(product_id).await?;
        Ok(RatingSummary::from_counts(counts))
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Review>, ServiceError> {
        Ok(self.reviews.list_by_user(user_id).await?)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn find_by_author(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<Review>, ServiceError> {
        Ok(self.reviews.find_by_author(user_id, product_id).await?)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Conflict` if the user already liked the review.
    pub async fn like(&self, user_id: UserId, review_id: ReviewId) -> Result<Review, ServiceError> {
        self.get(review_id, None).await?;
        self.reviews
            .add_action(review_id, user_id, ReviewActionType::Like, None)
            .await
            .map_err(|e| duplicate_action(e, "You have already liked this review"))?;
        self.reviews.refresh_counts(review_id).await?;
        self.get(review_id, Some(user_id)).await
    }

    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the user had not liked the review.
    pub async fn unlike(&self, user_id: UserId, review_id: ReviewId) -> Result<Review, ServiceError> {
        let removed = self
            .reviews
            .remove_action(review_id, user_id, ReviewActionType::Like)
            .await?;
        if !removed {
            return Err(ServiceError::NotFound("Like"));
        }
        self.reviews.refresh_counts(review_id).await?;
        self.get(review_id, Some(user_id)).await
    }

    /// Report a review. Reaching the report threshold hides it.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` when reporting one's own review.
    /// Returns `ServiceError::Conflict` if the user already reported it.
    pub async fn report(
        &self,
        user_id: UserId,
        review_id: ReviewId,
        reason: Option<&str>,
    ) -> Result<Review, ServiceError> {
        let review = self.get(review_id, None).await?;
        if review.user_id == user_id {
            return Err(ServiceError::validation("You cannot report your own review"));
        }

        self.reviews
            .add_action(review_id, user_id, ReviewActionType::Report, reason)
            .await
            .map_err(|e| duplicate_action(e, "You have already reported this review"))?;
        let status = self.reviews.refresh_counts(review_id).await?;
        if status == ReviewStatus::Hidden && review.status == ReviewStatus::Active {
            info!(review_id = %review_id, "Review hidden after reports");
        }
        self.get(review_id, Some(user_id)).await
    }

    /// Reviews with at least `min_reports` reports (default: the hide threshold).
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn list_reported(&self, min_reports: Option<i32>) -> Result<Vec<Review>, ServiceError> {
        let threshold = min_reports.unwrap_or(REPORT_HIDE_THRESHOLD).max(1);
        Ok(self.reviews.list_reported(threshold).await?)
    }

    /// Restore or hide a review.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the review does not exist.
    pub async fn set_status(
        &self,
        review_id: ReviewId,
        status: ReviewStatus,
    ) -> Result<Review, ServiceError> {
        self.reviews
            .set_status(review_id, status)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => ServiceError::NotFound("Review"),
                other => ServiceError::Repository(other),
            })?;
        info!(review_id = %review_id, %status, "Review status changed");
        self.get(review_id, None).await
    }

    async fn ensure_product(&self, product_id: ProductId) -> Result<(), ServiceError> {
        if self.products.get_by_id(product_id).await?.is_none() {
            return Err(ServiceError::NotFound("Product"));
        }
        Ok(())
    }

    async fn refresh_product(&self, product_id: ProductId) -> Result<(), ServiceError> {
        self.products.refresh_rating(product_id).await?;
        self.cache.invalidate_product(product_id).await;
        Ok(())
    }
}

fn clean_image_urls(urls: &[String]) -> Result<Vec<String>, ServiceError> {
    let cleaned: Vec<String> = urls
        .iter()
        .map(|u| u.trim())
        .filter(|u| !u.is_empty())
        .map(str::to_owned)
        .collect();
    if cleaned.len() > MAX_REVIEW_IMAGES {
        return Err(ServiceError::validation(format!(
            "A review can have at most {MAX_REVIEW_IMAGES} images"
        )));
    }
    Ok(cleaned)
}

fn duplicate_action(e: RepositoryError, message: &'static str) -> ServiceError {
    match e {
        RepositoryError::Conflict(_) => ServiceError::conflict(message),
        other => ServiceError::Repository(other),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_image_urls() {
        let urls = vec![" /api/files/a.png ".to_owned(), String::new(), "  ".to_owned()];
        assert_eq!(clean_image_urls(&urls).unwrap(), vec!["/api/files/a.png"]);

        let too_many: Vec<String> = (0..=MAX_REVIEW_IMAGES).map(|i| format!("/{i}.png")).collect();
        assert!(matches!(
            clean_image_urls(&too_many),
            Err(ServiceError::Validation(_))
        ));
    }
}
