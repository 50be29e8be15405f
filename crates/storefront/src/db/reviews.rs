//! Review repository.
//!
//! Listing queries take an optional viewer so `user_liked`/`user_reported` can
//! be filled in the same round trip.

use sqlx::{PgPool, Postgres, QueryBuilder};

use shoplite_core::{
    ProductId, Rating, ReviewActionType, ReviewId, ReviewStatus, UserId, helpfulness_score,
    status_after_reports,
};

use super::{RepositoryError, conflict_on_unique};
use crate::models::review::{PageQuery, Review, ReviewFilter, ReviewSort};

/// Fields for a new review.
#[derive(Debug, Clone)]
pub struct NewReview<'r> {
    pub product_id: ProductId,
    pub user_id: UserId,
    pub rating: Rating,
    pub comment: Option<&'r str>,
    pub verified_purchase: bool,
    pub image_urls: &'r [String],
}

/// Start a query selecting reviews as seen by `viewer`.
fn review_select(viewer: Option<UserId>) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new(
        r"
        SELECT r.id, r.product_id, p.name AS product_name, r.user_id, u.username, r.rating,
               r.comment, r.like_count, r.report_count, r.helpfulness_score,
               r.is_verified_purchase AS verified_purchase, r.status, r.image_urls,
               EXISTS(SELECT 1 FROM shop.review_actions a
                      WHERE a.review_id = r.id AND a.action_type = 'LIKE' AND a.user_id = ",
    );
    query.push_bind(viewer);
    query.push(
        r") AS user_liked,
               EXISTS(SELECT 1 FROM shop.review_actions a
                      WHERE a.review_id = r.id AND a.action_type = 'REPORT' AND a.user_id = ",
    );
    query.push_bind(viewer);
    query.push(
        r") AS user_reported,
               r.created_at, r.updated_at
        FROM shop.reviews r
        JOIN shop.products p ON p.id = r.product_id
        JOIN shop.users u ON u.id = r.user_id
        ",
    );
    query
}

/// Repository for review and review-action database operations.
pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    /// Create a new review repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(
        &self,
        id: ReviewId,
        viewer: Option<UserId>,
    ) -> Result<Option<Review>, RepositoryError> {
        let mut query = review_select(viewer);
        query.push(" WHERE r.id = ").push_bind(id);

        let review = query
            .build_query_as::<Review>()
            .fetch_optional(self.pool)
            .await?;
        Ok(review)
    }

    /// The review a user wrote for a product, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_author(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<Review>, RepositoryError> {
        let mut query = review_select(Some(user_id));
        query
            .push(" WHERE r.user_id = ")
            .push_bind(user_id)
            .push(" AND r.product_id = ")
            .push_bind(product_id);

        let review = query
            .build_query_as::<Review>()
            .fetch_optional(self.pool)
            .await?;
        Ok(review)
    }

    /// Insert a review.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the user already reviewed the product.
    pub async fn create(&self, review: &NewReview<'_>) -> Result<ReviewId, RepositoryError> {
        let id: ReviewId = sqlx::query_scalar(
            r"
            INSERT INTO shop.reviews (product_id, user_id, rating, comment, is_verified_purchase, image_urls)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            ",
        )
        .bind(review.product_id)
        .bind(review.user_id)
        .bind(review.rating)
        .bind(review.comment)
        .bind(review.verified_purchase)
        .bind(review.image_urls)
        .fetch_one(self.pool)
        .await
        .map_err(conflict_on_unique("review for this product"))?;

        Ok(id)
    }

    /// Replace rating and comment.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review does not exist.
    pub async fn update(
        &self,
        id: ReviewId,
        rating: Rating,
        comment: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE shop.reviews SET rating = $2, comment = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(rating)
        .bind(comment)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review does not exist.
    pub async fn delete(&self, id: ReviewId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.reviews WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// One page of a product's active reviews, newest first, with the total count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_product(
        &self,
        product_id: ProductId,
        page: PageQuery,
        viewer: Option<UserId>,
    ) -> Result<(Vec<Review>, i64), RepositoryError> {
        let filter = ReviewFilter {
            rating: None,
            verified_only: false,
            with_images: false,
            sort: ReviewSort::Newest,
        };
        self.list_filtered(product_id, &filter, page, viewer).await
    }

    /// One page of a product's active reviews matching `filter`, with the total count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_filtered(
        &self,
        product_id: ProductId,
        filter: &ReviewFilter,
        page: PageQuery,
        viewer: Option<UserId>,
    ) -> Result<(Vec<Review>, i64), RepositoryError> {
        let mut query = review_select(viewer);
        push_filter(&mut query, product_id, filter);
        query
            .push(" ORDER BY ")
            .push(filter.sort.order_by())
            .push(", r.id DESC LIMIT ")
            .push_bind(page.size())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let reviews = query
            .build_query_as::<Review>()
            .fetch_all(self.pool)
            .await?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM shop.reviews r");
        push_filter(&mut count, product_id, filter);
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        Ok((reviews, total))
    }

    /// Every review by a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Review>, RepositoryError> {
        let mut query = review_select(Some(user_id));
        query
            .push(" WHERE r.user_id = ")
            .push_bind(user_id)
            .push(" ORDER BY r.created_at DESC, r.id DESC");

        let reviews = query.build_query_as::<Review>().fetch_all(self.pool).await?;
        Ok(reviews)
    }

    /// Reviews with at least `min_reports` reports, most reported first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_reported(&self, min_reports: i32) -> Result<Vec<Review>, RepositoryError> {
        let mut query = review_select(None);
        query
            .push(" WHERE r.report_count >= ")
            .push_bind(min_reports)
            .push(" ORDER BY r.report_count DESC, r.created_at DESC");

        let reviews = query.build_query_as::<Review>().fetch_all(self.pool).await?;
        Ok(reviews)
    }

    /// `(stars, count)` for every star value present on a product's reviews.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn rating_counts(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<(i16, i64)>, RepositoryError> {
        let counts: Vec<(i16, i64)> = sqlx::query_as(
            "SELECT rating, COUNT(*) FROM shop.reviews WHERE product_id = $1 GROUP BY rating",
        )
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;

        Ok(counts)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review does not exist.
    pub async fn set_status(&self, id: ReviewId, status: ReviewStatus) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE shop.reviews SET status = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(status)
                .execute(self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Record a like or report.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the user already did this to the review.
    pub async fn add_action(
        &self,
        review_id: ReviewId,
        user_id: UserId,
        action: ReviewActionType,
        reason: Option<&str>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO shop.review_actions (review_id, user_id, action_type, reason) VALUES ($1, $2, $3, $4)",
        )
        .bind(review_id)
        .bind(user_id)
        .bind(action)
        .bind(reason)
        .execute(self.pool)
        .await
        .map_err(conflict_on_unique("review action"))?;

        Ok(())
    }

    /// Remove a like or report. Returns whether one existed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn remove_action(
        &self,
        review_id: ReviewId,
        user_id: UserId,
        action: ReviewActionType,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM shop.review_actions WHERE review_id = $1 AND user_id = $2 AND action_type = $3",
        )
        .bind(review_id)
        .bind(user_id)
        .bind(action)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Recount likes and reports, then update the score and hide the review if
    /// this recount crossed the report threshold.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review does not exist.
    pub async fn refresh_counts(&self, id: ReviewId) -> Result<ReviewStatus, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let (current, previous_reports): (ReviewStatus, i32) = sqlx::query_as(
            "SELECT status, report_count FROM shop.reviews WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let (likes, reports): (i64, i64) = sqlx::query_as(
            r"
            SELECT COUNT(*) FILTER (WHERE action_type = 'LIKE'),
                   COUNT(*) FILTER (WHERE action_type = 'REPORT')
            FROM shop.review_actions WHERE review_id = $1
            ",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        let likes = i32::try_from(likes).unwrap_or(i32::MAX);
        let reports = i32::try_from(reports).unwrap_or(i32::MAX);
        let status = status_after_reports(current, previous_reports, reports);

        sqlx::query(
            r"
            UPDATE shop.reviews
            SET like_count = $2, report_count = $3, helpfulness_score = $4, status = $5, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(likes)
        .bind(reports)
        .bind(helpfulness_score(likes, reports))
        .bind(status)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(status)
    }
}

fn push_filter(query: &mut QueryBuilder<'_, Postgres>, product_id: ProductId, filter: &ReviewFilter) {
    query
        .push(" WHERE r.status = 'ACTIVE' AND r.product_id = ")
        .push_bind(product_id);
    if let Some(rating) = filter.rating {
        query.push(" AND r.rating = ").push_bind(rating);
    }
    if filter.verified_only {
        query.push(" AND r.is_verified_purchase");
    }
    if filter.with_images {
        query.push(" AND cardinality(r.image_urls) > 0");
    }
}
