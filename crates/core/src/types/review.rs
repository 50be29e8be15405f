//! Review moderation rules.

use crate::ReviewStatus;

/// Number of reports after which a review is hidden automatically.
pub const REPORT_HIDE_THRESHOLD: i32 = 5;

/// Helpfulness score shown for ordering reviews: likes minus reports.
#[must_use]
pub const fn helpfulness_score(like_count: i32, report_count: i32) -> i32 {
    like_count.saturating_sub(report_count)
}

/// Status a review should have after its report count changes.
///
/// Only the report that crosses the threshold hides an active review. A review
/// an admin restored keeps its status while its count stays at or above the
/// threshold, and a hidden review stays hidden until an admin restores it.
#[must_use]
pub const fn status_after_reports(
    current: ReviewStatus,
    previous_reports: i32,
    report_count: i32,
) -> ReviewStatus {
    if previous_reports < REPORT_HIDE_THRESHOLD && report_count >= REPORT_HIDE_THRESHOLD {
        ReviewStatus::Hidden
    } else {
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helpfulness_score() {
        assert_eq!(helpfulness_score(10, 3), 7);
        assert_eq!(helpfulness_score(0, 2), -2);
    }

    #[test]
    fn test_hidden_at_threshold() {
        assert_eq!(
            status_after_reports(ReviewStatus::Active, 3, 4),
            ReviewStatus::Active
        );
        assert_eq!(
            status_after_reports(ReviewStatus::Active, 4, REPORT_HIDE_THRESHOLD),
            ReviewStatus::Hidden
        );
        assert_eq!(
            status_after_reports(ReviewStatus::Hidden, 0, 1),
            ReviewStatus::Hidden
        );
    }

    #[test]
    fn test_restored_review_stays_active() {
        // A like recounts without changing reports.
        assert_eq!(
            status_after_reports(ReviewStatus::Active, 6, 6),
            ReviewStatus::Active
        );
        assert_eq!(
            status_after_reports(ReviewStatus::Active, 6, 7),
            ReviewStatus::Active
        );
    }
}
