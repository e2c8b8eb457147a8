use async_trait::async_trait;
use uuid::Uuid;

use tourline_core::CoreResult;

use crate::models::{
    Booking, BookingQuery, BookingStatus, RatingStats, ReviewRecord, ReviewSubmission, SubmissionResult,
};

/// Repository trait for booking persistence
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Writes the whole row, price snapshot and status together.
    async fn insert(&self, booking: &Booking) -> CoreResult<()>;

    async fn get(&self, id: Uuid) -> CoreResult<Option<Booking>>;

    /// Newest first, filtered and paginated by `query`.
    async fn list(&self, query: &BookingQuery) -> CoreResult<Vec<Booking>>;

    /// Count of rows matching the filters of `query`; pagination is ignored.
    async fn count(&self, query: &BookingQuery) -> CoreResult<u64>;

    /// Replaces the stored row only if its status is still `expected`.
    ///
    /// Returns false when the row is missing or its status moved on.
    async fn update_if_status(&self, booking: &Booking, expected: BookingStatus) -> CoreResult<bool>;

    async fn mark_viewed(&self, id: Uuid) -> CoreResult<bool>;
}

/// Repository trait for review tokens and submitted reviews
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    async fn find_by_booking(&self, booking_id: Uuid) -> CoreResult<Option<ReviewRecord>>;

    async fn find_by_token(&self, token: &str) -> CoreResult<Option<ReviewRecord>>;

    /// Inserts the placeholder unless the booking already has a record, in which
    /// case the existing record is returned untouched.
    async fn insert_or_get(&self, record: &ReviewRecord) -> CoreResult<ReviewRecord>;

    /// Applies a validated submission. A record that already carries a review
    /// is only overwritten when `allow_overwrite` is set.
    async fn apply_submission(
        &self,
        token: &str,
        submission: &ReviewSubmission,
        allow_overwrite: bool,
    ) -> CoreResult<SubmissionResult>;

    /// Verified, approved, submitted reviews for a tour, newest first.
    async fn list_published(&self, tour_id: Uuid, skip: u32, limit: u32) -> CoreResult<Vec<ReviewRecord>>;

    async fn rating_stats(&self, tour_id: Uuid) -> CoreResult<RatingStats>;
}
