use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use uuid::Uuid;

use tourline_core::catalog::CatalogClient;
use tourline_core::reviews::{ReviewTokenIssuing, ReviewTokenRequest};
use tourline_core::{CoreError, CoreResult};
use tourline_shared::Masked;

use crate::models::{
    PublishedReview, RatingStats, ResubmissionPolicy, ReviewForm, ReviewRecord, ReviewSubmission,
    SubmissionResult,
};
use crate::repository::ReviewRepository;
use crate::validation;

const TOKEN_BYTES: usize = 32;

/// 32 bytes from the OS generator, URL-safe base64 without padding.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Issues review tokens and takes guest submissions against them.
///
/// With an upstream issuer the token is minted there and mirrored into the
/// local review table, so form and submit resolve it here as well.
pub struct ReviewService {
    reviews: Arc<dyn ReviewRepository>,
    catalog: Arc<dyn CatalogClient>,
    policy: ResubmissionPolicy,
    upstream: Option<Arc<dyn ReviewTokenIssuing>>,
}

impl ReviewService {
    pub fn new(
        reviews: Arc<dyn ReviewRepository>,
        catalog: Arc<dyn CatalogClient>,
        policy: ResubmissionPolicy,
    ) -> Self {
        Self {
            reviews,
            catalog,
            policy,
            upstream: None,
        }
    }

    pub fn with_upstream(mut self, upstream: Arc<dyn ReviewTokenIssuing>) -> Self {
        self.upstream = Some(upstream);
        self
    }

    pub async fn submit(&self, token: &str, submission: &ReviewSubmission) -> CoreResult<ReviewRecord> {
        let submission = validation::review_submission(submission)?;
        let allow_overwrite = self.policy == ResubmissionPolicy::Overwrite;
        match self.reviews.apply_submission(token, &submission, allow_overwrite).await? {
            SubmissionResult::Applied(record) => {
                tracing::info!(review_id = %record.id, tour_id = %record.tour_id, rating = record.rating, "Review submitted");
                Ok(record)
            }
            SubmissionResult::NotFound => Err(review_token_not_found()),
            SubmissionResult::AlreadySubmitted => {
                Err(CoreError::validation("A review has already been submitted for this booking"))
            }
        }
    }

    pub async fn form(&self, token: &str) -> CoreResult<ReviewForm> {
        let record = self
            .reviews
            .find_by_token(token)
            .await?
            .ok_or_else(review_token_not_found)?;
        let tour = self.catalog.get_tour(record.tour_id).await?;
        Ok(ReviewForm {
            tour_id: record.tour_id,
            tour_title: tour.title,
            already_submitted: record.is_submitted(),
            customer_name: record.customer_name,
            customer_email: record.customer_email,
            booking_id: record.booking_id,
        })
    }

    pub async fn published(&self, tour_id: Uuid, skip: u32, limit: u32) -> CoreResult<Vec<PublishedReview>> {
        let records = self.reviews.list_published(tour_id, skip, limit).await?;
        Ok(records.into_iter().map(PublishedReview::from).collect())
    }

    pub async fn rating_stats(&self, tour_id: Uuid) -> CoreResult<RatingStats> {
        self.reviews.rating_stats(tour_id).await
    }
}

fn review_token_not_found() -> CoreError {
    CoreError::NotFound("Review token not found or expired".to_string())
}

#[async_trait]
impl ReviewTokenIssuing for ReviewService {
    async fn issue_token(&self, request: &ReviewTokenRequest) -> CoreResult<String> {
        if let Some(existing) = self.reviews.find_by_booking(request.booking_id).await? {
            return Ok(existing.review_token);
        }
        let token = match &self.upstream {
            Some(upstream) => upstream.issue_token(request).await?,
            None => generate_token(),
        };
        let placeholder = ReviewRecord::placeholder(
            request.tour_id,
            request.booking_id,
            request.customer_name.clone(),
            request.customer_email.clone(),
            token,
        );
        let stored = self.reviews.insert_or_get(&placeholder).await?;
        tracing::info!(
            booking_id = %request.booking_id,
            customer = %Masked::of(&request.customer_email),
            "Review token issued"
        );
        Ok(stored.review_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryReviewRepository;
    use rust_decimal_macros::dec;
    use tourline_catalog::{InMemoryCatalogStore, LocalCatalog};
    use tourline_core::catalog::TourInfo;

    async fn service(policy: ResubmissionPolicy) -> (ReviewService, Uuid) {
        let store = InMemoryCatalogStore::new();
        let tour_id = Uuid::new_v4();
        store
            .put_tour(TourInfo {
                id: tour_id,
                title: "Medina Food Walk".to_string(),
                base_price: dec!(35.00),
                duration_days: 1,
                max_participants: 12,
                min_participants: 1,
                group_discount_threshold: 5,
                group_discount_percentage: dec!(0),
            })
            .await;
        let catalog = Arc::new(LocalCatalog::new(Arc::new(store)));
        let repo = Arc::new(InMemoryReviewRepository::new());
        (ReviewService::new(repo, catalog, policy), tour_id)
    }

    fn request(tour_id: Uuid, booking_id: Uuid) -> ReviewTokenRequest {
        ReviewTokenRequest {
            booking_id,
            tour_id,
            customer_name: "Sam Rivera".to_string(),
            customer_email: "sam@example.com".to_string(),
        }
    }

    fn submission(rating: u8) -> ReviewSubmission {
        ReviewSubmission {
            rating,
            review_text: Some("Great day".to_string()),
            customer_name: "Sam".to_string(),
        }
    }

    #[test]
    fn test_token_is_url_safe() {
        let token = generate_token();
        assert_eq!(token.len(), 43);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_ne!(token, generate_token());
    }

    #[tokio::test]
    async fn test_issue_is_idempotent_per_booking() {
        let (service, tour_id) = service(ResubmissionPolicy::Reject).await;
        let booking_id = Uuid::new_v4();
        let first = service.issue_token(&request(tour_id, booking_id)).await.unwrap();
        let second = service.issue_token(&request(tour_id, booking_id)).await.unwrap();
        assert_eq!(first, second);

        let other = service.issue_token(&request(tour_id, Uuid::new_v4())).await.unwrap();
        assert_ne!(first, other);
    }

    #[tokio::test]
    async fn test_unknown_token_not_found() {
        let (service, _) = service(ResubmissionPolicy::Reject).await;
        let err = service.submit("no-such-token", &submission(4)).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(service.form("no-such-token").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_submit_then_publish() {
        let (service, tour_id) = service(ResubmissionPolicy::Reject).await;
        let token = service.issue_token(&request(tour_id, Uuid::new_v4())).await.unwrap();

        let form = service.form(&token).await.unwrap();
        assert_eq!(form.tour_title, "Medina Food Walk");
        assert!(!form.already_submitted);
        assert!(service.published(tour_id, 0, 50).await.unwrap().is_empty());

        let record = service.submit(&token, &submission(4)).await.unwrap();
        assert!(record.is_verified);
        assert_eq!(record.customer_name, "Sam");

        assert!(service.form(&token).await.unwrap().already_submitted);
        let published = service.published(tour_id, 0, 50).await.unwrap();
        assert_eq!(published.len(), 1);
        let stats = service.rating_stats(tour_id).await.unwrap();
        assert_eq!(stats.total_reviews, 1);
        assert!((stats.average_rating - 4.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_resubmission_policy() {
        let (strict, tour_id) = service(ResubmissionPolicy::Reject).await;
        let token = strict.issue_token(&request(tour_id, Uuid::new_v4())).await.unwrap();
        strict.submit(&token, &submission(5)).await.unwrap();
        let err = strict.submit(&token, &submission(1)).await.unwrap_err();
        assert!(matches!(err, CoreError::ValidationError(_)));

        let (lenient, tour_id) = service(ResubmissionPolicy::Overwrite).await;
        let token = lenient.issue_token(&request(tour_id, Uuid::new_v4())).await.unwrap();
        lenient.submit(&token, &submission(5)).await.unwrap();
        let record = lenient.submit(&token, &submission(2)).await.unwrap();
        assert_eq!(record.rating, 2);
    }

    struct CountingIssuer {
        calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl ReviewTokenIssuing for CountingIssuer {
        async fn issue_token(&self, request: &ReviewTokenRequest) -> CoreResult<String> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(format!("upstream-{}", request.booking_id))
        }
    }

    #[tokio::test]
    async fn test_upstream_token_is_recorded_locally() {
        let (service, tour_id) = service(ResubmissionPolicy::Reject).await;
        let upstream = Arc::new(CountingIssuer {
            calls: std::sync::atomic::AtomicUsize::new(0),
        });
        let service = service.with_upstream(upstream.clone());
        let booking_id = Uuid::new_v4();

        let token = service.issue_token(&request(tour_id, booking_id)).await.unwrap();
        assert_eq!(token, format!("upstream-{}", booking_id));
        assert_eq!(service.issue_token(&request(tour_id, booking_id)).await.unwrap(), token);
        assert_eq!(upstream.calls.load(std::sync::atomic::Ordering::SeqCst), 1);

        assert_eq!(service.form(&token).await.unwrap().booking_id, booking_id);
        let record = service.submit(&token, &submission(5)).await.unwrap();
        assert_eq!(record.review_token, token);
    }

    #[tokio::test]
    async fn test_upstream_failure_records_nothing() {
        struct Down;

        #[async_trait]
        impl ReviewTokenIssuing for Down {
            async fn issue_token(&self, _request: &ReviewTokenRequest) -> CoreResult<String> {
                Err(CoreError::dependency("tours-service", "connection refused"))
            }
        }

        let (service, tour_id) = service(ResubmissionPolicy::Reject).await;
        let service = service.with_upstream(Arc::new(Down));
        let err = service.issue_token(&request(tour_id, Uuid::new_v4())).await.unwrap_err();
        assert!(matches!(err, CoreError::DependencyFailure { .. }));
    }
}
