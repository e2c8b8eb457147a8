use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tourline_catalog::PricingStrategy;

/// Booking status in the lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    /// pending -> confirmed -> completed, and pending/confirmed -> cancelled.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (BookingStatus::Pending, BookingStatus::Confirmed)
                | (BookingStatus::Pending, BookingStatus::Cancelled)
                | (BookingStatus::Confirmed, BookingStatus::Completed)
                | (BookingStatus::Confirmed, BookingStatus::Cancelled)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }

    /// Whether the booking still occupies tour capacity.
    pub fn holds_capacity(&self) -> bool {
        !matches!(self, BookingStatus::Cancelled)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "completed" => Ok(BookingStatus::Completed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(format!("Unknown booking status: {}", other)),
        }
    }
}

/// A reservation with its price frozen at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub tour_id: Uuid,
    pub customer_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub number_of_participants: u32,
    pub price_per_person: Decimal,
    pub total_price: Decimal,
    pub pricing_strategy: PricingStrategy,
    pub special_requests: Option<String>,
    pub status: BookingStatus,
    pub admin_viewed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn duration_days(&self) -> i64 {
        tourline_shared::dates::days_inclusive(self.start_date, self.end_date)
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        tourline_shared::dates::each_day(self.start_date, self.end_date).collect()
    }
}

/// Inbound booking request. Dates stay raw so parse failures surface as date errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRequest {
    pub tour_id: String,
    pub customer_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub start_date: String,
    #[serde(default)]
    pub end_date: Option<String>,
    pub number_of_participants: u32,
    #[serde(default)]
    pub special_requests: Option<String>,
    #[serde(default)]
    pub pricing_strategy: Option<PricingStrategy>,
}

/// Price quote and availability check input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceRequest {
    pub tour_id: String,
    pub start_date: String,
    #[serde(default)]
    pub end_date: Option<String>,
    pub number_of_participants: u32,
}

/// Partial admin update; only supplied fields are applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingPatch {
    pub customer_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub number_of_participants: Option<u32>,
    pub special_requests: Option<String>,
    pub status: Option<BookingStatus>,
    pub admin_viewed: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingQuery {
    #[serde(default)]
    pub skip: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub status: Option<BookingStatus>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub tour_id: Option<Uuid>,
}

fn default_limit() -> u32 {
    100
}

impl Default for BookingQuery {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: default_limit(),
            status: None,
            email: None,
            tour_id: None,
        }
    }
}

impl BookingQuery {
    pub fn matches(&self, booking: &Booking) -> bool {
        self.status.map_or(true, |s| booking.status == s)
            && self
                .email
                .as_deref()
                .map_or(true, |e| booking.email.eq_ignore_ascii_case(e))
            && self.tour_id.map_or(true, |t| booking.tour_id == t)
    }
}

/// Result of the review-request side effects that follow completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    ReviewRequested { review_token: String, email_sent: bool },
    TourUnavailable,
    TokenFailed,
}

impl CompletionOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            CompletionOutcome::ReviewRequested { email_sent: true, .. } => {
                "Booking completed and review request sent"
            }
            CompletionOutcome::ReviewRequested { email_sent: false, .. } => {
                "Booking completed but failed to send review request email"
            }
            CompletionOutcome::TourUnavailable => {
                "Booking completed but tour not found for review request"
            }
            CompletionOutcome::TokenFailed => "Booking completed but failed to create review request",
        }
    }

    /// False whenever no review email went out, including the degraded outcomes.
    pub fn email_sent(&self) -> bool {
        matches!(self, CompletionOutcome::ReviewRequested { email_sent: true, .. })
    }

    pub fn review_token(&self) -> Option<&str> {
        match self {
            CompletionOutcome::ReviewRequested { review_token, .. } => Some(review_token),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionReport {
    pub booking: Booking,
    pub outcome: CompletionOutcome,
}

// ============================================================================
// Reviews
// ============================================================================

/// A guest review. Until submitted it is a placeholder with `rating == 0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub id: Uuid,
    pub tour_id: Uuid,
    pub booking_id: Uuid,
    pub customer_name: String,
    pub customer_email: String,
    pub rating: u8,
    pub review_text: Option<String>,
    pub review_token: String,
    pub is_verified: bool,
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReviewRecord {
    pub fn placeholder(
        tour_id: Uuid,
        booking_id: Uuid,
        customer_name: String,
        customer_email: String,
        review_token: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tour_id,
            booking_id,
            customer_name,
            customer_email,
            rating: 0,
            review_text: None,
            review_token,
            is_verified: false,
            is_approved: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_submitted(&self) -> bool {
        self.is_verified && self.rating > 0
    }

    pub fn is_published(&self) -> bool {
        self.is_submitted() && self.is_approved
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewSubmission {
    pub rating: u8,
    #[serde(default)]
    pub review_text: Option<String>,
    pub customer_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionResult {
    Applied(ReviewRecord),
    NotFound,
    AlreadySubmitted,
}

/// What to do when a token that already carries a review is submitted again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResubmissionPolicy {
    #[default]
    Reject,
    Overwrite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewForm {
    pub tour_id: Uuid,
    pub tour_title: String,
    pub customer_name: String,
    pub customer_email: String,
    pub booking_id: Uuid,
    pub already_submitted: bool,
}

/// Public view of a published review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishedReview {
    pub id: Uuid,
    pub rating: u8,
    pub review_text: Option<String>,
    pub customer_name: String,
    pub created_at: DateTime<Utc>,
    pub is_verified: bool,
}

impl From<ReviewRecord> for PublishedReview {
    fn from(record: ReviewRecord) -> Self {
        Self {
            id: record.id,
            rating: record.rating,
            review_text: record.review_text,
            customer_name: record.customer_name,
            created_at: record.created_at,
            is_verified: record.is_verified,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingStats {
    pub average_rating: f64,
    pub total_reviews: u64,
}

impl RatingStats {
    pub fn from_ratings(ratings: impl IntoIterator<Item = u8>) -> Self {
        let (sum, count) = ratings
            .into_iter()
            .fold((0u64, 0u64), |(sum, count), r| (sum + u64::from(r), count + 1));
        Self {
            average_rating: if count == 0 { 0.0 } else { sum as f64 / count as f64 },
            total_reviews: count,
        }
    }
}
