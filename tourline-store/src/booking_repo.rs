use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use tourline_booking::models::{
    Booking, BookingQuery, BookingStatus, RatingStats, ReviewRecord, ReviewSubmission, SubmissionResult,
};
use tourline_booking::repository::{BookingRepository, ReviewRepository};
use tourline_catalog::PricingStrategy;
use tourline_core::{CoreError, CoreResult};

use crate::database::{corrupt, persistence, to_u32};

const BOOKING_COLUMNS: &str = "id, tour_id, customer_name, email, phone, start_date, end_date, \
     number_of_participants, price_per_person, total_price, pricing_strategy, special_requests, \
     status, admin_viewed, created_at, updated_at";

const REVIEW_COLUMNS: &str = "id, tour_id, booking_id, customer_name, customer_email, rating, review_text, \
     review_token, is_verified, is_approved, created_at, updated_at";

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    tour_id: Uuid,
    customer_name: String,
    email: String,
    phone: Option<String>,
    start_date: NaiveDate,
    end_date: NaiveDate,
    number_of_participants: i32,
    price_per_person: Decimal,
    total_price: Decimal,
    pricing_strategy: String,
    special_requests: Option<String>,
    status: String,
    admin_viewed: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = CoreError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        Ok(Booking {
            id: row.id,
            tour_id: row.tour_id,
            customer_name: row.customer_name,
            email: row.email,
            phone: row.phone,
            start_date: row.start_date,
            end_date: row.end_date,
            number_of_participants: to_u32("number_of_participants", row.number_of_participants)?,
            price_per_person: row.price_per_person,
            total_price: row.total_price,
            pricing_strategy: row
                .pricing_strategy
                .parse::<PricingStrategy>()
                .map_err(|e| corrupt("pricing_strategy", e))?,
            special_requests: row.special_requests,
            status: row.status.parse::<BookingStatus>().map_err(|e| corrupt("status", e))?,
            admin_viewed: row.admin_viewed,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: Uuid,
    tour_id: Uuid,
    booking_id: Uuid,
    customer_name: String,
    customer_email: String,
    rating: i16,
    review_text: Option<String>,
    review_token: String,
    is_verified: bool,
    is_approved: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ReviewRow> for ReviewRecord {
    type Error = CoreError;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        Ok(ReviewRecord {
            id: row.id,
            tour_id: row.tour_id,
            booking_id: row.booking_id,
            customer_name: row.customer_name,
            customer_email: row.customer_email,
            rating: u8::try_from(row.rating).map_err(|_| corrupt("rating", row.rating))?,
            review_text: row.review_text,
            review_token: row.review_token,
            is_verified: row.is_verified,
            is_approved: row.is_approved,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn participants_column(booking: &Booking) -> CoreResult<i32> {
    i32::try_from(booking.number_of_participants)
        .map_err(|_| CoreError::validation("Participant count out of range"))
}

// ============================================================================
// Bookings
// ============================================================================

pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn insert(&self, booking: &Booking) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO bookings (id, tour_id, customer_name, email, phone, start_date, end_date,
                number_of_participants, price_per_person, total_price, pricing_strategy,
                special_requests, status, admin_viewed, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(booking.id)
        .bind(booking.tour_id)
        .bind(&booking.customer_name)
        .bind(&booking.email)
        .bind(&booking.phone)
        .bind(booking.start_date)
        .bind(booking.end_date)
        .bind(participants_column(booking)?)
        .bind(booking.price_per_person)
        .bind(booking.total_price)
        .bind(booking.pricing_strategy.as_str())
        .bind(&booking.special_requests)
        .bind(booking.status.as_str())
        .bind(booking.admin_viewed)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await
        .map_err(persistence)?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> CoreResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!("SELECT {} FROM bookings WHERE id = $1", BOOKING_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(persistence)?;
        row.map(Booking::try_from).transpose()
    }

    async fn list(&self, query: &BookingQuery) -> CoreResult<Vec<Booking>> {
        let sql = format!(
            r#"
            SELECT {} FROM bookings
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::text IS NULL OR LOWER(email) = LOWER($2))
              AND ($3::uuid IS NULL OR tour_id = $3)
            ORDER BY created_at DESC, id
            OFFSET $4 LIMIT $5
            "#,
            BOOKING_COLUMNS
        );
        let rows = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(query.status.map(|s| s.as_str()))
            .bind(query.email.as_deref())
            .bind(query.tour_id)
            .bind(i64::from(query.skip))
            .bind(i64::from(query.limit))
            .fetch_all(&self.pool)
            .await
            .map_err(persistence)?;
        rows.into_iter().map(Booking::try_from).collect()
    }

    async fn count(&self, query: &BookingQuery) -> CoreResult<u64> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM bookings
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::text IS NULL OR LOWER(email) = LOWER($2))
              AND ($3::uuid IS NULL OR tour_id = $3)
            "#,
        )
        .bind(query.status.map(|s| s.as_str()))
        .bind(query.email.as_deref())
        .bind(query.tour_id)
        .fetch_one(&self.pool)
        .await
        .map_err(persistence)?;
        Ok(count.max(0) as u64)
    }

    async fn update_if_status(&self, booking: &Booking, expected: BookingStatus) -> CoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET customer_name = $2, email = $3, phone = $4, start_date = $5, end_date = $6,
                number_of_participants = $7, special_requests = $8, status = $9,
                admin_viewed = $10, updated_at = $11
            WHERE id = $1 AND status = $12
            "#,
        )
        .bind(booking.id)
        .bind(&booking.customer_name)
        .bind(&booking.email)
        .bind(&booking.phone)
        .bind(booking.start_date)
        .bind(booking.end_date)
        .bind(participants_column(booking)?)
        .bind(&booking.special_requests)
        .bind(booking.status.as_str())
        .bind(booking.admin_viewed)
        .bind(booking.updated_at)
        .bind(expected.as_str())
        .execute(&self.pool)
        .await
        .map_err(persistence)?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_viewed(&self, id: Uuid) -> CoreResult<bool> {
        let result = sqlx::query("UPDATE bookings SET admin_viewed = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(persistence)?;
        Ok(result.rows_affected() == 1)
    }
}

// ============================================================================
// Reviews
// ============================================================================

pub struct PgReviewRepository {
    pool: PgPool,
}

impl PgReviewRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReviewRepository for PgReviewRepository {
    async fn find_by_booking(&self, booking_id: Uuid) -> CoreResult<Option<ReviewRecord>> {
        let row = sqlx::query_as::<_, ReviewRow>(&format!("SELECT {} FROM reviews WHERE booking_id = $1", REVIEW_COLUMNS))
            .bind(booking_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(persistence)?;
        row.map(ReviewRecord::try_from).transpose()
    }

    async fn find_by_token(&self, token: &str) -> CoreResult<Option<ReviewRecord>> {
        let row = sqlx::query_as::<_, ReviewRow>(&format!("SELECT {} FROM reviews WHERE review_token = $1", REVIEW_COLUMNS))
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(persistence)?;
        row.map(ReviewRecord::try_from).transpose()
    }

    async fn insert_or_get(&self, record: &ReviewRecord) -> CoreResult<ReviewRecord> {
        sqlx::query(
            r#"
            INSERT INTO reviews (id, tour_id, booking_id, customer_name, customer_email, rating,
                review_text, review_token, is_verified, is_approved, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (booking_id) DO NOTHING
            "#,
        )
        .bind(record.id)
        .bind(record.tour_id)
        .bind(record.booking_id)
        .bind(&record.customer_name)
        .bind(&record.customer_email)
        .bind(i16::from(record.rating))
        .bind(&record.review_text)
        .bind(&record.review_token)
        .bind(record.is_verified)
        .bind(record.is_approved)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(persistence)?;

        self.find_by_booking(record.booking_id)
            .await?
            .ok_or_else(|| CoreError::PersistenceFailure("Review placeholder vanished after insert".to_string()))
    }

    async fn apply_submission(
        &self,
        token: &str,
        submission: &ReviewSubmission,
        allow_overwrite: bool,
    ) -> CoreResult<SubmissionResult> {
        let mut tx = self.pool.begin().await.map_err(persistence)?;

        let current = sqlx::query_as::<_, ReviewRow>(&format!(
            "SELECT {} FROM reviews WHERE review_token = $1 FOR UPDATE",
            REVIEW_COLUMNS
        ))
        .bind(token)
        .fetch_optional(&mut *tx)
        .await
        .map_err(persistence)?;

        let Some(current) = current.map(ReviewRecord::try_from).transpose()? else {
            return Ok(SubmissionResult::NotFound);
        };
        if current.is_submitted() && !allow_overwrite {
            return Ok(SubmissionResult::AlreadySubmitted);
        }

        let updated = sqlx::query_as::<_, ReviewRow>(&format!(
            r#"
            UPDATE reviews
            SET rating = $2, review_text = $3, customer_name = $4, is_verified = TRUE, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            REVIEW_COLUMNS
        ))
        .bind(current.id)
        .bind(i16::from(submission.rating))
        .bind(&submission.review_text)
        .bind(&submission.customer_name)
        .fetch_one(&mut *tx)
        .await
        .map_err(persistence)?;

        tx.commit().await.map_err(persistence)?;
        Ok(SubmissionResult::Applied(ReviewRecord::try_from(updated)?))
    }

    async fn list_published(&self, tour_id: Uuid, skip: u32, limit: u32) -> CoreResult<Vec<ReviewRecord>> {
        let rows = sqlx::query_as::<_, ReviewRow>(&format!(
            r#"
            SELECT {} FROM reviews
            WHERE tour_id = $1 AND is_verified AND is_approved AND rating > 0
            ORDER BY created_at DESC
            OFFSET $2 LIMIT $3
            "#,
            REVIEW_COLUMNS
        ))
        .bind(tour_id)
        .bind(i64::from(skip))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(persistence)?;
        rows.into_iter().map(ReviewRecord::try_from).collect()
    }

    async fn rating_stats(&self, tour_id: Uuid) -> CoreResult<RatingStats> {
        let (average, total): (Option<f64>, i64) = sqlx::query_as(
            r#"
            SELECT AVG(rating)::float8, COUNT(*)
            FROM reviews
            WHERE tour_id = $1 AND is_verified AND is_approved AND rating > 0
            "#,
        )
        .bind(tour_id)
        .fetch_one(&self.pool)
        .await
        .map_err(persistence)?;
        Ok(RatingStats {
            average_rating: average.unwrap_or(0.0),
            total_reviews: total.max(0) as u64,
        })
    }
}
