use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use tourline_core::holds::{DayCapacity, HoldLedger, HoldOutcome};
use tourline_core::notification::{EmailNotification, NotificationClient};
use tourline_core::{CoreError, CoreResult};

use crate::models::{
    Booking, BookingQuery, BookingStatus, RatingStats, ReviewRecord, ReviewSubmission, SubmissionResult,
};
use crate::repository::{BookingRepository, ReviewRepository};

/// In-memory booking store. Clones share state.
#[derive(Clone, Default)]
pub struct InMemoryBookingRepository {
    bookings: Arc<RwLock<HashMap<Uuid, Booking>>>,
}

impl InMemoryBookingRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn insert(&self, booking: &Booking) -> CoreResult<()> {
        let mut bookings = self.bookings.write().await;
        if bookings.contains_key(&booking.id) {
            return Err(CoreError::PersistenceFailure(format!("Duplicate booking id {}", booking.id)));
        }
        bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> CoreResult<Option<Booking>> {
        Ok(self.bookings.read().await.get(&id).cloned())
    }

    async fn list(&self, query: &BookingQuery) -> CoreResult<Vec<Booking>> {
        let bookings = self.bookings.read().await;
        let mut matching: Vec<Booking> = bookings.values().filter(|b| query.matches(b)).cloned().collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(matching
            .into_iter()
            .skip(query.skip as usize)
            .take(query.limit as usize)
            .collect())
    }

    async fn count(&self, query: &BookingQuery) -> CoreResult<u64> {
        let bookings = self.bookings.read().await;
        Ok(bookings.values().filter(|b| query.matches(b)).count() as u64)
    }

    async fn update_if_status(&self, booking: &Booking, expected: BookingStatus) -> CoreResult<bool> {
        let mut bookings = self.bookings.write().await;
        match bookings.get_mut(&booking.id) {
            Some(stored) if stored.status == expected => {
                *stored = booking.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_viewed(&self, id: Uuid) -> CoreResult<bool> {
        let mut bookings = self.bookings.write().await;
        match bookings.get_mut(&id) {
            Some(stored) => {
                stored.admin_viewed = true;
                stored.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// In-memory review store keyed by id, unique per booking and per token.
#[derive(Clone, Default)]
pub struct InMemoryReviewRepository {
    reviews: Arc<RwLock<HashMap<Uuid, ReviewRecord>>>,
}

impl InMemoryReviewRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReviewRepository for InMemoryReviewRepository {
    async fn find_by_booking(&self, booking_id: Uuid) -> CoreResult<Option<ReviewRecord>> {
        let reviews = self.reviews.read().await;
        Ok(reviews.values().find(|r| r.booking_id == booking_id).cloned())
    }

    async fn find_by_token(&self, token: &str) -> CoreResult<Option<ReviewRecord>> {
        let reviews = self.reviews.read().await;
        Ok(reviews.values().find(|r| r.review_token == token).cloned())
    }

    async fn insert_or_get(&self, record: &ReviewRecord) -> CoreResult<ReviewRecord> {
        let mut reviews = self.reviews.write().await;
        if let Some(existing) = reviews.values().find(|r| r.booking_id == record.booking_id) {
            return Ok(existing.clone());
        }
        if reviews.values().any(|r| r.review_token == record.review_token) {
            return Err(CoreError::PersistenceFailure("Review token collision".to_string()));
        }
        reviews.insert(record.id, record.clone());
        Ok(record.clone())
    }

    async fn apply_submission(
        &self,
        token: &str,
        submission: &ReviewSubmission,
        allow_overwrite: bool,
    ) -> CoreResult<SubmissionResult> {
        let mut reviews = self.reviews.write().await;
        let Some(record) = reviews.values_mut().find(|r| r.review_token == token) else {
            return Ok(SubmissionResult::NotFound);
        };
        if record.is_submitted() && !allow_overwrite {
            return Ok(SubmissionResult::AlreadySubmitted);
        }
        record.rating = submission.rating;
        record.review_text = submission.review_text.clone();
        record.customer_name = submission.customer_name.clone();
        record.is_verified = true;
        record.updated_at = Utc::now();
        Ok(SubmissionResult::Applied(record.clone()))
    }

    async fn list_published(&self, tour_id: Uuid, skip: u32, limit: u32) -> CoreResult<Vec<ReviewRecord>> {
        let reviews = self.reviews.read().await;
        let mut published: Vec<ReviewRecord> = reviews
            .values()
            .filter(|r| r.tour_id == tour_id && r.is_published())
            .cloned()
            .collect();
        published.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(published.into_iter().skip(skip as usize).take(limit as usize).collect())
    }

    async fn rating_stats(&self, tour_id: Uuid) -> CoreResult<RatingStats> {
        let reviews = self.reviews.read().await;
        Ok(RatingStats::from_ratings(
            reviews
                .values()
                .filter(|r| r.tour_id == tour_id && r.is_published())
                .map(|r| r.rating),
        ))
    }
}

#[derive(Debug, Clone, Copy)]
struct HoldEntry {
    participants: u32,
    /// `None` once committed.
    expires_at: Option<Instant>,
}

impl HoldEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// Process-local hold ledger. One mutex guards every date, so `acquire` is atomic.
#[derive(Clone, Default)]
pub struct InMemoryHoldLedger {
    days: Arc<Mutex<HashMap<(Uuid, NaiveDate), HashMap<Uuid, HoldEntry>>>>,
}

impl InMemoryHoldLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HoldLedger for InMemoryHoldLedger {
    async fn acquire(
        &self,
        hold_id: Uuid,
        tour_id: Uuid,
        days: &[DayCapacity],
        participants: u32,
        ttl: Duration,
    ) -> CoreResult<HoldOutcome> {
        let mut ledger = self.days.lock().await;
        let now = Instant::now();

        for day in days {
            let held = ledger
                .get(&(tour_id, day.date))
                .map(|holds| {
                    holds
                        .iter()
                        .filter(|(id, entry)| **id != hold_id && entry.is_live(now))
                        .map(|(_, entry)| entry.participants)
                        .sum::<u32>()
                })
                .unwrap_or(0);
            if held.saturating_add(participants) > day.open_spots {
                return Ok(HoldOutcome::Exhausted {
                    date: day.date,
                    open_spots: day.open_spots,
                    held,
                });
            }
        }

        let expires_at = Some(now + ttl);
        for day in days {
            let holds = ledger.entry((tour_id, day.date)).or_default();
            holds.retain(|_, entry| entry.is_live(now));
            holds.insert(hold_id, HoldEntry { participants, expires_at });
        }
        Ok(HoldOutcome::Held)
    }

    async fn commit(&self, hold_id: Uuid, tour_id: Uuid, dates: &[NaiveDate]) -> CoreResult<()> {
        let mut ledger = self.days.lock().await;
        for date in dates {
            if let Some(entry) = ledger.get_mut(&(tour_id, *date)).and_then(|h| h.get_mut(&hold_id)) {
                entry.expires_at = None;
            }
        }
        Ok(())
    }

    async fn release(&self, hold_id: Uuid, tour_id: Uuid, dates: &[NaiveDate]) -> CoreResult<()> {
        let mut ledger = self.days.lock().await;
        for date in dates {
            if let Some(holds) = ledger.get_mut(&(tour_id, *date)) {
                holds.remove(&hold_id);
            }
        }
        Ok(())
    }

    async fn held_spots(&self, tour_id: Uuid, date: NaiveDate) -> CoreResult<u32> {
        let ledger = self.days.lock().await;
        let now = Instant::now();
        Ok(ledger
            .get(&(tour_id, date))
            .map(|holds| holds.values().filter(|e| e.is_live(now)).map(|e| e.participants).sum())
            .unwrap_or(0))
    }
}

/// Notification client that records what would have been sent.
#[derive(Default)]
pub struct OutboxNotifier {
    sent: Mutex<Vec<EmailNotification>>,
    failing: AtomicBool,
}

impl OutboxNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every send fails with a dependency error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn sent(&self) -> Vec<EmailNotification> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl NotificationClient for OutboxNotifier {
    async fn send(&self, notification: &EmailNotification) -> CoreResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CoreError::dependency("messaging-service", "outbox is failing"));
        }
        self.sent.lock().await.push(notification.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn days(open: u32) -> Vec<DayCapacity> {
        vec![
            DayCapacity { date: d("2030-10-01"), open_spots: open },
            DayCapacity { date: d("2030-10-02"), open_spots: open },
        ]
    }

    const TTL: Duration = Duration::from_secs(600);

    #[tokio::test]
    async fn test_acquire_is_all_or_nothing() {
        let ledger = InMemoryHoldLedger::new();
        let tour = Uuid::new_v4();
        let first = Uuid::new_v4();
        assert!(ledger.acquire(first, tour, &days(10)[1..], 8, TTL).await.unwrap().is_held());

        let second = Uuid::new_v4();
        let outcome = ledger.acquire(second, tour, &days(10), 4, TTL).await.unwrap();
        assert_eq!(
            outcome,
            HoldOutcome::Exhausted { date: d("2030-10-02"), open_spots: 10, held: 8 }
        );
        // The first date was not touched by the failed attempt.
        assert_eq!(ledger.held_spots(tour, d("2030-10-01")).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reacquire_replaces_own_spots() {
        let ledger = InMemoryHoldLedger::new();
        let tour = Uuid::new_v4();
        let hold = Uuid::new_v4();
        ledger.acquire(hold, tour, &days(6), 5, TTL).await.unwrap();
        assert!(ledger.acquire(hold, tour, &days(6), 6, TTL).await.unwrap().is_held());
        assert_eq!(ledger.held_spots(tour, d("2030-10-01")).await.unwrap(), 6);
    }

    #[tokio::test]
    async fn test_pending_holds_expire_committed_do_not() {
        let ledger = InMemoryHoldLedger::new();
        let tour = Uuid::new_v4();
        let dates = [d("2030-10-01"), d("2030-10-02")];

        let pending = Uuid::new_v4();
        ledger.acquire(pending, tour, &days(10), 3, Duration::ZERO).await.unwrap();
        assert_eq!(ledger.held_spots(tour, dates[0]).await.unwrap(), 0);

        let committed = Uuid::new_v4();
        ledger.acquire(committed, tour, &days(10), 4, TTL).await.unwrap();
        ledger.commit(committed, tour, &dates).await.unwrap();
        assert_eq!(ledger.held_spots(tour, dates[1]).await.unwrap(), 4);

        ledger.release(committed, tour, &dates).await.unwrap();
        assert_eq!(ledger.held_spots(tour, dates[1]).await.unwrap(), 0);
        // Releasing twice is harmless.
        ledger.release(committed, tour, &dates).await.unwrap();
    }
}
