use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use tourline_catalog::{PriceCalculationEngine, PriceQuote, PricingStrategy, QuoteRequest};
use tourline_core::catalog::{AvailabilityReport, CatalogClient, TourInfo};
use tourline_core::holds::{DayCapacity, HoldLedger, HoldOutcome};
use tourline_core::reviews::{ReviewTokenIssuing, ReviewTokenRequest};
use tourline_core::{parse_id, CoreError, CoreResult};
use tourline_shared::{parse_date, Masked};

use crate::capacity::{apply_holds, capacity_days};
use crate::models::{
    Booking, BookingPatch, BookingQuery, BookingRequest, BookingStatus, CompletionOutcome, CompletionReport,
    PriceRequest,
};
use crate::notifier::NotificationDispatcher;
use crate::repository::BookingRepository;
use crate::validation;

#[derive(Debug, Clone)]
pub struct LifecycleSettings {
    /// How long an uncommitted capacity hold survives.
    pub hold_ttl: Duration,
    pub max_participants_per_booking: u32,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            hold_ttl: Duration::from_secs(900),
            max_participants_per_booking: 50,
        }
    }
}

/// Drives bookings through pending -> confirmed -> completed (or cancelled),
/// pricing them at creation and coordinating holds, review tokens and email.
pub struct BookingLifecycle {
    bookings: Arc<dyn BookingRepository>,
    catalog: Arc<dyn CatalogClient>,
    pricing: PriceCalculationEngine,
    holds: Arc<dyn HoldLedger>,
    reviews: Arc<dyn ReviewTokenIssuing>,
    notifier: NotificationDispatcher,
    settings: LifecycleSettings,
}

impl BookingLifecycle {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        catalog: Arc<dyn CatalogClient>,
        holds: Arc<dyn HoldLedger>,
        reviews: Arc<dyn ReviewTokenIssuing>,
        notifier: NotificationDispatcher,
        settings: LifecycleSettings,
    ) -> Self {
        Self {
            pricing: PriceCalculationEngine::new(catalog.clone()),
            bookings,
            catalog,
            holds,
            reviews,
            notifier,
            settings,
        }
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub async fn quote(&self, strategy: PricingStrategy, request: &PriceRequest) -> CoreResult<PriceQuote> {
        let request = self.quote_request(request)?;
        self.pricing.quote(strategy, &request).await
    }

    /// Catalog availability with spots already held by bookings taken out.
    pub async fn check_availability(&self, request: &PriceRequest) -> CoreResult<AvailabilityReport> {
        let request = self.quote_request(request)?;
        let end = request
            .end_date
            .ok_or_else(|| CoreError::validation("End date is required"))?;
        validation::date_range(request.start_date, end)?;
        let tour = self.catalog.get_tour(request.tour_id).await?;
        let report = self
            .catalog
            .get_availability(request.tour_id, request.start_date, end, request.participants)
            .await?;
        apply_holds(
            self.holds.as_ref(),
            &tour,
            report,
            request.start_date,
            end,
            request.participants,
        )
        .await
    }

    pub async fn get(&self, id: Uuid) -> CoreResult<Booking> {
        self.bookings
            .get(id)
            .await?
            .ok_or_else(|| CoreError::NotFound("Booking not found".to_string()))
    }

    pub async fn list(&self, query: &BookingQuery) -> CoreResult<Vec<Booking>> {
        self.bookings.list(query).await
    }

    pub async fn count(&self, query: &BookingQuery) -> CoreResult<u64> {
        self.bookings.count(query).await
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Validates, prices, holds capacity and persists a `pending` booking.
    ///
    /// The hold is released if the write fails. Notification failures are logged only.
    pub async fn create(&self, request: &BookingRequest, default_strategy: PricingStrategy) -> CoreResult<Booking> {
        let tour_id = parse_id("tour", &request.tour_id)?;
        let customer_name = validation::customer_name(&request.customer_name)?;
        let email = validation::email(&request.email)?;
        let phone = validation::phone(request.phone.as_deref())?;
        let participants =
            validation::participants(request.number_of_participants, self.settings.max_participants_per_booking)?;
        let start = parse_date(&request.start_date)?;
        validation::start_in_future(start, today())?;
        let end = request.end_date.as_deref().map(parse_date).transpose()?;
        if let Some(end) = end {
            validation::date_range(start, end)?;
        }
        let strategy = request.pricing_strategy.unwrap_or(default_strategy);

        let tour = self.catalog.get_tour(tour_id).await?;
        check_minimum(&tour, participants)?;

        let quote = self
            .pricing
            .quote(
                strategy,
                &QuoteRequest {
                    tour_id,
                    start_date: start,
                    end_date: end,
                    participants,
                },
            )
            .await?;

        let report = self
            .catalog
            .get_availability(tour_id, quote.start_date, quote.end_date, participants)
            .await?;
        if !report.available {
            return Err(CoreError::validation(report.message));
        }

        let now = Utc::now();
        let booking = Booking {
            id: Uuid::new_v4(),
            tour_id,
            customer_name,
            email,
            phone,
            start_date: quote.start_date,
            end_date: quote.end_date,
            number_of_participants: participants,
            price_per_person: quote.price_per_person,
            total_price: quote.total_price,
            pricing_strategy: strategy,
            special_requests: request.special_requests.clone().filter(|s| !s.trim().is_empty()),
            status: BookingStatus::Pending,
            admin_viewed: false,
            created_at: now,
            updated_at: now,
        };

        self.acquire_hold(&booking, &tour, &report).await?;
        if let Err(e) = self.bookings.insert(&booking).await {
            tracing::error!(booking_id = %booking.id, error = %e, "Booking write failed, releasing hold");
            self.release_quietly(&booking, &booking.dates()).await;
            return Err(e);
        }
        self.commit_quietly(&booking).await;

        tracing::info!(
            booking_id = %booking.id,
            %tour_id,
            customer = %Masked::of(&booking.email),
            participants,
            total_price = %booking.total_price,
            strategy = ?strategy,
            "Booking created"
        );
        self.notifier.booking_created(&booking, &tour).await;
        Ok(booking)
    }

    /// Partial admin update. Prices are never recomputed.
    pub async fn update(&self, id: Uuid, patch: &BookingPatch) -> CoreResult<Booking> {
        let current = self.get(id).await?;
        let mut updated = current.clone();

        if let Some(name) = &patch.customer_name {
            updated.customer_name = validation::customer_name(name)?;
        }
        if let Some(email) = &patch.email {
            updated.email = validation::email(email)?;
        }
        if let Some(phone) = &patch.phone {
            updated.phone = validation::phone(Some(phone))?;
        }
        if let Some(requests) = &patch.special_requests {
            updated.special_requests = Some(requests.clone()).filter(|s| !s.trim().is_empty());
        }
        if let Some(count) = patch.number_of_participants {
            updated.number_of_participants =
                validation::participants(count, self.settings.max_participants_per_booking)?;
        }
        if let Some(start) = &patch.start_date {
            updated.start_date = parse_date(start)?;
        }
        if let Some(end) = &patch.end_date {
            updated.end_date = parse_date(end)?;
        }
        validation::date_range(updated.start_date, updated.end_date)?;
        if let Some(viewed) = patch.admin_viewed {
            updated.admin_viewed = viewed;
        }
        if let Some(next) = patch.status {
            if next != current.status && !current.status.can_transition_to(next) {
                return Err(CoreError::validation(format!(
                    "Invalid status transition from {} to {}",
                    current.status, next
                )));
            }
            updated.status = next;
        }
        updated.updated_at = Utc::now();

        let footprint_changed = updated.start_date != current.start_date
            || updated.end_date != current.end_date
            || updated.number_of_participants != current.number_of_participants;
        let rehold = footprint_changed && updated.status.holds_capacity();
        if rehold {
            self.rehold(&updated).await?;
        }

        let stored = match self.bookings.update_if_status(&updated, current.status).await {
            Ok(stored) => stored,
            Err(e) => {
                if rehold {
                    self.restore_hold(&current, &updated).await;
                }
                return Err(e);
            }
        };
        if !stored {
            if rehold {
                self.restore_hold(&current, &updated).await;
            }
            return Err(CoreError::validation("Booking status changed concurrently, reload and retry"));
        }

        if rehold {
            self.commit_quietly(&updated).await;
            let dropped: Vec<NaiveDate> = current
                .dates()
                .into_iter()
                .filter(|d| *d < updated.start_date || *d > updated.end_date)
                .collect();
            self.release_quietly(&updated, &dropped).await;
        }
        if updated.status == BookingStatus::Cancelled && current.status != BookingStatus::Cancelled {
            self.release_quietly(&current, &current.dates()).await;
            self.release_quietly(&updated, &updated.dates()).await;
        }

        if updated.status != current.status {
            tracing::info!(booking_id = %id, from = %current.status, to = %updated.status, "Booking status changed");
            if updated.status == BookingStatus::Completed {
                let outcome = self.request_review(&updated).await;
                tracing::info!(booking_id = %id, outcome = outcome.message(), "Completion side effects finished");
            } else {
                self.notify_status(&updated).await;
            }
        }
        Ok(updated)
    }

    pub async fn mark_viewed(&self, id: Uuid) -> CoreResult<()> {
        if !self.bookings.mark_viewed(id).await? {
            return Err(CoreError::NotFound("Booking not found".to_string()));
        }
        Ok(())
    }

    /// confirmed -> completed, followed by the review request.
    ///
    /// Failing to load the tour, issue the token or send the email never undoes
    /// the completion; the outcome says which step degraded.
    pub async fn complete(&self, id: Uuid) -> CoreResult<CompletionReport> {
        let booking = self.get(id).await?;
        if booking.status != BookingStatus::Confirmed {
            return Err(CoreError::validation("Only confirmed bookings can be completed"));
        }
        let mut completed = booking;
        completed.status = BookingStatus::Completed;
        completed.updated_at = Utc::now();
        if !self
            .bookings
            .update_if_status(&completed, BookingStatus::Confirmed)
            .await?
        {
            return Err(CoreError::validation("Only confirmed bookings can be completed"));
        }
        tracing::info!(booking_id = %id, "Booking completed");

        let outcome = self.request_review(&completed).await;
        Ok(CompletionReport {
            booking: completed,
            outcome,
        })
    }

    /// Issues (or reuses) the review token and emails the review link.
    pub async fn request_review(&self, booking: &Booking) -> CompletionOutcome {
        let tour = match self.catalog.get_tour(booking.tour_id).await {
            Ok(tour) => tour,
            Err(e) => {
                tracing::warn!(booking_id = %booking.id, error = %e, "Tour unavailable for review request");
                return CompletionOutcome::TourUnavailable;
            }
        };
        let request = ReviewTokenRequest {
            booking_id: booking.id,
            tour_id: booking.tour_id,
            customer_name: booking.customer_name.clone(),
            customer_email: booking.email.clone(),
        };
        let review_token = match self.reviews.issue_token(&request).await {
            Ok(token) => token,
            Err(e) => {
                tracing::error!(booking_id = %booking.id, error = %e, "Failed to create review token");
                return CompletionOutcome::TokenFailed;
            }
        };
        let email_sent = self.notifier.review_requested(booking, &tour, &review_token).await;
        CompletionOutcome::ReviewRequested {
            review_token,
            email_sent,
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn quote_request(&self, request: &PriceRequest) -> CoreResult<QuoteRequest> {
        Ok(QuoteRequest {
            tour_id: parse_id("tour", &request.tour_id)?,
            start_date: parse_date(&request.start_date)?,
            end_date: request.end_date.as_deref().map(parse_date).transpose()?,
            participants: validation::participants(
                request.number_of_participants,
                self.settings.max_participants_per_booking,
            )?,
        })
    }

    async fn acquire_hold(&self, booking: &Booking, tour: &TourInfo, report: &AvailabilityReport) -> CoreResult<()> {
        let days = capacity_days(report, tour, booking.start_date, booking.end_date);
        let outcome = self
            .holds
            .acquire(
                booking.id,
                booking.tour_id,
                &days,
                booking.number_of_participants,
                self.settings.hold_ttl,
            )
            .await?;
        match outcome {
            HoldOutcome::Held => Ok(()),
            HoldOutcome::Exhausted { date, open_spots, held } => {
                tracing::info!(booking_id = %booking.id, %date, open_spots, held, "Capacity exhausted");
                Err(CoreError::validation(format!(
                    "Not available on: {} ({} of {} spots already booked)",
                    date, held, open_spots
                )))
            }
        }
    }

    async fn rehold(&self, updated: &Booking) -> CoreResult<()> {
        let tour = self.catalog.get_tour(updated.tour_id).await?;
        check_minimum(&tour, updated.number_of_participants)?;
        let report = self
            .catalog
            .get_availability(
                updated.tour_id,
                updated.start_date,
                updated.end_date,
                updated.number_of_participants,
            )
            .await?;
        if !report.available {
            return Err(CoreError::validation(report.message));
        }
        self.acquire_hold(updated, &tour, &report).await
    }

    /// Puts back the spots `current` held before a failed re-hold was written.
    async fn restore_hold(&self, current: &Booking, updated: &Booking) {
        let days: Vec<DayCapacity> = current
            .dates()
            .into_iter()
            .map(|date| DayCapacity {
                date,
                open_spots: u32::MAX,
            })
            .collect();
        let restored = self
            .holds
            .acquire(
                current.id,
                current.tour_id,
                &days,
                current.number_of_participants,
                self.settings.hold_ttl,
            )
            .await;
        if let Err(e) = restored {
            tracing::error!(booking_id = %current.id, error = %e, "Failed to restore capacity hold");
            return;
        }
        self.commit_quietly(current).await;
        let extra: Vec<NaiveDate> = updated
            .dates()
            .into_iter()
            .filter(|d| *d < current.start_date || *d > current.end_date)
            .collect();
        self.release_quietly(updated, &extra).await;
    }

    async fn commit_quietly(&self, booking: &Booking) {
        if let Err(e) = self.holds.commit(booking.id, booking.tour_id, &booking.dates()).await {
            tracing::error!(booking_id = %booking.id, error = %e, "Failed to commit capacity hold");
        }
    }

    async fn release_quietly(&self, booking: &Booking, dates: &[NaiveDate]) {
        if dates.is_empty() {
            return;
        }
        if let Err(e) = self.holds.release(booking.id, booking.tour_id, dates).await {
            tracing::error!(booking_id = %booking.id, error = %e, "Failed to release capacity hold");
        }
    }

    async fn notify_status(&self, booking: &Booking) {
        match self.catalog.get_tour(booking.tour_id).await {
            Ok(tour) => {
                self.notifier.status_changed(booking, &tour).await;
            }
            Err(e) => {
                tracing::warn!(booking_id = %booking.id, error = %e, "Skipping status notification");
            }
        }
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn check_minimum(tour: &TourInfo, participants: u32) -> CoreResult<()> {
    if participants < tour.min_participants {
        return Err(CoreError::validation(format!(
            "Minimum {} participants required",
            tour.min_participants
        )));
    }
    Ok(())
}
