use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tourline_core::catalog::TourInfo;
use tourline_core::CoreResult;
use tourline_shared::dates::days_inclusive;

/// A multiplier applied to a tour's base price over an inclusive date range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonalPrice {
    pub id: Uuid,
    pub tour_id: Uuid,
    pub season_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub multiplier: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl SeasonalPrice {
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start_date <= end && self.end_date >= start
    }

    pub fn span_days(&self) -> i64 {
        days_inclusive(self.start_date, self.end_date)
    }
}

/// Flat per-person price for an inclusive participant band.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupPricingTier {
    pub id: Uuid,
    pub tour_id: Uuid,
    pub min_participants: u32,
    pub max_participants: u32,
    pub price_per_person: Decimal,
}

impl GroupPricingTier {
    pub fn covers(&self, participants: u32) -> bool {
        self.min_participants <= participants && participants <= self.max_participants
    }

    pub fn label(&self) -> String {
        format!("{}-{} people", self.min_participants, self.max_participants)
    }
}

/// Recorded capacity for one tour on one date. A missing record means full capacity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityRecord {
    pub tour_id: Uuid,
    pub date: NaiveDate,
    pub available_spots: u32,
    pub is_available: bool,
}

/// Read port over the catalog's own tables.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn get_tour(&self, tour_id: Uuid) -> CoreResult<Option<TourInfo>>;

    /// Active and inactive entries alike; filtering happens in the resolver.
    async fn seasonal_prices(&self, tour_id: Uuid) -> CoreResult<Vec<SeasonalPrice>>;

    async fn group_tiers(&self, tour_id: Uuid) -> CoreResult<Vec<GroupPricingTier>>;

    async fn availability_records(
        &self,
        tour_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> CoreResult<Vec<AvailabilityRecord>>;
}
