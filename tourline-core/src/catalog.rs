use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::CoreResult;

pub const REGULAR_SEASON: &str = "Regular Season";
pub const STANDARD_PRICING: &str = "Standard pricing";

/// Read-only view of a tour as the catalog service exposes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TourInfo {
    pub id: Uuid,
    #[serde(default)]
    pub title: String,
    #[serde(alias = "price")]
    pub base_price: Decimal,
    #[serde(default = "default_duration_days")]
    pub duration_days: u32,
    #[serde(default = "default_max_participants")]
    pub max_participants: u32,
    #[serde(default = "default_min_participants")]
    pub min_participants: u32,
    #[serde(default = "default_group_threshold")]
    pub group_discount_threshold: u32,
    #[serde(default)]
    pub group_discount_percentage: Decimal,
}

fn default_duration_days() -> u32 {
    1
}

fn default_max_participants() -> u32 {
    10
}

fn default_min_participants() -> u32 {
    1
}

fn default_group_threshold() -> u32 {
    5
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalRate {
    pub multiplier: Decimal,
    pub season_name: String,
}

impl SeasonalRate {
    /// The rate used when no active season overlaps the requested dates.
    pub fn regular() -> Self {
        Self {
            multiplier: Decimal::ONE,
            season_name: REGULAR_SEASON.to_string(),
        }
    }
}

/// Open capacity the catalog reports for one calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayAvailability {
    pub date: NaiveDate,
    pub open_spots: u32,
    pub is_available: bool,
    /// False when the catalog had no record and assumed full capacity.
    pub recorded: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityReport {
    pub available: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub unavailable_dates: Vec<NaiveDate>,
    #[serde(default)]
    pub max_participants: Option<u32>,
    #[serde(default)]
    pub calendar: Vec<DayAvailability>,
}

/// Flat per-person price for a participant count, from the group tier table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupQuote {
    pub price_per_person: Decimal,
    pub total_price: Decimal,
    pub tier_label: String,
}

/// Contract of the catalog collaborator (tours, seasons, tiers and per-date capacity).
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Fails with `NotFound` when the tour does not exist.
    async fn get_tour(&self, tour_id: Uuid) -> CoreResult<TourInfo>;

    /// Never fails for an unknown tour; falls back to [`SeasonalRate::regular`].
    async fn get_seasonal_pricing(
        &self,
        tour_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> CoreResult<SeasonalRate>;

    async fn get_availability(
        &self,
        tour_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        participants: u32,
    ) -> CoreResult<AvailabilityReport>;

    /// Falls back to the tour's base price when no tier matches; `NotFound` only for unknown tours.
    async fn get_group_price(&self, tour_id: Uuid, participants: u32) -> CoreResult<GroupQuote>;

    async fn health_check(&self) -> bool {
        true
    }
}
