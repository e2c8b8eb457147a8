use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tourline_core::catalog::{CatalogClient, GroupQuote, SeasonalRate, TourInfo};
use tourline_core::{CoreError, CoreResult};
use tourline_shared::dates::days_inclusive;
use tourline_shared::money::percentage_of;
use tourline_shared::round_currency;

/// The two pricing models a booking can be priced with. They are never mixed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PricingStrategy {
    /// Base price x seasonal multiplier, less the tour's threshold discount, per day and person.
    #[default]
    SeasonalPerDay,
    /// Flat per-person price from the group tier table for the whole trip.
    GroupTierFlat,
}

impl PricingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            PricingStrategy::SeasonalPerDay => "SEASONAL_PER_DAY",
            PricingStrategy::GroupTierFlat => "GROUP_TIER_FLAT",
        }
    }
}

impl std::str::FromStr for PricingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SEASONAL_PER_DAY" => Ok(PricingStrategy::SeasonalPerDay),
            "GROUP_TIER_FLAT" => Ok(PricingStrategy::GroupTierFlat),
            other => Err(format!("Unknown pricing strategy: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub tour_id: Uuid,
    pub start_date: NaiveDate,
    /// Required for per-day pricing; derived from the tour duration for group tiers.
    pub end_date: Option<NaiveDate>,
    pub participants: u32,
}

/// Itemized amounts for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub base_price: Decimal,
    pub seasonal_adjustment: Decimal,
    pub group_discount_amount: Decimal,
    pub duration_days: u32,
    pub participants: u32,
    pub calculation_steps: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceQuote {
    pub tour_id: Uuid,
    pub strategy: PricingStrategy,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub duration_days: u32,
    pub number_of_participants: u32,
    pub base_price: Decimal,
    pub seasonal_multiplier: Decimal,
    pub season_name: String,
    pub group_discount_percentage: Decimal,
    pub tier_label: Option<String>,
    /// Only set for per-day pricing.
    pub price_per_day: Option<Decimal>,
    pub price_per_person: Decimal,
    pub total_price: Decimal,
    pub breakdown: PriceBreakdown,
}

/// Composes catalog data into a frozen price for a party and date range.
pub struct PriceCalculationEngine {
    catalog: Arc<dyn CatalogClient>,
}

impl PriceCalculationEngine {
    pub fn new(catalog: Arc<dyn CatalogClient>) -> Self {
        Self { catalog }
    }

    pub async fn quote(&self, strategy: PricingStrategy, request: &QuoteRequest) -> CoreResult<PriceQuote> {
        if request.participants == 0 {
            return Err(CoreError::validation("Number of participants must be at least 1"));
        }
        match strategy {
            PricingStrategy::SeasonalPerDay => self.quote_seasonal(request).await,
            PricingStrategy::GroupTierFlat => self.quote_group_tier(request).await,
        }
    }

    async fn quote_seasonal(&self, request: &QuoteRequest) -> CoreResult<PriceQuote> {
        let end = request
            .end_date
            .ok_or_else(|| CoreError::validation("End date is required for per-day pricing"))?;
        if end < request.start_date {
            return Err(CoreError::validation("End date must be after start date"));
        }
        let tour = self.catalog.get_tour(request.tour_id).await?;
        let rate = self
            .catalog
            .get_seasonal_pricing(request.tour_id, request.start_date, end)
            .await?;
        price_seasonal_per_day(&tour, &rate, request.start_date, end, request.participants)
    }

    async fn quote_group_tier(&self, request: &QuoteRequest) -> CoreResult<PriceQuote> {
        let tour = self.catalog.get_tour(request.tour_id).await?;
        let end = trip_end(request.start_date, tour.duration_days)?;
        let group = self
            .catalog
            .get_group_price(request.tour_id, request.participants)
            .await?;
        let rate = self
            .catalog
            .get_seasonal_pricing(request.tour_id, request.start_date, end)
            .await?;
        Ok(price_group_tier(&tour, &group, &rate, request.start_date, end, request.participants))
    }
}

/// Group-tier trips end `duration_days` after they start.
pub fn trip_end(start: NaiveDate, duration_days: u32) -> CoreResult<NaiveDate> {
    start
        .checked_add_signed(Duration::days(i64::from(duration_days)))
        .ok_or_else(|| CoreError::InvalidDate(format!("Trip starting {} ends out of range", start)))
}

/// Per-day pricing. `total = round(price_per_day) x days x participants`, rounded half-up.
pub fn price_seasonal_per_day(
    tour: &TourInfo,
    rate: &SeasonalRate,
    start: NaiveDate,
    end: NaiveDate,
    participants: u32,
) -> CoreResult<PriceQuote> {
    let duration_days = u32::try_from(days_inclusive(start, end))
        .map_err(|_| CoreError::validation("End date must be after start date"))?;

    let base_price = tour.base_price;
    let seasonal_price = base_price * rate.multiplier;

    let discount_percentage = if participants >= tour.group_discount_threshold
        && tour.group_discount_percentage > Decimal::ZERO
    {
        tour.group_discount_percentage
    } else {
        Decimal::ZERO
    };
    let discount_amount = percentage_of(seasonal_price, discount_percentage);

    let price_per_day = round_currency(seasonal_price - discount_amount);
    let total_price =
        round_currency(price_per_day * Decimal::from(duration_days) * Decimal::from(participants));

    let calculation_steps = vec![
        format!("Base price per day: ${}", base_price),
        format!(
            "Seasonal multiplier ({}): {}x = ${} per day",
            rate.season_name,
            rate.multiplier,
            round_currency(seasonal_price)
        ),
        format!(
            "Group discount ({}%): -${} per day",
            discount_percentage,
            round_currency(discount_amount)
        ),
        format!("Final price per day: ${}", price_per_day),
        format!("Duration: {} days", duration_days),
        format!("Participants: {}", participants),
        format!(
            "Total: ${} × {} days × {} participants = ${}",
            price_per_day, duration_days, participants, total_price
        ),
    ];

    Ok(PriceQuote {
        tour_id: tour.id,
        strategy: PricingStrategy::SeasonalPerDay,
        start_date: start,
        end_date: end,
        duration_days,
        number_of_participants: participants,
        base_price,
        seasonal_multiplier: rate.multiplier,
        season_name: rate.season_name.clone(),
        group_discount_percentage: discount_percentage,
        tier_label: None,
        price_per_day: Some(price_per_day),
        price_per_person: price_per_day,
        total_price,
        breakdown: PriceBreakdown {
            base_price,
            seasonal_adjustment: round_currency(seasonal_price - base_price),
            group_discount_amount: round_currency(discount_amount),
            duration_days,
            participants,
            calculation_steps,
        },
    })
}

/// Flat trip pricing: `price_per_person = round(tier price x multiplier)`.
pub fn price_group_tier(
    tour: &TourInfo,
    group: &GroupQuote,
    rate: &SeasonalRate,
    start: NaiveDate,
    end: NaiveDate,
    participants: u32,
) -> PriceQuote {
    let tier_price = group.price_per_person;
    let seasonal_price = tier_price * rate.multiplier;
    let price_per_person = round_currency(seasonal_price);
    let total_price = round_currency(price_per_person * Decimal::from(participants));

    let calculation_steps = vec![
        format!("Group tier ({}): ${} per person", group.tier_label, tier_price),
        format!(
            "Seasonal multiplier ({}): {}x = ${} per person",
            rate.season_name, rate.multiplier, price_per_person
        ),
        format!("Duration: {} days", tour.duration_days),
        format!("Participants: {}", participants),
        format!(
            "Total: ${} × {} participants = ${}",
            price_per_person, participants, total_price
        ),
    ];

    PriceQuote {
        tour_id: tour.id,
        strategy: PricingStrategy::GroupTierFlat,
        start_date: start,
        end_date: end,
        duration_days: tour.duration_days,
        number_of_participants: participants,
        base_price: tier_price,
        seasonal_multiplier: rate.multiplier,
        season_name: rate.season_name.clone(),
        group_discount_percentage: Decimal::ZERO,
        tier_label: Some(group.tier_label.clone()),
        price_per_day: None,
        price_per_person,
        total_price,
        breakdown: PriceBreakdown {
            base_price: tier_price,
            seasonal_adjustment: round_currency(seasonal_price - tier_price),
            group_discount_amount: Decimal::ZERO,
            duration_days: tour.duration_days,
            participants,
            calculation_steps,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    use crate::local::LocalCatalog;
    use crate::memory::InMemoryCatalogStore;
    use crate::tour::{GroupPricingTier, SeasonalPrice};

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn tour(base: Decimal, threshold: u32, pct: Decimal) -> TourInfo {
        TourInfo {
            id: Uuid::new_v4(),
            title: "Atlas Valleys".to_string(),
            base_price: base,
            duration_days: 3,
            max_participants: 20,
            min_participants: 1,
            group_discount_threshold: threshold,
            group_discount_percentage: pct,
        }
    }

    #[test]
    fn test_regular_season_no_discount() {
        let quote = price_seasonal_per_day(
            &tour(dec!(100.00), 5, dec!(0)),
            &SeasonalRate::regular(),
            d("2030-04-01"),
            d("2030-04-03"),
            2,
        )
        .unwrap();
        assert_eq!(quote.duration_days, 3);
        assert_eq!(quote.price_per_day, Some(dec!(100.00)));
        assert_eq!(quote.total_price, dec!(600.00));
        assert_eq!(quote.season_name, "Regular Season");
        assert_eq!(
            quote.breakdown.calculation_steps.last().unwrap(),
            "Total: $100.00 × 3 days × 2 participants = $600.00"
        );
    }

    #[test]
    fn test_discount_applies_at_threshold_only() {
        let t = tour(dec!(80.00), 5, dec!(10));
        let rate = SeasonalRate { multiplier: dec!(1.25), season_name: "Summer".to_string() };

        let below = price_seasonal_per_day(&t, &rate, d("2030-07-01"), d("2030-07-01"), 4).unwrap();
        assert_eq!(below.group_discount_percentage, dec!(0));
        assert_eq!(below.price_per_person, dec!(100.00));

        let at = price_seasonal_per_day(&t, &rate, d("2030-07-01"), d("2030-07-02"), 5).unwrap();
        assert_eq!(at.group_discount_percentage, dec!(10));
        assert_eq!(at.price_per_person, dec!(90.00));
        assert_eq!(at.total_price, dec!(900.00));
        assert_eq!(at.breakdown.group_discount_amount, dec!(10.00));
    }

    #[test]
    fn test_total_uses_rounded_daily_price() {
        // 33.335 rounds half-up to 33.34 before multiplying.
        let t = tour(dec!(33.335), 5, dec!(0));
        let quote =
            price_seasonal_per_day(&t, &SeasonalRate::regular(), d("2030-01-01"), d("2030-01-03"), 3).unwrap();
        assert_eq!(quote.price_per_person, dec!(33.34));
        assert_eq!(quote.total_price, dec!(300.06));
    }

    #[test]
    fn test_group_tier_flat() {
        let t = tour(dec!(120.00), 5, dec!(15));
        let group = GroupQuote {
            price_per_person: dec!(95.50),
            total_price: dec!(382.00),
            tier_label: "3-6 people".to_string(),
        };
        let rate = SeasonalRate { multiplier: dec!(1.1), season_name: "Spring".to_string() };
        let end = trip_end(d("2030-05-01"), t.duration_days).unwrap();
        let quote = price_group_tier(&t, &group, &rate, d("2030-05-01"), end, 4);
        assert_eq!(quote.end_date, d("2030-05-04"));
        assert_eq!(quote.price_per_person, dec!(105.05));
        assert_eq!(quote.total_price, dec!(420.20));
        assert_eq!(quote.price_per_day, None);
        assert_eq!(quote.group_discount_percentage, dec!(0));
    }

    async fn engine_with(tour: TourInfo) -> (PriceCalculationEngine, InMemoryCatalogStore) {
        let store = InMemoryCatalogStore::new();
        store.put_tour(tour).await;
        let catalog = LocalCatalog::new(Arc::new(store.clone()));
        (PriceCalculationEngine::new(Arc::new(catalog)), store)
    }

    #[tokio::test]
    async fn test_engine_seasonal_quote() {
        let t = tour(dec!(100.00), 5, dec!(0));
        let tour_id = t.id;
        let (engine, store) = engine_with(t).await;
        store
            .put_season(SeasonalPrice {
                id: Uuid::new_v4(),
                tour_id,
                season_name: "Peak".to_string(),
                start_date: d("2030-08-01"),
                end_date: d("2030-08-31"),
                multiplier: dec!(1.5),
                is_active: true,
                created_at: chrono::Utc::now(),
            })
            .await;

        let request = QuoteRequest {
            tour_id,
            start_date: d("2030-08-10"),
            end_date: Some(d("2030-08-11")),
            participants: 2,
        };
        let quote = engine.quote(PricingStrategy::SeasonalPerDay, &request).await.unwrap();
        assert_eq!(quote.season_name, "Peak");
        assert_eq!(quote.price_per_person, dec!(150.00));
        assert_eq!(quote.total_price, dec!(600.00));
    }

    #[tokio::test]
    async fn test_engine_group_tier_quote() {
        let t = tour(dec!(100.00), 5, dec!(0));
        let tour_id = t.id;
        let (engine, store) = engine_with(t).await;
        store
            .put_tier(GroupPricingTier {
                id: Uuid::new_v4(),
                tour_id,
                min_participants: 1,
                max_participants: 4,
                price_per_person: dec!(85.00),
            })
            .await;

        let request = QuoteRequest { tour_id, start_date: d("2030-02-01"), end_date: None, participants: 4 };
        let quote = engine.quote(PricingStrategy::GroupTierFlat, &request).await.unwrap();
        assert_eq!(quote.tier_label.as_deref(), Some("1-4 people"));
        assert_eq!(quote.total_price, dec!(340.00));
        assert_eq!(quote.end_date, d("2030-02-04"));
    }

    #[tokio::test]
    async fn test_engine_errors() {
        let (engine, _) = engine_with(tour(dec!(10.00), 5, dec!(0))).await;
        let missing = QuoteRequest {
            tour_id: Uuid::new_v4(),
            start_date: d("2030-02-01"),
            end_date: Some(d("2030-02-02")),
            participants: 1,
        };
        let err = engine.quote(PricingStrategy::SeasonalPerDay, &missing).await.unwrap_err();
        assert!(err.is_not_found());

        let reversed = QuoteRequest { end_date: Some(d("2030-01-30")), ..missing.clone() };
        let err = engine.quote(PricingStrategy::SeasonalPerDay, &reversed).await.unwrap_err();
        assert!(matches!(err, CoreError::ValidationError(_)));

        let open_ended = QuoteRequest { end_date: None, ..missing };
        let err = engine.quote(PricingStrategy::SeasonalPerDay, &open_ended).await.unwrap_err();
        assert!(matches!(err, CoreError::ValidationError(_)));
    }
}
