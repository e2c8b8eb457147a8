use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use tourline_core::catalog::SeasonalRate;
use tourline_core::CoreResult;

use crate::tour::{CatalogStore, SeasonalPrice};

/// Picks the seasonal entry that applies to `[start, end]`.
///
/// Only active entries overlapping the range qualify. Among several, the
/// narrowest range wins, then the latest start date, then the most recently
/// created entry, then the lowest id.
pub fn select_season(
    entries: &[SeasonalPrice],
    start: NaiveDate,
    end: NaiveDate,
) -> Option<&SeasonalPrice> {
    entries
        .iter()
        .filter(|entry| entry.is_active && entry.overlaps(start, end))
        .min_by(|a, b| {
            a.span_days()
                .cmp(&b.span_days())
                .then_with(|| b.start_date.cmp(&a.start_date))
                .then_with(|| b.created_at.cmp(&a.created_at))
                .then_with(|| a.id.cmp(&b.id))
        })
}

pub struct SeasonalPricingResolver {
    store: Arc<dyn CatalogStore>,
}

impl SeasonalPricingResolver {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// Unknown tours resolve to the regular season rather than failing.
    pub async fn resolve(
        &self,
        tour_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> CoreResult<SeasonalRate> {
        let entries = self.store.seasonal_prices(tour_id).await?;
        let rate = match select_season(&entries, start, end) {
            Some(entry) => SeasonalRate {
                multiplier: entry.multiplier,
                season_name: entry.season_name.clone(),
            },
            None => SeasonalRate::regular(),
        };
        tracing::debug!(%tour_id, season = %rate.season_name, multiplier = %rate.multiplier, "Resolved seasonal rate");
        Ok(rate)
    }
}
