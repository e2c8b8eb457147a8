use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;
use uuid::Uuid;

use tourline_core::catalog::TourInfo;
use tourline_core::CoreResult;

use crate::tour::{AvailabilityRecord, CatalogStore, GroupPricingTier, SeasonalPrice};

#[derive(Default)]
struct CatalogTables {
    tours: HashMap<Uuid, TourInfo>,
    seasons: Vec<SeasonalPrice>,
    tiers: Vec<GroupPricingTier>,
    availability: HashMap<(Uuid, NaiveDate), AvailabilityRecord>,
}

/// In-memory catalog for local runs and tests. Clones share the same tables.
#[derive(Clone, Default)]
pub struct InMemoryCatalogStore {
    tables: Arc<RwLock<CatalogTables>>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put_tour(&self, tour: TourInfo) {
        self.tables.write().await.tours.insert(tour.id, tour);
    }

    pub async fn put_season(&self, season: SeasonalPrice) {
        self.tables.write().await.seasons.push(season);
    }

    pub async fn put_tier(&self, tier: GroupPricingTier) {
        self.tables.write().await.tiers.push(tier);
    }

    pub async fn put_availability(&self, record: AvailabilityRecord) {
        self.tables
            .write()
            .await
            .availability
            .insert((record.tour_id, record.date), record);
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn get_tour(&self, tour_id: Uuid) -> CoreResult<Option<TourInfo>> {
        Ok(self.tables.read().await.tours.get(&tour_id).cloned())
    }

    async fn seasonal_prices(&self, tour_id: Uuid) -> CoreResult<Vec<SeasonalPrice>> {
        let tables = self.tables.read().await;
        Ok(tables.seasons.iter().filter(|s| s.tour_id == tour_id).cloned().collect())
    }

    async fn group_tiers(&self, tour_id: Uuid) -> CoreResult<Vec<GroupPricingTier>> {
        let tables = self.tables.read().await;
        Ok(tables.tiers.iter().filter(|t| t.tour_id == tour_id).cloned().collect())
    }

    async fn availability_records(
        &self,
        tour_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> CoreResult<Vec<AvailabilityRecord>> {
        let tables = self.tables.read().await;
        let mut records: Vec<AvailabilityRecord> = tables
            .availability
            .values()
            .filter(|r| r.tour_id == tour_id && r.date >= start && r.date <= end)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.date);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::LocalCatalog;
    use rust_decimal_macros::dec;
    use tourline_core::catalog::CatalogClient;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[tokio::test]
    async fn test_local_catalog_contracts() {
        let store = InMemoryCatalogStore::new();
        let tour_id = Uuid::new_v4();
        store
            .put_tour(TourInfo {
                id: tour_id,
                title: "Coastal Walk".to_string(),
                base_price: dec!(40.00),
                duration_days: 1,
                max_participants: 8,
                min_participants: 1,
                group_discount_threshold: 5,
                group_discount_percentage: dec!(0),
            })
            .await;
        store
            .put_availability(AvailabilityRecord {
                tour_id,
                date: d("2030-09-02"),
                available_spots: 1,
                is_available: true,
            })
            .await;
        let catalog = LocalCatalog::new(Arc::new(store));

        let unknown = Uuid::new_v4();
        assert!(catalog.get_tour(unknown).await.unwrap_err().is_not_found());
        assert!(catalog.get_group_price(unknown, 2).await.unwrap_err().is_not_found());
        // Seasonal lookups never fail for unknown tours.
        let rate = catalog.get_seasonal_pricing(unknown, d("2030-09-01"), d("2030-09-02")).await.unwrap();
        assert_eq!(rate.season_name, "Regular Season");

        let report = catalog
            .get_availability(tour_id, d("2030-09-01"), d("2030-09-03"), 2)
            .await
            .unwrap();
        assert!(!report.available);
        assert_eq!(report.unavailable_dates, vec![d("2030-09-02")]);

        let quote = catalog.get_group_price(tour_id, 3).await.unwrap();
        assert_eq!(quote.total_price, dec!(120.00));
    }
}
