use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use tourline_core::catalog::{AvailabilityReport, CatalogClient, GroupQuote, SeasonalRate, TourInfo};
use tourline_core::{CoreError, CoreResult};

use crate::group::GroupPricingSelector;
use crate::inventory::AvailabilityChecker;
use crate::seasonal::SeasonalPricingResolver;
use crate::tour::CatalogStore;

/// `CatalogClient` answered in-process from a `CatalogStore`.
pub struct LocalCatalog {
    store: Arc<dyn CatalogStore>,
    seasons: SeasonalPricingResolver,
    groups: GroupPricingSelector,
}

impl LocalCatalog {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self {
            seasons: SeasonalPricingResolver::new(store.clone()),
            groups: GroupPricingSelector::new(store.clone()),
            store,
        }
    }
}

#[async_trait]
impl CatalogClient for LocalCatalog {
    async fn get_tour(&self, tour_id: Uuid) -> CoreResult<TourInfo> {
        self.store
            .get_tour(tour_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Tour", tour_id))
    }

    async fn get_seasonal_pricing(
        &self,
        tour_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> CoreResult<SeasonalRate> {
        self.seasons.resolve(tour_id, start, end).await
    }

    async fn get_availability(
        &self,
        tour_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        participants: u32,
    ) -> CoreResult<AvailabilityReport> {
        let tour = self.get_tour(tour_id).await?;
        let records = self.store.availability_records(tour_id, start, end).await?;
        Ok(AvailabilityChecker::evaluate(&tour, &records, start, end, participants))
    }

    async fn get_group_price(&self, tour_id: Uuid, participants: u32) -> CoreResult<GroupQuote> {
        self.groups.quote(tour_id, participants).await
    }
}
