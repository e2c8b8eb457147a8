use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use tourline_catalog::{AvailabilityRecord, CatalogStore, GroupPricingTier, SeasonalPrice};
use tourline_core::catalog::TourInfo;
use tourline_core::CoreResult;

use crate::database::{persistence, to_u32};

#[derive(sqlx::FromRow)]
struct TourRow {
    id: Uuid,
    title: String,
    base_price: Decimal,
    duration_days: i32,
    max_participants: i32,
    min_participants: i32,
    group_discount_threshold: i32,
    group_discount_percentage: Decimal,
}

#[derive(sqlx::FromRow)]
struct SeasonRow {
    id: Uuid,
    tour_id: Uuid,
    season_name: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    multiplier: Decimal,
    is_active: bool,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct TierRow {
    id: Uuid,
    tour_id: Uuid,
    min_participants: i32,
    max_participants: i32,
    price_per_person: Decimal,
}

#[derive(sqlx::FromRow)]
struct AvailabilityRow {
    tour_id: Uuid,
    date: NaiveDate,
    available_spots: i32,
    is_available: bool,
}

/// Catalog tables read straight from Postgres, for `catalog.source = "local"`.
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn get_tour(&self, tour_id: Uuid) -> CoreResult<Option<TourInfo>> {
        let row = sqlx::query_as::<_, TourRow>(
            r#"
            SELECT id, title, base_price, duration_days, max_participants, min_participants,
                   group_discount_threshold, group_discount_percentage
            FROM tours WHERE id = $1
            "#,
        )
        .bind(tour_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence)?;

        row.map(|r| -> CoreResult<TourInfo> {
            Ok(TourInfo {
                id: r.id,
                title: r.title,
                base_price: r.base_price,
                duration_days: to_u32("duration_days", r.duration_days)?,
                max_participants: to_u32("max_participants", r.max_participants)?,
                min_participants: to_u32("min_participants", r.min_participants)?,
                group_discount_threshold: to_u32("group_discount_threshold", r.group_discount_threshold)?,
                group_discount_percentage: r.group_discount_percentage,
            })
        })
        .transpose()
    }

    async fn seasonal_prices(&self, tour_id: Uuid) -> CoreResult<Vec<SeasonalPrice>> {
        let rows = sqlx::query_as::<_, SeasonRow>(
            r#"
            SELECT id, tour_id, season_name, start_date, end_date, multiplier, is_active, created_at
            FROM seasonal_pricing WHERE tour_id = $1
            "#,
        )
        .bind(tour_id)
        .fetch_all(&self.pool)
        .await
        .map_err(persistence)?;

        Ok(rows
            .into_iter()
            .map(|r| SeasonalPrice {
                id: r.id,
                tour_id: r.tour_id,
                season_name: r.season_name,
                start_date: r.start_date,
                end_date: r.end_date,
                multiplier: r.multiplier,
                is_active: r.is_active,
                created_at: r.created_at,
            })
            .collect())
    }

    async fn group_tiers(&self, tour_id: Uuid) -> CoreResult<Vec<GroupPricingTier>> {
        let rows = sqlx::query_as::<_, TierRow>(
            r#"
            SELECT id, tour_id, min_participants, max_participants, price_per_person
            FROM group_pricing_tiers WHERE tour_id = $1
            ORDER BY min_participants, max_participants
            "#,
        )
        .bind(tour_id)
        .fetch_all(&self.pool)
        .await
        .map_err(persistence)?;

        rows.into_iter()
            .map(|r| -> CoreResult<GroupPricingTier> {
                Ok(GroupPricingTier {
                    id: r.id,
                    tour_id: r.tour_id,
                    min_participants: to_u32("min_participants", r.min_participants)?,
                    max_participants: to_u32("max_participants", r.max_participants)?,
                    price_per_person: r.price_per_person,
                })
            })
            .collect()
    }

    async fn availability_records(
        &self,
        tour_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> CoreResult<Vec<AvailabilityRecord>> {
        let rows = sqlx::query_as::<_, AvailabilityRow>(
            r#"
            SELECT tour_id, date, available_spots, is_available
            FROM tour_availability
            WHERE tour_id = $1 AND date BETWEEN $2 AND $3
            ORDER BY date
            "#,
        )
        .bind(tour_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(persistence)?;

        // Negative spots can only come from manual edits; treat them as sold out.
        Ok(rows
            .into_iter()
            .map(|r| AvailabilityRecord {
                tour_id: r.tour_id,
                date: r.date,
                available_spots: u32::try_from(r.available_spots).unwrap_or(0),
                is_available: r.is_available,
            })
            .collect())
    }
}
