use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use tourline_booking::models::{PublishedReview, RatingStats};
use tourline_booking::{validation, PriceRequest};
use tourline_core::catalog::{AvailabilityReport, GroupQuote, SeasonalRate};
use tourline_core::parse_id;
use tourline_shared::parse_date;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DateRangeQuery {
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub start_date: String,
    pub end_date: String,
    #[serde(default = "one")]
    pub participants: u32,
}

#[derive(Debug, Deserialize)]
pub struct GroupPriceQuery {
    pub participants: u32,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub skip: u32,
    #[serde(default = "default_page")]
    pub limit: u32,
}

fn one() -> u32 {
    1
}

fn default_page() -> u32 {
    50
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tours/{id}/seasonal-pricing", get(seasonal_pricing))
        .route("/tours/{id}/availability", get(availability))
        .route("/tours/{id}/group-price", get(group_price))
        .route("/tours/{id}/reviews", get(tour_reviews))
        .route("/tours/{id}/rating-stats", get(rating_stats))
}

/// GET /tours/{id}/seasonal-pricing?start_date=..&end_date=..
pub async fn seasonal_pricing(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<DateRangeQuery>,
) -> Result<Json<SeasonalRate>, AppError> {
    let tour_id = parse_id("tour", &id)?;
    let (start, end) = (parse_date(&q.start_date)?, parse_date(&q.end_date)?);
    validation::date_range(start, end)?;
    Ok(Json(state.catalog.get_seasonal_pricing(tour_id, start, end).await?))
}

/// GET /tours/{id}/availability?start_date=..&end_date=..&participants=..
pub async fn availability(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityReport>, AppError> {
    let request = PriceRequest {
        tour_id: id,
        start_date: q.start_date,
        end_date: Some(q.end_date),
        number_of_participants: q.participants,
    };
    Ok(Json(state.lifecycle.check_availability(&request).await?))
}

/// GET /tours/{id}/group-price?participants=..
pub async fn group_price(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<GroupPriceQuery>,
) -> Result<Json<GroupQuote>, AppError> {
    let tour_id = parse_id("tour", &id)?;
    if q.participants == 0 {
        return Err(AppError::Validation("At least 1 participant required".to_string()));
    }
    Ok(Json(state.catalog.get_group_price(tour_id, q.participants).await?))
}

/// GET /tours/{id}/reviews
pub async fn tour_reviews(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<PublishedReview>>, AppError> {
    let tour_id = parse_id("tour", &id)?;
    Ok(Json(state.reviews.published(tour_id, page.skip, page.limit.min(100)).await?))
}

/// GET /tours/{id}/rating-stats
pub async fn rating_stats(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RatingStats>, AppError> {
    let tour_id = parse_id("tour", &id)?;
    Ok(Json(state.reviews.rating_stats(tour_id).await?))
}
