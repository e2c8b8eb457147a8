use axum::{extract::State, routing::post, Json, Router};

use tourline_booking::PriceRequest;
use tourline_catalog::{PriceQuote, PricingStrategy};
use tourline_core::catalog::AvailabilityReport;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/bookings/calculate-price", post(calculate_price))
        .route("/bookings/check-availability", post(check_availability))
        .route("/v2/bookings/calculate-price", post(calculate_group_price))
}

/// POST /bookings/calculate-price
pub async fn calculate_price(
    State(state): State<AppState>,
    Json(req): Json<PriceRequest>,
) -> Result<Json<PriceQuote>, AppError> {
    Ok(Json(state.lifecycle.quote(PricingStrategy::SeasonalPerDay, &req).await?))
}

/// POST /v2/bookings/calculate-price
pub async fn calculate_group_price(
    State(state): State<AppState>,
    Json(req): Json<PriceRequest>,
) -> Result<Json<PriceQuote>, AppError> {
    Ok(Json(state.lifecycle.quote(PricingStrategy::GroupTierFlat, &req).await?))
}

/// POST /bookings/check-availability
/// Spots held by existing bookings are already subtracted.
pub async fn check_availability(
    State(state): State<AppState>,
    Json(req): Json<PriceRequest>,
) -> Result<Json<AvailabilityReport>, AppError> {
    Ok(Json(state.lifecycle.check_availability(&req).await?))
}
