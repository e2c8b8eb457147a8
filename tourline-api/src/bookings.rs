use axum::{
    extract::{Path, Query, State},
    routing::{get, patch, post},
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use tourline_booking::{Booking, BookingPatch, BookingQuery, BookingRequest};
use tourline_catalog::PricingStrategy;
use tourline_core::parse_id;

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct CompletionResponse {
    pub message: String,
    pub booking_id: Uuid,
    pub status: String,
    pub email_sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_token: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/bookings", post(create_booking).get(list_bookings))
        .route("/bookings/{id}", get(get_booking).put(update_booking))
        .route("/bookings/{id}/mark-viewed", patch(mark_viewed))
        .route("/bookings/{id}/complete", post(complete_booking))
        .route("/v2/bookings", post(create_group_booking))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /bookings
/// Per-day seasonal pricing unless the request names another strategy.
pub async fn create_booking(
    State(state): State<AppState>,
    Json(req): Json<BookingRequest>,
) -> Result<Json<Booking>, AppError> {
    let booking = state.lifecycle.create(&req, PricingStrategy::SeasonalPerDay).await?;
    Ok(Json(booking))
}

/// POST /v2/bookings
/// Group tier pricing from a start date; the end date follows the tour duration.
pub async fn create_group_booking(
    State(state): State<AppState>,
    Json(req): Json<BookingRequest>,
) -> Result<Json<Booking>, AppError> {
    let booking = state.lifecycle.create(&req, PricingStrategy::GroupTierFlat).await?;
    Ok(Json(booking))
}

/// GET /bookings
pub async fn list_bookings(
    State(state): State<AppState>,
    Query(query): Query<BookingQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    Ok(Json(state.lifecycle.list(&query).await?))
}

/// GET /bookings/{id}
pub async fn get_booking(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Booking>, AppError> {
    let id = parse_id("booking", &id)?;
    Ok(Json(state.lifecycle.get(id).await?))
}

/// PUT /bookings/{id}
pub async fn update_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<BookingPatch>,
) -> Result<Json<Booking>, AppError> {
    let id = parse_id("booking", &id)?;
    Ok(Json(state.lifecycle.update(id, &patch).await?))
}

/// PATCH /bookings/{id}/mark-viewed
pub async fn mark_viewed(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = parse_id("booking", &id)?;
    state.lifecycle.mark_viewed(id).await?;
    Ok(Json(MessageResponse {
        message: "Booking marked as viewed".to_string(),
    }))
}

/// POST /bookings/{id}/complete
/// The booking stays completed even when the review request degrades.
pub async fn complete_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CompletionResponse>, AppError> {
    let id = parse_id("booking", &id)?;
    let report = state.lifecycle.complete(id).await?;
    Ok(Json(CompletionResponse {
        message: report.outcome.message().to_string(),
        booking_id: report.booking.id,
        status: report.booking.status.to_string(),
        email_sent: report.outcome.email_sent(),
        review_token: report.outcome.review_token().map(str::to_string),
    }))
}
