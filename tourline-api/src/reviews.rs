use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use tourline_booking::models::{PublishedReview, ReviewForm, ReviewSubmission};
use tourline_core::reviews::{ReviewTokenIssuing, ReviewTokenRequest};

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub message: String,
    pub review: PublishedReview,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/reviews/create-token", post(create_token))
        .route("/reviews/form/{token}", get(review_form))
        .route("/reviews/submit/{token}", post(submit_review))
}

/// POST /reviews/create-token
/// Repeat calls for the same booking return the same token.
pub async fn create_token(
    State(state): State<AppState>,
    Json(req): Json<ReviewTokenRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let token = state.reviews.issue_token(&req).await?;
    Ok(Json(TokenResponse { token }))
}

/// GET /reviews/form/{token}
pub async fn review_form(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<ReviewForm>, AppError> {
    Ok(Json(state.reviews.form(&token).await?))
}

/// POST /reviews/submit/{token}
pub async fn submit_review(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(submission): Json<ReviewSubmission>,
) -> Result<Json<SubmitResponse>, AppError> {
    let record = state.reviews.submit(&token, &submission).await?;
    Ok(Json(SubmitResponse {
        message: "Review submitted successfully".to_string(),
        review: record.into(),
    }))
}
