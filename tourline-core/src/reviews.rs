use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::CoreResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewTokenRequest {
    pub booking_id: Uuid,
    pub tour_id: Uuid,
    pub customer_name: String,
    pub customer_email: String,
}

/// Issues the one-time credential that lets a guest review a completed booking.
///
/// Implementations must be idempotent per booking: a second call for the same
/// `booking_id` returns the token issued by the first.
#[async_trait]
pub trait ReviewTokenIssuing: Send + Sync {
    async fn issue_token(&self, request: &ReviewTokenRequest) -> CoreResult<String>;
}
