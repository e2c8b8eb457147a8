use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub dependencies: Dependencies,
}

#[derive(Debug, Serialize)]
pub struct Dependencies {
    pub tours_service: &'static str,
    pub messaging_service: &'static str,
}

fn label(up: bool) -> &'static str {
    if up {
        "healthy"
    } else {
        "unhealthy"
    }
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

/// GET /health
/// Always 200; collaborator probes are reported, never propagated.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let timeout = state.health_timeout;
    let (tours, messaging) = tokio::join!(
        tokio::time::timeout(timeout, state.catalog.health_check()),
        tokio::time::timeout(timeout, state.notifications.health_check()),
    );
    let tours_up = tours.unwrap_or(false);
    let messaging_up = messaging.unwrap_or(false);
    if !tours_up || !messaging_up {
        tracing::warn!(tours_up, messaging_up, "Collaborator health probe failed");
    }

    Json(HealthResponse {
        status: "healthy",
        service: "booking-service",
        dependencies: Dependencies {
            tours_service: label(tours_up),
            messaging_service: label(messaging_up),
        },
    })
}
