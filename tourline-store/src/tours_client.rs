use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use uuid::Uuid;

use tourline_core::catalog::{AvailabilityReport, CatalogClient, GroupQuote, SeasonalRate, TourInfo};
use tourline_core::reviews::{ReviewTokenIssuing, ReviewTokenRequest};
use tourline_core::{CoreError, CoreResult};

use crate::resiliency::CircuitBreaker;

const SERVICE: &str = "tours-service";

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

/// Catalog and review-token collaborator reached over HTTP, behind a circuit breaker.
pub struct HttpCatalogClient {
    http: reqwest::Client,
    base_url: String,
    health_timeout: Duration,
    breaker: CircuitBreaker,
}

impl HttpCatalogClient {
    pub fn new(base_url: &str, request_timeout: Duration, health_timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            health_timeout,
            breaker: CircuitBreaker::new(SERVICE, 5, Duration::from_secs(30)),
        })
    }

    pub fn with_breaker(mut self, threshold: usize, reset_timeout: Duration) -> Self {
        self.breaker = CircuitBreaker::new(SERVICE, threshold, reset_timeout);
        self
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder, missing: CoreError) -> CoreResult<T> {
        if !self.breaker.check().await {
            return Err(CoreError::dependency(SERVICE, "circuit open"));
        }
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                self.breaker.record_failure().await;
                tracing::error!(error = %e, "Request to {} failed", SERVICE);
                return Err(CoreError::dependency(SERVICE, e));
            }
        };

        let status = response.status();
        if status.is_server_error() {
            self.breaker.record_failure().await;
        } else {
            self.breaker.record_success().await;
        }
        if status == StatusCode::NOT_FOUND {
            return Err(missing);
        }
        if !status.is_success() {
            tracing::error!(%status, "{} returned an error status", SERVICE);
            return Err(CoreError::dependency(SERVICE, format!("status {}", status)));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| CoreError::dependency(SERVICE, format!("invalid response body: {}", e)))
    }

    fn tour_url(&self, tour_id: Uuid, suffix: &str) -> String {
        format!("{}/tours/{}{}", self.base_url, tour_id, suffix)
    }
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    async fn get_tour(&self, tour_id: Uuid) -> CoreResult<TourInfo> {
        let request = self.http.get(self.tour_url(tour_id, ""));
        self.send(request, CoreError::not_found("Tour", tour_id)).await
    }

    async fn get_seasonal_pricing(&self, tour_id: Uuid, start: NaiveDate, end: NaiveDate) -> CoreResult<SeasonalRate> {
        let request = self
            .http
            .get(self.tour_url(tour_id, "/seasonal-pricing"))
            .query(&[("start_date", start.to_string()), ("end_date", end.to_string())]);
        self.send(request, CoreError::not_found("Tour", tour_id)).await
    }

    async fn get_availability(
        &self,
        tour_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        participants: u32,
    ) -> CoreResult<AvailabilityReport> {
        let request = self.http.get(self.tour_url(tour_id, "/availability")).query(&[
            ("start_date", start.to_string()),
            ("end_date", end.to_string()),
            ("participants", participants.to_string()),
        ]);
        self.send(request, CoreError::not_found("Tour", tour_id)).await
    }

    async fn get_group_price(&self, tour_id: Uuid, participants: u32) -> CoreResult<GroupQuote> {
        let request = self
            .http
            .get(self.tour_url(tour_id, "/group-price"))
            .query(&[("participants", participants.to_string())]);
        self.send(request, CoreError::not_found("Tour", tour_id)).await
    }

    async fn health_check(&self) -> bool {
        let probe = self
            .http
            .get(format!("{}/health", self.base_url))
            .timeout(self.health_timeout)
            .send()
            .await;
        matches!(probe, Ok(response) if response.status().is_success())
    }
}

#[async_trait]
impl ReviewTokenIssuing for HttpCatalogClient {
    async fn issue_token(&self, request: &ReviewTokenRequest) -> CoreResult<String> {
        let call = self
            .http
            .post(format!("{}/reviews/create-token", self.base_url))
            .json(request);
        let body: TokenResponse = self
            .send(call, CoreError::dependency(SERVICE, "review token endpoint missing"))
            .await?;
        Ok(body.token)
    }
}
