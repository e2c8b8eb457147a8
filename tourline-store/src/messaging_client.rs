use std::time::Duration;

use async_trait::async_trait;

use tourline_core::notification::{EmailNotification, NotificationClient};
use tourline_core::{CoreError, CoreResult};

const SERVICE: &str = "messaging-service";

/// Posts templated emails to `{base_url}/notify/email`.
pub struct HttpNotificationClient {
    http: reqwest::Client,
    base_url: String,
    health_timeout: Duration,
}

impl HttpNotificationClient {
    pub fn new(base_url: &str, request_timeout: Duration, health_timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            health_timeout,
        })
    }
}

#[async_trait]
impl NotificationClient for HttpNotificationClient {
    async fn send(&self, notification: &EmailNotification) -> CoreResult<()> {
        let response = self
            .http
            .post(format!("{}/notify/email", self.base_url))
            .json(notification)
            .send()
            .await
            .map_err(|e| CoreError::dependency(SERVICE, e))?;
        if !response.status().is_success() {
            return Err(CoreError::dependency(SERVICE, format!("status {}", response.status())));
        }
        Ok(())
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
