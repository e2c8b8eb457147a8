use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::CoreResult;

/// One templated email handed to the messaging collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailNotification {
    pub to: String,
    pub subject: String,
    pub template: String,
    pub data: serde_json::Value,
}

#[async_trait]
pub trait NotificationClient: Send + Sync {
    /// Any failure, including a timeout, comes back as `DependencyFailure`.
    async fn send(&self, notification: &EmailNotification) -> CoreResult<()>;

    async fn health_check(&self) -> bool {
        true
    }
}
