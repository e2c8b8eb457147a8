pub mod app_config;
pub mod booking_repo;
pub mod catalog_repo;
pub mod database;
pub mod messaging_client;
pub mod redis_repo;
pub mod resiliency;
pub mod tours_client;

pub use app_config::Config;
pub use booking_repo::{PgBookingRepository, PgReviewRepository};
pub use catalog_repo::PgCatalogStore;
pub use database::DbClient;
pub use messaging_client::HttpNotificationClient;
pub use redis_repo::RedisHoldLedger;
pub use resiliency::{CircuitBreaker, CircuitState};
pub use tours_client::HttpCatalogClient;
