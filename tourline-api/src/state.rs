use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use tourline_booking::memory::{InMemoryBookingRepository, InMemoryHoldLedger, InMemoryReviewRepository};
use tourline_booking::models::ResubmissionPolicy;
use tourline_booking::notifier::{ADMIN_EMAIL, FRONTEND_URL};
use tourline_booking::{
    BookingLifecycle, BookingRepository, LifecycleSettings, NotificationDispatcher, ReviewRepository, ReviewService,
};
use tourline_catalog::{CatalogStore, InMemoryCatalogStore, LocalCatalog};
use tourline_core::catalog::CatalogClient;
use tourline_core::holds::HoldLedger;
use tourline_core::notification::NotificationClient;
use tourline_core::reviews::ReviewTokenIssuing;
use tourline_store::app_config::{CatalogSource, StorageBackend};
use tourline_store::{
    Config, DbClient, HttpCatalogClient, HttpNotificationClient, PgBookingRepository, PgCatalogStore,
    PgReviewRepository, RedisHoldLedger,
};

#[derive(Clone)]
pub struct AppState {
    pub lifecycle: Arc<BookingLifecycle>,
    pub reviews: Arc<ReviewService>,
    pub catalog: Arc<dyn CatalogClient>,
    pub notifications: Arc<dyn NotificationClient>,
    pub health_timeout: Duration,
}

/// The ports a running service is assembled from.
pub struct Backends {
    pub catalog: Arc<dyn CatalogClient>,
    pub bookings: Arc<dyn BookingRepository>,
    pub reviews: Arc<dyn ReviewRepository>,
    pub holds: Arc<dyn HoldLedger>,
    pub notifications: Arc<dyn NotificationClient>,
    /// Mints review tokens upstream; they are still recorded locally.
    pub issuer: Option<Arc<dyn ReviewTokenIssuing>>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub admin_email: String,
    pub frontend_url: String,
    pub lifecycle: LifecycleSettings,
    pub review_policy: ResubmissionPolicy,
    pub health_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            admin_email: ADMIN_EMAIL.to_string(),
            frontend_url: FRONTEND_URL.to_string(),
            lifecycle: LifecycleSettings::default(),
            review_policy: ResubmissionPolicy::default(),
            health_timeout: Duration::from_secs(5),
        }
    }
}

impl AppState {
    pub fn assemble(backends: Backends, settings: Settings) -> Self {
        let mut service = ReviewService::new(backends.reviews, backends.catalog.clone(), settings.review_policy);
        if let Some(upstream) = backends.issuer {
            service = service.with_upstream(upstream);
        }
        let reviews = Arc::new(service);
        let issuer: Arc<dyn ReviewTokenIssuing> = reviews.clone();
        let notifier = NotificationDispatcher::new(
            backends.notifications.clone(),
            settings.admin_email,
            settings.frontend_url,
        );
        let lifecycle = Arc::new(BookingLifecycle::new(
            backends.bookings,
            backends.catalog.clone(),
            backends.holds,
            issuer,
            notifier,
            settings.lifecycle,
        ));
        Self {
            lifecycle,
            reviews,
            catalog: backends.catalog,
            notifications: backends.notifications,
            health_timeout: settings.health_timeout,
        }
    }

    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let bookings: Arc<dyn BookingRepository>;
        let reviews: Arc<dyn ReviewRepository>;
        let store: Arc<dyn CatalogStore>;
        match config.storage.backend {
            StorageBackend::Postgres => {
                let db = DbClient::new(&config.database.url, config.database.max_connections)
                    .await
                    .context("Failed to connect to Postgres")?;
                db.migrate().await.context("Failed to run migrations")?;
                bookings = Arc::new(PgBookingRepository::new(db.pool.clone()));
                reviews = Arc::new(PgReviewRepository::new(db.pool.clone()));
                store = Arc::new(PgCatalogStore::new(db.pool.clone()));
            }
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; data is lost on restart");
                bookings = Arc::new(InMemoryBookingRepository::new());
                reviews = Arc::new(InMemoryReviewRepository::new());
                store = Arc::new(InMemoryCatalogStore::new());
            }
        }

        let services = &config.services;
        let catalog: Arc<dyn CatalogClient>;
        let mut issuer: Option<Arc<dyn ReviewTokenIssuing>> = None;
        match config.catalog.source {
            CatalogSource::Local => {
                catalog = Arc::new(LocalCatalog::new(store));
            }
            CatalogSource::Remote => {
                let remote = Arc::new(
                    HttpCatalogClient::new(&services.tours_url, services.request_timeout(), services.health_timeout())
                        .context("Failed to build tours client")?,
                );
                let tokens: Arc<dyn ReviewTokenIssuing> = remote.clone();
                issuer = Some(tokens);
                catalog = remote;
            }
        }

        let holds: Arc<dyn HoldLedger> = match config.redis.url.as_deref() {
            Some(url) => Arc::new(RedisHoldLedger::new(url).context("Invalid Redis URL")?),
            None => {
                tracing::info!("No Redis configured, holding capacity in process");
                Arc::new(InMemoryHoldLedger::new())
            }
        };

        let notifications = Arc::new(
            HttpNotificationClient::new(&services.messaging_url, services.request_timeout(), services.health_timeout())
                .context("Failed to build messaging client")?,
        );

        let rules = &config.business_rules;
        let settings = Settings {
            admin_email: config.notifications.admin_email.clone(),
            frontend_url: config.notifications.frontend_url.clone(),
            lifecycle: LifecycleSettings {
                hold_ttl: Duration::from_secs(rules.hold_ttl_seconds),
                max_participants_per_booking: rules.max_participants_per_booking,
            },
            review_policy: rules.review_resubmission,
            health_timeout: services.health_timeout(),
        };

        Ok(Self::assemble(
            Backends {
                catalog,
                bookings,
                reviews,
                holds,
                notifications,
                issuer,
            },
            settings,
        ))
    }
}
