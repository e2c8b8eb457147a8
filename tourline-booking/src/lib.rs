pub mod capacity;
pub mod manager;
pub mod memory;
pub mod models;
pub mod notifier;
pub mod repository;
pub mod review;
pub mod validation;

pub use manager::{BookingLifecycle, LifecycleSettings};
pub use models::{Booking, BookingPatch, BookingQuery, BookingRequest, BookingStatus, PriceRequest};
pub use notifier::NotificationDispatcher;
pub use repository::{BookingRepository, ReviewRepository};
pub use review::ReviewService;
