pub mod group;
pub mod inventory;
pub mod local;
pub mod memory;
pub mod pricing;
pub mod seasonal;
pub mod tour;

pub use group::GroupPricingSelector;
pub use inventory::AvailabilityChecker;
pub use local::LocalCatalog;
pub use memory::InMemoryCatalogStore;
pub use pricing::{PriceBreakdown, PriceCalculationEngine, PriceQuote, PricingStrategy, QuoteRequest};
pub use seasonal::SeasonalPricingResolver;
pub use tour::{AvailabilityRecord, CatalogStore, GroupPricingTier, SeasonalPrice};
