use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use tourline_core::catalog::{GroupQuote, STANDARD_PRICING};
use tourline_core::{CoreError, CoreResult};
use tourline_shared::round_currency;

use crate::tour::{CatalogStore, GroupPricingTier};

/// Tier covering `participants`. Overlapping tiers resolve to the lowest band.
pub fn select_tier(tiers: &[GroupPricingTier], participants: u32) -> Option<&GroupPricingTier> {
    tiers
        .iter()
        .filter(|tier| tier.covers(participants))
        .min_by_key(|tier| (tier.min_participants, tier.max_participants, tier.id))
}

/// Prices a party from the tier table, falling back to the tour's base price.
pub fn quote_for(base_price: Decimal, tiers: &[GroupPricingTier], participants: u32) -> GroupQuote {
    let (price_per_person, tier_label) = match select_tier(tiers, participants) {
        Some(tier) => (tier.price_per_person, tier.label()),
        None => (base_price, STANDARD_PRICING.to_string()),
    };
    GroupQuote {
        price_per_person,
        total_price: round_currency(price_per_person * Decimal::from(participants)),
        tier_label,
    }
}

pub struct GroupPricingSelector {
    store: Arc<dyn CatalogStore>,
}

impl GroupPricingSelector {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    pub async fn quote(&self, tour_id: Uuid, participants: u32) -> CoreResult<GroupQuote> {
        let tour = self
            .store
            .get_tour(tour_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Tour", tour_id))?;
        let tiers = self.store.group_tiers(tour_id).await?;
        Ok(quote_for(tour.base_price, &tiers, participants))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn tier(min: u32, max: u32, price: Decimal) -> GroupPricingTier {
        GroupPricingTier {
            id: Uuid::new_v4(),
            tour_id: Uuid::nil(),
            min_participants: min,
            max_participants: max,
            price_per_person: price,
        }
    }

    #[test]
    fn test_tier_bounds_are_inclusive() {
        let tiers = vec![tier(1, 3, dec!(100)), tier(4, 8, dec!(80))];
        assert_eq!(select_tier(&tiers, 3).unwrap().price_per_person, dec!(100));
        assert_eq!(select_tier(&tiers, 4).unwrap().price_per_person, dec!(80));
        assert_eq!(select_tier(&tiers, 8).unwrap().price_per_person, dec!(80));
    }

    #[test]
    fn test_falls_back_to_base_price() {
        let tiers = vec![tier(1, 3, dec!(100))];
        let quote = quote_for(dec!(120.00), &tiers, 10);
        assert_eq!(quote.price_per_person, dec!(120.00));
        assert_eq!(quote.total_price, dec!(1200.00));
        assert_eq!(quote.tier_label, STANDARD_PRICING);
    }

    #[test]
    fn test_quote_is_stable() {
        let tiers = vec![tier(1, 5, dec!(90)), tier(3, 6, dec!(70))];
        let first = quote_for(dec!(120), &tiers, 4);
        let second = quote_for(dec!(120), &tiers, 4);
        assert_eq!(first, second);
        assert_eq!(first.price_per_person, dec!(90));
        assert_eq!(first.tier_label, "1-5 people");
        assert_eq!(first.total_price, dec!(360.00));
    }
}
