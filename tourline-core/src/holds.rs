use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::CoreResult;

/// Capacity a hold is measured against for one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayCapacity {
    pub date: NaiveDate,
    pub open_spots: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoldOutcome {
    Held,
    /// Nothing was reserved; `date` is the first date that could not fit the party.
    Exhausted {
        date: NaiveDate,
        open_spots: u32,
        held: u32,
    },
}

impl HoldOutcome {
    pub fn is_held(&self) -> bool {
        matches!(self, HoldOutcome::Held)
    }
}

/// Per tour-and-date reservation ledger.
///
/// `acquire` is all-or-nothing across the supplied dates and replaces any spots
/// the same `hold_id` already holds on those dates. A hold starts pending and
/// expires after `ttl` unless committed; committed holds live until released.
#[async_trait]
pub trait HoldLedger: Send + Sync {
    async fn acquire(
        &self,
        hold_id: Uuid,
        tour_id: Uuid,
        days: &[DayCapacity],
        participants: u32,
        ttl: Duration,
    ) -> CoreResult<HoldOutcome>;

    async fn commit(&self, hold_id: Uuid, tour_id: Uuid, dates: &[NaiveDate]) -> CoreResult<()>;

    /// Releasing an unknown hold is a no-op.
    async fn release(&self, hold_id: Uuid, tour_id: Uuid, dates: &[NaiveDate]) -> CoreResult<()>;

    /// Spots currently held (pending and committed) on one date.
    async fn held_spots(&self, tour_id: Uuid, date: NaiveDate) -> CoreResult<u32>;
}
