use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use redis::AsyncCommands;
use tracing::{debug, info};
use uuid::Uuid;

use tourline_core::holds::{DayCapacity, HoldLedger, HoldOutcome};
use tourline_core::{CoreError, CoreResult};

// KEYS: one hash per date. ARGV: hold id, participants, now (ms), expiry (ms), then
// the open capacity of each key in order. Returns {0,0,0} on success, otherwise
// {1-based index of the first full date, open spots, spots held by others}.
const ACQUIRE_SCRIPT: &str = r#"
local hold = ARGV[1]
local participants = tonumber(ARGV[2])
local now = tonumber(ARGV[3])
local expires = ARGV[4]
for i, key in ipairs(KEYS) do
    local open = tonumber(ARGV[4 + i])
    local held = 0
    local entries = redis.call('HGETALL', key)
    for j = 1, #entries, 2 do
        local field = entries[j]
        local n, exp = string.match(entries[j + 1], '^(%d+):(%d+)$')
        n = tonumber(n)
        exp = tonumber(exp)
        if exp ~= 0 and exp <= now then
            redis.call('HDEL', key, field)
        elseif field ~= hold then
            held = held + n
        end
    end
    if held + participants > open then
        return {i, open, held}
    end
end
for _, key in ipairs(KEYS) do
    redis.call('HSET', key, hold, participants .. ':' .. expires)
end
return {0, 0, 0}
"#;

const COMMIT_SCRIPT: &str = r#"
for _, key in ipairs(KEYS) do
    local v = redis.call('HGET', key, ARGV[1])
    if v then
        local n = string.match(v, '^(%d+):')
        redis.call('HSET', key, ARGV[1], n .. ':0')
    end
end
return 1
"#;

/// Per-date capacity holds in Redis hashes, `tour:{tour}:day:{date}:holds`.
///
/// Each field is a hold id mapped to `participants:expires_at_ms`; an expiry of
/// zero marks a committed hold.
#[derive(Clone)]
pub struct RedisHoldLedger {
    client: redis::Client,
}

impl RedisHoldLedger {
    pub fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    pub async fn ping(&self) -> bool {
        match self.client.get_multiplexed_async_connection().await {
            Ok(mut conn) => redis::cmd("PING").query_async::<String>(&mut conn).await.is_ok(),
            Err(_) => false,
        }
    }

    async fn connection(&self) -> CoreResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(unavailable)
    }
}

fn unavailable(err: redis::RedisError) -> CoreError {
    tracing::error!(error = %err, "Redis error");
    CoreError::dependency("redis", err)
}

pub fn day_key(tour_id: Uuid, date: NaiveDate) -> String {
    format!("tour:{}:day:{}:holds", tour_id, date)
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Sum of live holds in one day hash. Malformed entries count as nothing.
pub fn live_participants(entries: &HashMap<String, String>, now_ms: i64) -> u32 {
    entries
        .values()
        .filter_map(|value| {
            let (count, expires) = value.split_once(':')?;
            let count: u32 = count.parse().ok()?;
            let expires: i64 = expires.parse().ok()?;
            (expires == 0 || expires > now_ms).then_some(count)
        })
        .fold(0u32, |total, n| total.saturating_add(n))
}

#[async_trait]
impl HoldLedger for RedisHoldLedger {
    async fn acquire(
        &self,
        hold_id: Uuid,
        tour_id: Uuid,
        days: &[DayCapacity],
        participants: u32,
        ttl: Duration,
    ) -> CoreResult<HoldOutcome> {
        if days.is_empty() {
            return Ok(HoldOutcome::Held);
        }
        let mut conn = self.connection().await?;
        let now = now_ms();
        let expires = now.saturating_add(i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX)).max(1);

        let script = redis::Script::new(ACQUIRE_SCRIPT);
        let mut invocation = script.prepare_invoke();
        for day in days {
            invocation.key(day_key(tour_id, day.date));
        }
        invocation
            .arg(hold_id.to_string())
            .arg(participants)
            .arg(now)
            .arg(expires);
        for day in days {
            invocation.arg(day.open_spots);
        }
        let result: Vec<i64> = invocation.invoke_async(&mut conn).await.map_err(unavailable)?;

        match result.as_slice() {
            [0, ..] => {
                debug!(%hold_id, %tour_id, days = days.len(), participants, "Hold acquired");
                Ok(HoldOutcome::Held)
            }
            [index, open, held] => {
                let day = usize::try_from(*index - 1)
                    .ok()
                    .and_then(|i| days.get(i))
                    .ok_or_else(|| CoreError::dependency("redis", "hold script returned an unknown date"))?;
                Ok(HoldOutcome::Exhausted {
                    date: day.date,
                    open_spots: u32::try_from(*open).unwrap_or(0),
                    held: u32::try_from(*held).unwrap_or(u32::MAX),
                })
            }
            _ => Err(CoreError::dependency("redis", "unexpected hold script reply")),
        }
    }

    async fn commit(&self, hold_id: Uuid, tour_id: Uuid, dates: &[NaiveDate]) -> CoreResult<()> {
        if dates.is_empty() {
            return Ok(());
        }
        let mut conn = self.connection().await?;
        let script = redis::Script::new(COMMIT_SCRIPT);
        let mut invocation = script.prepare_invoke();
        for date in dates {
            invocation.key(day_key(tour_id, *date));
        }
        invocation.arg(hold_id.to_string());
        let _: i64 = invocation.invoke_async(&mut conn).await.map_err(unavailable)?;
        info!(%hold_id, %tour_id, days = dates.len(), "Hold committed");
        Ok(())
    }

    async fn release(&self, hold_id: Uuid, tour_id: Uuid, dates: &[NaiveDate]) -> CoreResult<()> {
        if dates.is_empty() {
            return Ok(());
        }
        let mut conn = self.connection().await?;
        let mut pipe = redis::pipe();
        for date in dates {
            pipe.hdel(day_key(tour_id, *date), hold_id.to_string()).ignore();
        }
        pipe.query_async::<()>(&mut conn).await.map_err(unavailable)?;
        info!(%hold_id, %tour_id, days = dates.len(), "Hold released");
        Ok(())
    }

    async fn held_spots(&self, tour_id: Uuid, date: NaiveDate) -> CoreResult<u32> {
        let mut conn = self.connection().await?;
        let entries: HashMap<String, String> = conn.hgetall(day_key(tour_id, date)).await.map_err(unavailable)?;
        Ok(live_participants(&entries, now_ms()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_key_layout() {
        let tour = Uuid::nil();
        let date = NaiveDate::from_ymd_opt(2030, 7, 14).unwrap();
        assert_eq!(
            day_key(tour, date),
            "tour:00000000-0000-0000-0000-000000000000:day:2030-07-14:holds"
        );
    }

    #[test]
    fn test_live_participants_skips_expired() {
        let entries: HashMap<String, String> = [
            ("committed", "4:0"),
            ("pending", "2:2000"),
            ("expired", "5:500"),
            ("garbage", "lots"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        assert_eq!(live_participants(&entries, 1000), 6);
        assert_eq!(live_participants(&entries, 3000), 4);
    }
}
