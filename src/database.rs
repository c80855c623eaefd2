//! # Redis
//!
//! RAM database holding the live engagement state.
//!
//! Core purpose is to store per-user vote membership and per-item vote totals,
//! with atomic increment/decrements so concurrent voters never lose updates.
//!
//! ## Keys
//!
//! - `user_likes:{user}` / `user_dislikes:{user}`: sets of item ids, one
//!   membership check or mutation per vote operation, O(1).
//! - `item_likes:{item}` / `item_dislikes:{item}`: integer counters. `INCR`
//!   for increments; decrements go through a small Lua script that floors the
//!   value at zero, so a raced or replayed decrement can never drive a
//!   counter negative.
//!
//! The reconciliation sweep discovers active items with `SCAN MATCH` over
//! both counter prefixes. The scan is cursor-based on the Redis side; we
//! collect it into a sorted, deduplicated list since the active set stays
//! small (thousands of items, not millions).

use std::{collections::BTreeSet, time::Duration};

use async_trait::async_trait;
use redis::{
    AsyncCommands, Client, Script,
    aio::{ConnectionManager, ConnectionManagerConfig},
};

use crate::{
    cache::{CounterCache, CounterKind},
    error::AppError,
    ledger::VoteLedger,
    types::{ItemId, UserId},
};

const ITEM_LIKES_PREFIX: &str = "item_likes:";
const ITEM_DISLIKES_PREFIX: &str = "item_dislikes:";

const DECR_FLOOR_SCRIPT: &str = r"
local value = tonumber(redis.call('GET', KEYS[1]) or '0')
if value > 0 then
    return redis.call('DECR', KEYS[1])
end
return 0
";

pub async fn init_redis(redis_url: &str) -> Result<ConnectionManager, AppError> {
    let config = ConnectionManagerConfig::new()
        .set_number_of_retries(1)
        .set_connection_timeout(Duration::from_millis(100));

    let client = Client::open(redis_url)?;
    let connection_manager = client.get_connection_manager_with_config(config).await?;

    Ok(connection_manager)
}

/// Ledger + counter cache over one shared Redis connection.
pub struct RedisStore {
    connection: ConnectionManager,
    decr_floor: Script,
}

impl RedisStore {
    pub fn new(connection: ConnectionManager) -> Self {
        Self {
            connection,
            decr_floor: Script::new(DECR_FLOOR_SCRIPT),
        }
    }

    fn member_key(kind: CounterKind, user: UserId) -> String {
        match kind {
            CounterKind::Like => format!("user_likes:{user}"),
            CounterKind::Dislike => format!("user_dislikes:{user}"),
        }
    }

    fn counter_key(kind: CounterKind, item: ItemId) -> String {
        match kind {
            CounterKind::Like => format!("{ITEM_LIKES_PREFIX}{item}"),
            CounterKind::Dislike => format!("{ITEM_DISLIKES_PREFIX}{item}"),
        }
    }

    async fn is_member(
        &self,
        kind: CounterKind,
        user: UserId,
        item: ItemId,
    ) -> Result<bool, AppError> {
        let mut connection = self.connection.clone();
        let member: bool = connection
            .sismember(Self::member_key(kind, user), item.0)
            .await?;

        Ok(member)
    }

    async fn add_member(
        &self,
        kind: CounterKind,
        user: UserId,
        item: ItemId,
    ) -> Result<(), AppError> {
        let mut connection = self.connection.clone();
        let _: u64 = connection
            .sadd(Self::member_key(kind, user), item.0)
            .await?;

        Ok(())
    }

    async fn remove_member(
        &self,
        kind: CounterKind,
        user: UserId,
        item: ItemId,
    ) -> Result<(), AppError> {
        let mut connection = self.connection.clone();
        let _: u64 = connection
            .srem(Self::member_key(kind, user), item.0)
            .await?;

        Ok(())
    }

    async fn scan_item_ids(
        &self,
        prefix: &str,
        into: &mut BTreeSet<ItemId>,
    ) -> Result<(), AppError> {
        let mut connection = self.connection.clone();
        let pattern = format!("{prefix}*");

        let mut keys = connection.scan_match::<_, String>(pattern).await?;
        while let Some(key) = keys.next_item().await {
            let Some(raw) = key.strip_prefix(prefix) else {
                continue;
            };
            if let Ok(id) = raw.parse() {
                into.insert(ItemId(id));
            }
        }

        Ok(())
    }
}

#[async_trait]
impl VoteLedger for RedisStore {
    async fn is_liked(&self, user: UserId, item: ItemId) -> Result<bool, AppError> {
        self.is_member(CounterKind::Like, user, item).await
    }

    async fn is_disliked(&self, user: UserId, item: ItemId) -> Result<bool, AppError> {
        self.is_member(CounterKind::Dislike, user, item).await
    }

    async fn mark_liked(&self, user: UserId, item: ItemId) -> Result<(), AppError> {
        self.add_member(CounterKind::Like, user, item).await
    }

    async fn clear_liked(&self, user: UserId, item: ItemId) -> Result<(), AppError> {
        self.remove_member(CounterKind::Like, user, item).await
    }

    async fn mark_disliked(&self, user: UserId, item: ItemId) -> Result<(), AppError> {
        self.add_member(CounterKind::Dislike, user, item).await
    }

    async fn clear_disliked(&self, user: UserId, item: ItemId) -> Result<(), AppError> {
        self.remove_member(CounterKind::Dislike, user, item).await
    }
}

#[async_trait]
impl CounterCache for RedisStore {
    async fn increment(&self, item: ItemId, kind: CounterKind) -> Result<(), AppError> {
        let mut connection = self.connection.clone();
        let _: i64 = connection.incr(Self::counter_key(kind, item), 1).await?;

        Ok(())
    }

    async fn decrement(&self, item: ItemId, kind: CounterKind) -> Result<(), AppError> {
        let mut connection = self.connection.clone();
        let _: i64 = self
            .decr_floor
            .key(Self::counter_key(kind, item))
            .invoke_async(&mut connection)
            .await?;

        Ok(())
    }

    async fn get(&self, item: ItemId) -> Result<(u64, u64), AppError> {
        let mut connection = self.connection.clone();
        let (likes, dislikes): (Option<u64>, Option<u64>) = redis::pipe()
            .get(Self::counter_key(CounterKind::Like, item))
            .get(Self::counter_key(CounterKind::Dislike, item))
            .query_async(&mut connection)
            .await?;

        Ok((likes.unwrap_or(0), dislikes.unwrap_or(0)))
    }

    async fn active_items(&self) -> Result<Vec<ItemId>, AppError> {
        let mut ids = BTreeSet::new();
        self.scan_item_ids(ITEM_LIKES_PREFIX, &mut ids).await?;
        self.scan_item_ids(ITEM_DISLIKES_PREFIX, &mut ids).await?;

        Ok(ids.into_iter().collect())
    }
}
