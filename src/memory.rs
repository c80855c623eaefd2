//! In-memory backends.
//!
//! The ledger, counter cache, and snapshot store are injected dependencies so
//! tests can swap the Redis/Meilisearch clients for these fakes and exercise
//! the full vote and reconciliation paths without external processes.

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    cache::{CounterCache, CounterKind},
    error::AppError,
    ledger::VoteLedger,
    snapshot::SnapshotStore,
    types::{ItemId, UserId},
};

#[derive(Default)]
struct Counters {
    likes: u64,
    dislikes: u64,
}

/// Ledger + counter cache over plain maps.
#[derive(Default)]
pub struct MemoryStore {
    liked: RwLock<HashSet<(UserId, ItemId)>>,
    disliked: RwLock<HashSet<(UserId, ItemId)>>,
    counters: RwLock<BTreeMap<ItemId, Counters>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VoteLedger for MemoryStore {
    async fn is_liked(&self, user: UserId, item: ItemId) -> Result<bool, AppError> {
        Ok(self.liked.read().await.contains(&(user, item)))
    }

    async fn is_disliked(&self, user: UserId, item: ItemId) -> Result<bool, AppError> {
        Ok(self.disliked.read().await.contains(&(user, item)))
    }

    async fn mark_liked(&self, user: UserId, item: ItemId) -> Result<(), AppError> {
        self.liked.write().await.insert((user, item));
        Ok(())
    }

    async fn clear_liked(&self, user: UserId, item: ItemId) -> Result<(), AppError> {
        self.liked.write().await.remove(&(user, item));
        Ok(())
    }

    async fn mark_disliked(&self, user: UserId, item: ItemId) -> Result<(), AppError> {
        self.disliked.write().await.insert((user, item));
        Ok(())
    }

    async fn clear_disliked(&self, user: UserId, item: ItemId) -> Result<(), AppError> {
        self.disliked.write().await.remove(&(user, item));
        Ok(())
    }
}

#[async_trait]
impl CounterCache for MemoryStore {
    async fn increment(&self, item: ItemId, kind: CounterKind) -> Result<(), AppError> {
        let mut counters = self.counters.write().await;
        let entry = counters.entry(item).or_default();
        match kind {
            CounterKind::Like => entry.likes += 1,
            CounterKind::Dislike => entry.dislikes += 1,
        }
        Ok(())
    }

    async fn decrement(&self, item: ItemId, kind: CounterKind) -> Result<(), AppError> {
        let mut counters = self.counters.write().await;
        let entry = counters.entry(item).or_default();
        match kind {
            CounterKind::Like => entry.likes = entry.likes.saturating_sub(1),
            CounterKind::Dislike => entry.dislikes = entry.dislikes.saturating_sub(1),
        }
        Ok(())
    }

    async fn get(&self, item: ItemId) -> Result<(u64, u64), AppError> {
        let counters = self.counters.read().await;
        Ok(counters
            .get(&item)
            .map(|c| (c.likes, c.dislikes))
            .unwrap_or((0, 0)))
    }

    async fn active_items(&self) -> Result<Vec<ItemId>, AppError> {
        Ok(self.counters.read().await.keys().copied().collect())
    }
}

/// Snapshot store fake with a seedable item catalog.
#[derive(Default)]
pub struct MemorySnapshots {
    items: RwLock<HashSet<ItemId>>,
    snapshots: RwLock<HashMap<ItemId, (u64, u64)>>,
}

impl MemorySnapshots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an item so `item_exists` reports it, mimicking a row created
    /// by the CRUD side of the system.
    pub async fn seed_item(&self, item: ItemId) {
        self.items.write().await.insert(item);
    }

    pub async fn snapshot(&self, item: ItemId) -> Option<(u64, u64)> {
        self.snapshots.read().await.get(&item).copied()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshots {
    async fn item_exists(&self, item: ItemId) -> Result<bool, AppError> {
        Ok(self.items.read().await.contains(&item))
    }

    async fn write_snapshot(
        &self,
        item: ItemId,
        likes: u64,
        dislikes: u64,
    ) -> Result<(), AppError> {
        self.snapshots.write().await.insert(item, (likes, dislikes));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn decrement_clamps_at_zero() {
        let store = MemoryStore::new();
        let item = ItemId(1);

        store.decrement(item, CounterKind::Like).await.unwrap();
        assert_eq!(store.get(item).await.unwrap(), (0, 0));

        store.increment(item, CounterKind::Dislike).await.unwrap();
        store.decrement(item, CounterKind::Dislike).await.unwrap();
        store.decrement(item, CounterKind::Dislike).await.unwrap();
        assert_eq!(store.get(item).await.unwrap(), (0, 0));
    }

    #[tokio::test]
    async fn marks_and_clears_are_idempotent() {
        let store = MemoryStore::new();
        let (user, item) = (UserId(7), ItemId(3));

        store.mark_liked(user, item).await.unwrap();
        store.mark_liked(user, item).await.unwrap();
        assert!(store.is_liked(user, item).await.unwrap());

        store.clear_liked(user, item).await.unwrap();
        store.clear_liked(user, item).await.unwrap();
        assert!(!store.is_liked(user, item).await.unwrap());
    }

    #[tokio::test]
    async fn active_items_lists_every_touched_item_in_order() {
        let store = MemoryStore::new();

        store.increment(ItemId(9), CounterKind::Like).await.unwrap();
        store
            .increment(ItemId(2), CounterKind::Dislike)
            .await
            .unwrap();
        // Touched then emptied items stay enumerable.
        store.increment(ItemId(5), CounterKind::Like).await.unwrap();
        store.decrement(ItemId(5), CounterKind::Like).await.unwrap();

        assert_eq!(
            store.active_items().await.unwrap(),
            vec![ItemId(2), ItemId(5), ItemId(9)]
        );
    }
}
