//! # Vote Service
//!
//! The state machine gluing the ledger and the counter cache together.
//!
//! Per (user, item) a vote is in exactly one of three states: no vote, liked,
//! or disliked. `like` and `dislike` toggle their own state and displace the
//! opposite one; `unlike`/`undislike` are explicit clears that fail with a
//! 4xx-style error when there is nothing to clear.
//!
//! The check-then-mutate sequence (read ledger, flip membership, adjust
//! counters) must be atomic per (user, item) or two racing calls could both
//! observe "no vote" and double-count. We serialize through a sharded keyed
//! lock: same pair always lands on the same shard, different pairs almost
//! always proceed in parallel.

use std::{
    hash::{DefaultHasher, Hash, Hasher},
    sync::Arc,
};

use tokio::sync::{Mutex, Notify};

use crate::{
    cache::{CounterCache, CounterKind},
    error::AppError,
    ledger::VoteLedger,
    types::{Engagement, ItemId, UserId},
};

const LOCK_SHARDS: usize = 64;

/// Sharded async lock keyed by (user, item).
struct KeyedLocks {
    shards: Vec<Mutex<()>>,
}

impl KeyedLocks {
    fn new() -> Self {
        Self {
            shards: (0..LOCK_SHARDS).map(|_| Mutex::new(())).collect(),
        }
    }

    fn shard(&self, user: UserId, item: ItemId) -> &Mutex<()> {
        let mut hasher = DefaultHasher::new();
        (user, item).hash(&mut hasher);
        &self.shards[hasher.finish() as usize % self.shards.len()]
    }
}

pub struct VoteService {
    ledger: Arc<dyn VoteLedger>,
    counters: Arc<dyn CounterCache>,
    locks: KeyedLocks,
    sweep_wakeup: Arc<Notify>,
}

impl VoteService {
    pub fn new(
        ledger: Arc<dyn VoteLedger>,
        counters: Arc<dyn CounterCache>,
        sweep_wakeup: Arc<Notify>,
    ) -> Self {
        Self {
            ledger,
            counters,
            locks: KeyedLocks::new(),
            sweep_wakeup,
        }
    }

    /// Toggle a like. A second like from the same user undoes the first; a
    /// like on top of a dislike swaps it.
    pub async fn like(&self, user: UserId, item: ItemId) -> Result<Engagement, AppError> {
        let _guard = self.locks.shard(user, item).lock().await;

        let (liked, disliked) = if self.ledger.is_liked(user, item).await? {
            self.ledger.clear_liked(user, item).await?;
            self.counters.decrement(item, CounterKind::Like).await?;
            (false, false)
        } else {
            if self.ledger.is_disliked(user, item).await? {
                self.ledger.clear_disliked(user, item).await?;
                self.counters.decrement(item, CounterKind::Dislike).await?;
            }
            self.ledger.mark_liked(user, item).await?;
            self.counters.increment(item, CounterKind::Like).await?;
            (true, false)
        };

        self.finish(item, liked, disliked).await
    }

    /// Toggle a dislike, displacing an existing like if present.
    pub async fn dislike(&self, user: UserId, item: ItemId) -> Result<Engagement, AppError> {
        let _guard = self.locks.shard(user, item).lock().await;

        let (liked, disliked) = if self.ledger.is_disliked(user, item).await? {
            self.ledger.clear_disliked(user, item).await?;
            self.counters.decrement(item, CounterKind::Dislike).await?;
            (false, false)
        } else {
            if self.ledger.is_liked(user, item).await? {
                self.ledger.clear_liked(user, item).await?;
                self.counters.decrement(item, CounterKind::Like).await?;
            }
            self.ledger.mark_disliked(user, item).await?;
            self.counters.increment(item, CounterKind::Dislike).await?;
            (false, true)
        };

        self.finish(item, liked, disliked).await
    }

    /// Explicit clear; errors with [`AppError::NotLiked`] when there is no
    /// like to remove.
    pub async fn unlike(&self, user: UserId, item: ItemId) -> Result<Engagement, AppError> {
        let _guard = self.locks.shard(user, item).lock().await;

        if !self.ledger.is_liked(user, item).await? {
            return Err(AppError::NotLiked);
        }

        self.ledger.clear_liked(user, item).await?;
        self.counters.decrement(item, CounterKind::Like).await?;

        let disliked = self.ledger.is_disliked(user, item).await?;
        self.finish(item, false, disliked).await
    }

    /// Explicit clear; errors with [`AppError::NotDisliked`] when there is no
    /// dislike to remove.
    pub async fn undislike(&self, user: UserId, item: ItemId) -> Result<Engagement, AppError> {
        let _guard = self.locks.shard(user, item).lock().await;

        if !self.ledger.is_disliked(user, item).await? {
            return Err(AppError::NotDisliked);
        }

        self.ledger.clear_disliked(user, item).await?;
        self.counters.decrement(item, CounterKind::Dislike).await?;

        let liked = self.ledger.is_liked(user, item).await?;
        self.finish(item, liked, false).await
    }

    /// Read-only view of the caller's state plus the item totals.
    pub async fn status(&self, user: UserId, item: ItemId) -> Result<Engagement, AppError> {
        let liked = self.ledger.is_liked(user, item).await?;
        let disliked = self.ledger.is_disliked(user, item).await?;
        let (likes, dislikes) = self.counters.get(item).await?;

        Ok(Engagement {
            liked,
            disliked,
            likes,
            dislikes,
        })
    }

    async fn finish(
        &self,
        item: ItemId,
        liked: bool,
        disliked: bool,
    ) -> Result<Engagement, AppError> {
        let (likes, dislikes) = self.counters.get(item).await?;

        // Mutation landed, let the scheduler fold it into the durable store.
        self.sweep_wakeup.notify_one();

        Ok(Engagement {
            liked,
            disliked,
            likes,
            dislikes,
        })
    }
}
