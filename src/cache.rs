use async_trait::async_trait;

use crate::{error::AppError, types::ItemId};

/// Which of an item's two counters an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterKind {
    Like,
    Dislike,
}

/// Fast aggregate-count store, one (likes, dislikes) pair per item.
///
/// Increment and decrement are atomic relative to each other on the same
/// (item, kind) pair. Decrement clamps at zero: the counter never goes
/// negative, even if operations race or replay.
#[async_trait]
pub trait CounterCache: Send + Sync {
    async fn increment(&self, item: ItemId, kind: CounterKind) -> Result<(), AppError>;

    /// No-op when the counter is already at zero.
    async fn decrement(&self, item: ItemId, kind: CounterKind) -> Result<(), AppError>;

    /// Point-in-time read; `(0, 0)` for an item with no cached activity.
    async fn get(&self, item: ItemId) -> Result<(u64, u64), AppError>;

    /// Every item with at least one cached counter, deduplicated and in
    /// ascending id order. Only the reconciliation sweep calls this.
    async fn active_items(&self) -> Result<Vec<ItemId>, AppError>;
}
