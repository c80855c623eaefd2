use async_trait::async_trait;

use crate::{
    error::AppError,
    types::{ItemId, UserId},
};

/// Membership store recording each user's current vote per item.
///
/// Pure membership: mutations here never touch the aggregate counters. All
/// mutations are idempotent, so marking an already-marked pair or clearing an
/// absent one is a no-op rather than an error. Exclusivity between the liked
/// and disliked sets is NOT enforced here; that is the vote service's job.
#[async_trait]
pub trait VoteLedger: Send + Sync {
    async fn is_liked(&self, user: UserId, item: ItemId) -> Result<bool, AppError>;

    async fn is_disliked(&self, user: UserId, item: ItemId) -> Result<bool, AppError>;

    async fn mark_liked(&self, user: UserId, item: ItemId) -> Result<(), AppError>;

    async fn clear_liked(&self, user: UserId, item: ItemId) -> Result<(), AppError>;

    async fn mark_disliked(&self, user: UserId, item: ItemId) -> Result<(), AppError>;

    async fn clear_disliked(&self, user: UserId, item: ItemId) -> Result<(), AppError>;
}
