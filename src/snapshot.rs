//! # Meilisearch
//!
//! Durable side of the engagement counts.
//!
//! Item records (the things users vote on) live in a Meilisearch index
//! maintained by the CRUD side of the system. This subsystem touches that
//! index in exactly two ways: an existence probe before accepting a vote, and
//! the reconciliation sweep upserting `{id, likes, dislikes}` documents.
//!
//! The index lags the cache on purpose. Live counts are always answered from
//! Redis; Meilisearch only has to be fresh enough for search result ranking,
//! which the periodic sweep plus the post-vote eager sweep comfortably cover.

use std::sync::Arc;

use async_trait::async_trait;
use meilisearch_sdk::{
    client::Client,
    errors::{Error, ErrorCode},
    settings::Settings,
};
use serde::{Deserialize, Serialize};

use crate::{error::AppError, types::ItemId};

pub const ITEM_INDEX: &str = "items";
pub const ITEM_ID: &str = "id";
pub const ITEM_LIKES: &str = "likes";
pub const ITEM_DISLIKES: &str = "dislikes";

/// The slice of an item document this subsystem reads and writes. Upserts
/// merge by primary key, so the CRUD-owned fields are left untouched.
#[derive(Serialize, Deserialize)]
struct ItemEngagementDoc {
    id: u64,
    // Items created before their first vote have no engagement fields yet.
    #[serde(default)]
    likes: u64,
    #[serde(default)]
    dislikes: u64,
}

/// Durable snapshot sink plus item existence probe.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn item_exists(&self, item: ItemId) -> Result<bool, AppError>;

    /// Overwrite the stored counts for one item, last writer wins.
    async fn write_snapshot(&self, item: ItemId, likes: u64, dislikes: u64)
        -> Result<(), AppError>;
}

pub async fn init_meilisearch(meili_url: &str, meili_admin_key: &str) -> Result<Arc<Client>, Error> {
    let meili_client = Arc::new(Client::new(meili_url, Some(meili_admin_key))?);

    meili_client
        .index(ITEM_INDEX)
        .set_settings(&init_settings())
        .await?;

    Ok(meili_client)
}

fn init_settings() -> Settings {
    Settings::new().with_sortable_attributes([ITEM_LIKES, ITEM_DISLIKES])
}

pub struct MeiliSnapshots {
    meili_client: Arc<Client>,
}

impl MeiliSnapshots {
    pub fn new(meili_client: Arc<Client>) -> Self {
        Self { meili_client }
    }
}

#[async_trait]
impl SnapshotStore for MeiliSnapshots {
    async fn item_exists(&self, item: ItemId) -> Result<bool, AppError> {
        let lookup = self
            .meili_client
            .index(ITEM_INDEX)
            .get_document::<ItemEngagementDoc>(&item.to_string())
            .await;

        match lookup {
            Ok(_) => Ok(true),
            Err(Error::Meilisearch(e)) if e.error_code == ErrorCode::DocumentNotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_snapshot(
        &self,
        item: ItemId,
        likes: u64,
        dislikes: u64,
    ) -> Result<(), AppError> {
        let doc = ItemEngagementDoc {
            id: item.0,
            likes,
            dislikes,
        };

        // Fire and forget: the sweep does not wait for the indexing task, the
        // next sweep simply overwrites whatever landed.
        self.meili_client
            .index(ITEM_INDEX)
            .add_or_update(&[doc], Some(ITEM_ID))
            .await?;

        Ok(())
    }
}
