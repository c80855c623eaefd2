use std::sync::Arc;

use crate::{snapshot::SnapshotStore, vote::VoteService};

/// Shared handler state: the vote service plus the durable store used for
/// item existence checks. Backends are injected so tests can run the whole
/// router over the in-memory fakes.
pub struct AppState {
    pub votes: VoteService,
    pub snapshots: Arc<dyn SnapshotStore>,
}

impl AppState {
    pub fn new(votes: VoteService, snapshots: Arc<dyn SnapshotStore>) -> Arc<Self> {
        Arc::new(Self { votes, snapshots })
    }
}
