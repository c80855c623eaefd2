//! # Reconciliation
//!
//! Background task bridging the cache and the durable store.
//!
//! Two triggers share one sweep: a fixed interval, and a wakeup fired by the
//! vote service after every successful mutation. A sweep reads every active
//! item from the counter cache and overwrites its durable snapshot. Writes
//! are per item; one failed item is logged and skipped, the rest of the sweep
//! continues, and nothing is retried until the next trigger.
//!
//! Sweeps read the cache without coordinating with in-flight votes. A value
//! can be stale by the time it lands in the durable store; the next sweep
//! overwrites it, and the durable store is never the live read path.

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{Notify, watch},
    time::{Instant, MissedTickBehavior, interval_at},
};
use tracing::{debug, warn};

use crate::{cache::CounterCache, snapshot::SnapshotStore};

pub struct Reconciler {
    counters: Arc<dyn CounterCache>,
    snapshots: Arc<dyn SnapshotStore>,
    period: Duration,
    wakeup: Arc<Notify>,
    stop: watch::Receiver<bool>,
}

impl Reconciler {
    pub fn new(
        counters: Arc<dyn CounterCache>,
        snapshots: Arc<dyn SnapshotStore>,
        period: Duration,
        wakeup: Arc<Notify>,
        stop: watch::Receiver<bool>,
    ) -> Self {
        Self {
            counters,
            snapshots,
            period,
            wakeup,
            stop,
        }
    }

    /// Loop until the stop signal flips. The signal is checked between
    /// sweeps, so shutdown is observed within one tick.
    pub async fn run(self) {
        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut stop = self.stop.clone();

        loop {
            tokio::select! {
                _ = ticker.tick() => self.sweep().await,
                _ = self.wakeup.notified() => self.sweep().await,
                _ = stop.changed() => {
                    debug!("Reconciler stopping");
                    return;
                }
            }
        }
    }

    async fn sweep(&self) {
        let items = match self.counters.active_items().await {
            Ok(items) => items,
            Err(e) => {
                warn!("Sweep aborted, cache enumeration failed: {e}");
                return;
            }
        };

        let total = items.len();
        let mut written = 0;

        for item in items {
            let (likes, dislikes) = match self.counters.get(item).await {
                Ok(counts) => counts,
                Err(e) => {
                    warn!("Skipping item {item}, count read failed: {e}");
                    continue;
                }
            };

            match self.snapshots.write_snapshot(item, likes, dislikes).await {
                Ok(()) => written += 1,
                Err(e) => warn!("Snapshot write failed for item {item}: {e}"),
            }
        }

        debug!("Sweep complete, {written}/{total} snapshots written");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        memory::{MemorySnapshots, MemoryStore},
        types::{ItemId, UserId},
        vote::VoteService,
    };

    struct Fixture {
        service: VoteService,
        snapshots: Arc<MemorySnapshots>,
        stop: watch::Sender<bool>,
        handle: tokio::task::JoinHandle<()>,
    }

    fn spawn_reconciler(period: Duration) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let snapshots = Arc::new(MemorySnapshots::new());
        let wakeup = Arc::new(Notify::new());
        let (stop, stop_rx) = watch::channel(false);

        let service = VoteService::new(store.clone(), store.clone(), wakeup.clone());
        let reconciler = Reconciler::new(store, snapshots.clone(), period, wakeup, stop_rx);
        let handle = tokio::spawn(reconciler.run());

        Fixture {
            service,
            snapshots,
            stop,
            handle,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_sweep_converges_with_the_cache() {
        let fx = spawn_reconciler(Duration::from_secs(30));
        let item = ItemId(1);

        fx.service.like(UserId(1), item).await.unwrap();
        fx.service.dislike(UserId(2), item).await.unwrap();

        // Eager wakeups may already have swept; the tick must regardless.
        tokio::time::sleep(Duration::from_secs(31)).await;

        assert_eq!(fx.snapshots.snapshot(item).await, Some((1, 1)));

        fx.stop.send(true).unwrap();
        fx.handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn eager_sweep_runs_without_waiting_for_the_tick() {
        let fx = spawn_reconciler(Duration::from_secs(3600));
        let item = ItemId(7);

        fx.service.like(UserId(9), item).await.unwrap();

        // Far less than the period: only the wakeup can have driven this.
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(fx.snapshots.snapshot(item).await, Some((1, 0)));

        fx.stop.send(true).unwrap();
        fx.handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_covers_every_active_item() {
        let fx = spawn_reconciler(Duration::from_secs(30));

        for id in 0..5 {
            fx.service.like(UserId(id), ItemId(id)).await.unwrap();
        }
        tokio::time::sleep(Duration::from_secs(31)).await;

        for id in 0..5 {
            assert_eq!(fx.snapshots.snapshot(ItemId(id)).await, Some((1, 0)));
        }

        fx.stop.send(true).unwrap();
        fx.handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn stop_signal_ends_the_loop_before_the_next_tick() {
        let fx = spawn_reconciler(Duration::from_secs(30));

        fx.stop.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(1), fx.handle)
            .await
            .expect("reconciler did not observe stop")
            .unwrap();
    }
}
