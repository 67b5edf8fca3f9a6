//! Snapshot distribution.
//!
//! The latest-snapshot cell is a `watch` channel whose only sender lives in
//! [`SnapshotPublisher`]; readers clone the current `Arc` and never block the
//! writer. Push delivery goes through a bounded `broadcast` channel, so a slow
//! subscriber lags and loses old snapshots instead of stalling `publish`.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};

use super::metrics::Snapshot;

pub const DEFAULT_FANOUT_CAPACITY: usize = 16;

/// Single writer of the latest-snapshot cell.
pub struct SnapshotPublisher {
    tx: watch::Sender<Arc<Snapshot>>,
}

/// Cloneable read handle on the latest-snapshot cell.
#[derive(Clone)]
pub struct SnapshotReader {
    rx: watch::Receiver<Arc<Snapshot>>,
}

/// Create the cell holding an initial zeroed snapshot.
pub fn snapshot_cell() -> (SnapshotPublisher, SnapshotReader) {
    let (tx, rx) = watch::channel(Arc::new(Snapshot::default()));
    (SnapshotPublisher { tx }, SnapshotReader { rx })
}

impl SnapshotPublisher {
    /// Overwrite the cell. Succeeds with or without readers.
    pub fn publish(&self, snapshot: Arc<Snapshot>) {
        self.tx.send_replace(snapshot);
    }

    pub fn reader(&self) -> SnapshotReader {
        SnapshotReader {
            rx: self.tx.subscribe(),
        }
    }
}

impl SnapshotReader {
    /// Most recently published snapshot, or the zeroed one before the first publish.
    pub fn read_latest(&self) -> Arc<Snapshot> {
        Arc::clone(&self.rx.borrow())
    }

    /// Wait for the next publish. Returns `false` once the publisher is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

/// Publishing side of distribution, owned by the collection loop.
pub struct Distributor {
    cell: SnapshotPublisher,
    fanout: broadcast::Sender<Arc<Snapshot>>,
}

impl Distributor {
    pub fn new(capacity: usize) -> Self {
        let (cell, _) = snapshot_cell();
        let (fanout, _) = broadcast::channel(capacity.max(1));
        Self { cell, fanout }
    }

    /// Update the latest cell and push to every connected subscriber.
    /// Returns the number of subscribers the snapshot was queued for.
    pub fn publish(&self, snapshot: Arc<Snapshot>) -> usize {
        self.cell.publish(Arc::clone(&snapshot));
        // Err only means nobody is subscribed
        self.fanout.send(snapshot).unwrap_or(0)
    }

    pub fn get_latest(&self) -> Arc<Snapshot> {
        self.cell.reader().read_latest()
    }

    pub fn subscriber_count(&self) -> usize {
        self.fanout.receiver_count()
    }

    pub fn handle(&self) -> DistributionHandle {
        DistributionHandle {
            latest: self.cell.reader(),
            fanout: self.fanout.clone(),
        }
    }
}

impl Default for Distributor {
    fn default() -> Self {
        Self::new(DEFAULT_FANOUT_CAPACITY)
    }
}

/// Transport-facing handle: pull the latest snapshot or subscribe to new ones.
#[derive(Clone)]
pub struct DistributionHandle {
    latest: SnapshotReader,
    fanout: broadcast::Sender<Arc<Snapshot>>,
}

impl DistributionHandle {
    pub fn get_latest(&self) -> Arc<Snapshot> {
        self.latest.read_latest()
    }

    pub fn latest_reader(&self) -> SnapshotReader {
        self.latest.clone()
    }

    /// New subscription whose first item is the current latest snapshot.
    ///
    /// The receiver is attached before the cell is read, so a concurrent
    /// publish shows up at worst twice and never goes missing.
    pub fn subscribe(&self) -> Subscription {
        let rx = self.fanout.subscribe();
        Subscription {
            initial: Some(self.latest.read_latest()),
            rx,
            closed: self.latest.clone(),
        }
    }
}

pub struct Subscription {
    initial: Option<Arc<Snapshot>>,
    rx: broadcast::Receiver<Arc<Snapshot>>,
    closed: SnapshotReader,
}

impl Subscription {
    /// Next snapshot for this subscriber, `None` once the engine has gone away.
    ///
    /// Snapshots missed while lagging are skipped.
    pub async fn next(&mut self) -> Option<Arc<Snapshot>> {
        if let Some(initial) = self.initial.take() {
            return Some(initial);
        }

        loop {
            tokio::select! {
                biased;
                received = self.rx.recv() => match received {
                    Ok(snapshot) => return Some(snapshot),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        log::debug!("Subscriber lagged, skipped {} snapshots", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                },
                alive = self.closed.changed() => {
                    if !alive {
                        // drain anything queued before the publisher went away
                        return self.rx.try_recv().ok();
                    }
                }
            }
        }
    }
}
