//! Offline mutation queue.
//!
//! Buffers writes in durable local storage while the store is unreachable and
//! flushes them when triggered. Delivery is at-least-once: an item is removed
//! only after the transport confirms it, so a crash between send and removal
//! re-sends the item and the store absorbs the duplicate. Capacity is bounded;
//! oldest entries are dropped on overflow.

use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use crate::error::Result;
use crate::models::ping::LocationPing;
use crate::models::sync::{QueueItem, SyncAck, SyncPayload, SyncStatus};

/// Durable storage port for the queue. Load/store is read-modify-write; the
/// queue serializes access within this process, and cross-process sharing of
/// one spool is not supported.
pub trait QueueStorage: Send + Sync {
    fn load(&self) -> Result<Vec<QueueItem>>;
    fn store(&self, items: &[QueueItem]) -> Result<()>;
}

/// Transport the queue flushes through.
#[async_trait]
pub trait SyncTransport: Send + Sync {
    async fn send(&self, payload: &SyncPayload) -> Result<SyncAck>;
}

/// JSON-file spool used by the daemon. A missing file is an empty queue.
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl QueueStorage for JsonFileStorage {
    fn load(&self) -> Result<Vec<QueueItem>> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, items: &[QueueItem]) -> Result<()> {
        let bytes = serde_json::to_vec(items)?;
        std::fs::write(&self.path, bytes)?;
        Ok(())
    }
}

/// In-memory storage, for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryStorage {
    items: Mutex<Vec<QueueItem>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl QueueStorage for MemoryStorage {
    fn load(&self) -> Result<Vec<QueueItem>> {
        Ok(self.items.lock().expect("queue storage poisoned").clone())
    }

    fn store(&self, items: &[QueueItem]) -> Result<()> {
        *self.items.lock().expect("queue storage poisoned") = items.to_vec();
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    pub sent: usize,
    pub failed: usize,
}

pub struct OfflineQueue<S: QueueStorage> {
    storage: S,
    capacity: usize,
    gps_batch_size: usize,
    // Serializes the storage read-modify-write between enqueue and flush.
    guard: tokio::sync::Mutex<()>,
}

impl<S: QueueStorage> OfflineQueue<S> {
    pub fn new(storage: S, capacity: usize, gps_batch_size: usize) -> Self {
        Self {
            storage,
            capacity,
            gps_batch_size: gps_batch_size.max(1),
            guard: tokio::sync::Mutex::new(()),
        }
    }

    /// Append a mutation and return its id immediately; no network involved.
    /// Oldest entries are dropped when the queue is over capacity.
    pub async fn enqueue(&self, payload: SyncPayload) -> Result<Uuid> {
        let _guard = self.guard.lock().await;
        let mut items = self.storage.load()?;

        let item = QueueItem::new(payload, Utc::now());
        let id = item.id;
        items.push(item);

        if items.len() > self.capacity {
            let dropped = items.len() - self.capacity;
            items.drain(..dropped);
            warn!(dropped, "offline queue over capacity, dropped oldest entries");
        }

        self.storage.store(&items)?;
        Ok(id)
    }

    /// Demote items stranded in `syncing` by a crash back to `failed` so the
    /// next flush retries them. Called once when the spool is reopened.
    pub async fn recover(&self) -> Result<usize> {
        let _guard = self.guard.lock().await;
        let mut items = self.storage.load()?;
        let mut recovered = 0;
        for item in &mut items {
            if item.status == SyncStatus::Syncing {
                item.status = SyncStatus::Failed;
                recovered += 1;
            }
        }
        if recovered > 0 {
            self.storage.store(&items)?;
            warn!(recovered, "reclaimed queue items stranded mid-sync");
        }
        Ok(recovered)
    }

    pub async fn len(&self) -> Result<usize> {
        let _guard = self.guard.lock().await;
        Ok(self.storage.load()?.len())
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Send all pending and failed items. GPS items are coalesced into batches
    /// of up to the configured size, in enqueue order; everything else goes
    /// out one item at a time. Confirmed items are removed, failures stay
    /// queued as failed for the next trigger.
    pub async fn flush(&self, transport: &dyn SyncTransport) -> Result<FlushReport> {
        let snapshot = {
            let _guard = self.guard.lock().await;
            let mut items = self.storage.load()?;
            // Flushes are serialized, so anything still marked syncing here
            // was stranded by an earlier flush that errored after sending.
            // Demote it so it is eligible again below.
            for item in &mut items {
                if item.status == SyncStatus::Syncing {
                    item.status = SyncStatus::Failed;
                }
            }
            let eligible: Vec<QueueItem> = items
                .iter()
                .filter(|i| matches!(i.status, SyncStatus::Pending | SyncStatus::Failed))
                .cloned()
                .collect();
            if eligible.is_empty() {
                return Ok(FlushReport::default());
            }
            for item in &mut items {
                if matches!(item.status, SyncStatus::Pending | SyncStatus::Failed) {
                    item.status = SyncStatus::Syncing;
                }
            }
            self.storage.store(&items)?;
            eligible
        };

        let mut report = FlushReport::default();
        let mut synced: Vec<Uuid> = Vec::new();
        let mut failed: Vec<Uuid> = Vec::new();

        let (gps_items, other_items): (Vec<_>, Vec<_>) = snapshot
            .into_iter()
            .partition(|i| matches!(i.payload, SyncPayload::Gps(_)));

        for batch in gps_items.chunks(self.gps_batch_size) {
            let pings: Vec<LocationPing> = batch
                .iter()
                .flat_map(|item| match &item.payload {
                    SyncPayload::Gps(pings) => pings.clone(),
                    _ => Vec::new(),
                })
                .collect();
            let ids = batch.iter().map(|i| i.id);
            match transport.send(&SyncPayload::Gps(pings)).await {
                Ok(_) => synced.extend(ids),
                Err(e) => {
                    warn!(error = %e, "gps batch sync failed");
                    failed.extend(ids);
                }
            }
        }

        for item in &other_items {
            match transport.send(&item.payload).await {
                Ok(_) => synced.push(item.id),
                Err(e) => {
                    warn!(error = %e, item_type = item.payload.type_name(), "sync failed");
                    failed.push(item.id);
                }
            }
        }

        report.sent = synced.len();
        report.failed = failed.len();

        let _guard = self.guard.lock().await;
        let mut items = self.storage.load()?;
        items.retain(|i| !synced.contains(&i.id));
        for item in &mut items {
            if failed.contains(&item.id) {
                item.status = SyncStatus::Failed;
            }
        }
        self.storage.store(&items)?;
        Ok(report)
    }
}

impl OfflineQueue<JsonFileStorage> {
    pub fn open_spool(path: impl Into<PathBuf>, capacity: usize, gps_batch_size: usize) -> Self {
        Self::new(JsonFileStorage::new(path), capacity, gps_batch_size)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use super::*;

    /// Transport double: records sends, fails while `failing` is set.
    #[derive(Default)]
    struct TestTransport {
        failing: AtomicBool,
        sent: Mutex<Vec<SyncPayload>>,
    }

    impl TestTransport {
        fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        fn sent(&self) -> Vec<SyncPayload> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SyncTransport for TestTransport {
        async fn send(&self, payload: &SyncPayload) -> Result<SyncAck> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(crate::error::Error::Transport("connection refused".into()));
            }
            self.sent.lock().unwrap().push(payload.clone());
            Ok(SyncAck { count: 1 })
        }
    }

    fn ping(lat: f64) -> LocationPing {
        LocationPing {
            driver_id: Uuid::new_v4(),
            trip_id: Some(Uuid::new_v4()),
            latitude: lat,
            longitude: 121.0,
            accuracy: 5.0,
            speed: None,
            heading: None,
            timestamp: Utc::now(),
        }
    }

    fn gps(lat: f64) -> SyncPayload {
        SyncPayload::Gps(vec![ping(lat)])
    }

    #[tokio::test]
    async fn flush_success_removes_items() {
        let queue = OfflineQueue::new(MemoryStorage::new(), 100, 10);
        let transport = TestTransport::default();

        queue.enqueue(gps(14.6)).await.unwrap();
        queue.enqueue(gps(14.7)).await.unwrap();
        assert_eq!(queue.len().await.unwrap(), 2);

        let report = queue.flush(&transport).await.unwrap();
        assert_eq!(report, FlushReport { sent: 2, failed: 0 });
        assert!(queue.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn flush_failure_marks_failed_and_retries_next_flush() {
        let queue = OfflineQueue::new(MemoryStorage::new(), 100, 10);
        let transport = TestTransport::default();
        transport.set_failing(true);

        queue.enqueue(gps(14.6)).await.unwrap();
        let report = queue.flush(&transport).await.unwrap();
        assert_eq!(report, FlushReport { sent: 0, failed: 1 });
        assert_eq!(queue.len().await.unwrap(), 1);

        transport.set_failing(false);
        let report = queue.flush(&transport).await.unwrap();
        assert_eq!(report, FlushReport { sent: 1, failed: 0 });
        assert!(queue.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn capacity_overflow_drops_oldest() {
        let queue = OfflineQueue::new(MemoryStorage::new(), 3, 10);
        let transport = TestTransport::default();

        for lat in [14.1, 14.2, 14.3, 14.4, 14.5] {
            queue.enqueue(gps(lat)).await.unwrap();
        }
        assert_eq!(queue.len().await.unwrap(), 3);

        queue.flush(&transport).await.unwrap();
        let sent = transport.sent();
        assert_eq!(sent.len(), 1); // one coalesced gps batch
        let SyncPayload::Gps(pings) = &sent[0] else {
            panic!("expected gps batch");
        };
        let lats: Vec<f64> = pings.iter().map(|p| p.latitude).collect();
        assert_eq!(lats, vec![14.3, 14.4, 14.5]);
    }

    #[tokio::test]
    async fn gps_batches_preserve_enqueue_order_and_respect_batch_size() {
        let queue = OfflineQueue::new(MemoryStorage::new(), 100, 2);
        let transport = TestTransport::default();

        for lat in [14.1, 14.2, 14.3] {
            queue.enqueue(gps(lat)).await.unwrap();
        }
        queue.flush(&transport).await.unwrap();

        let sent = transport.sent();
        assert_eq!(sent.len(), 2); // 2 + 1
        let SyncPayload::Gps(first) = &sent[0] else {
            panic!("expected gps batch");
        };
        assert_eq!(
            first.iter().map(|p| p.latitude).collect::<Vec<_>>(),
            vec![14.1, 14.2]
        );
    }

    #[tokio::test]
    async fn non_gps_items_are_sent_individually() {
        let queue = OfflineQueue::new(MemoryStorage::new(), 100, 10);
        let transport = TestTransport::default();

        let record = crate::models::record::BillingRecord {
            id: Uuid::new_v4(),
            site_id: Uuid::new_v4(),
            driver_id: Uuid::new_v4(),
            date: chrono::NaiveDate::from_ymd_opt(2026, 8, 29).unwrap(),
            amount: 1500.0,
            reference: "AUG-0012".into(),
        };
        queue
            .enqueue(SyncPayload::Billing(record.clone()))
            .await
            .unwrap();
        queue.enqueue(gps(14.6)).await.unwrap();

        queue.flush(&transport).await.unwrap();
        let sent = transport.sent();
        assert_eq!(sent.len(), 2);
        assert!(sent.contains(&SyncPayload::Billing(record)));
    }

    #[tokio::test]
    async fn spool_write_failure_after_send_does_not_strand_the_item() {
        /// Storage double whose nth `store` call fails; everything else passes
        /// through to an in-memory spool.
        struct FlakyStorage {
            inner: MemoryStorage,
            stores: AtomicUsize,
            fail_on: usize,
        }

        impl QueueStorage for FlakyStorage {
            fn load(&self) -> Result<Vec<QueueItem>> {
                self.inner.load()
            }

            fn store(&self, items: &[QueueItem]) -> Result<()> {
                if self.stores.fetch_add(1, Ordering::SeqCst) + 1 == self.fail_on {
                    return Err(
                        std::io::Error::new(std::io::ErrorKind::Other, "disk full").into()
                    );
                }
                self.inner.store(items)
            }
        }

        // Store calls: #1 enqueue, #2 mark-syncing, #3 the post-send
        // reconcile, which is the one that fails.
        let queue = OfflineQueue::new(
            FlakyStorage {
                inner: MemoryStorage::new(),
                stores: AtomicUsize::new(0),
                fail_on: 3,
            },
            100,
            10,
        );
        let transport = TestTransport::default();

        queue.enqueue(gps(14.6)).await.unwrap();
        assert!(queue.flush(&transport).await.is_err());
        assert_eq!(queue.len().await.unwrap(), 1);

        // The next flush must pick the item back up, not skip it as syncing.
        let report = queue.flush(&transport).await.unwrap();
        assert_eq!(report, FlushReport { sent: 1, failed: 0 });
        assert!(queue.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn recover_requeues_items_stranded_in_syncing() {
        let storage = MemoryStorage::new();
        let mut item = QueueItem::new(gps(14.6), Utc::now());
        item.status = SyncStatus::Syncing;
        storage.store(&[item]).unwrap();

        let queue = OfflineQueue::new(storage, 100, 10);
        assert_eq!(queue.recover().await.unwrap(), 1);

        let transport = TestTransport::default();
        let report = queue.flush(&transport).await.unwrap();
        assert_eq!(report, FlushReport { sent: 1, failed: 0 });
    }

    #[tokio::test]
    async fn file_spool_survives_reopen() {
        let dir = std::env::temp_dir().join(format!("minehaul-spool-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let spool = dir.join("queue.json");

        {
            let queue = OfflineQueue::open_spool(&spool, 100, 10);
            queue.enqueue(gps(14.6)).await.unwrap();
        }

        let queue = OfflineQueue::open_spool(&spool, 100, 10);
        assert_eq!(queue.len().await.unwrap(), 1);

        let transport = TestTransport::default();
        queue.flush(&transport).await.unwrap();
        assert!(queue.is_empty().await.unwrap());

        std::fs::remove_dir_all(&dir).ok();
    }
}
