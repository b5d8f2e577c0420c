//! Background flush scheduling.
//!
//! The flush loop is an explicit spawned task with a cancellation handle, not
//! an ambient interval: it fires on a configured cadence (with jitter so a
//! fleet of clients does not thunder in step), on an explicit trigger, and
//! drains once more on shutdown.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::Rng;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::queue::{OfflineQueue, QueueStorage, SyncTransport};

pub struct FlushScheduler {
    trigger: Arc<Notify>,
    shutdown: watch::Sender<bool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl FlushScheduler {
    /// Request an immediate flush (e.g. on an online transition).
    pub fn trigger_now(&self) {
        self.trigger.notify_one();
    }

    /// Cancel the loop and wait for it to finish its in-flight flush.
    /// Idempotent; later calls return immediately.
    pub async fn stop(&self) {
        let _ = self.shutdown.send(true);
        let handle = self.handle.lock().expect("scheduler handle poisoned").take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

pub fn spawn_flush_task<S>(
    queue: Arc<OfflineQueue<S>>,
    transport: Arc<dyn SyncTransport>,
    interval: Duration,
    jitter_ms: u64,
) -> FlushScheduler
where
    S: QueueStorage + 'static,
{
    let trigger = Arc::new(Notify::new());
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let loop_trigger = trigger.clone();

    let handle = tokio::spawn(async move {
        loop {
            let pause = interval + Duration::from_millis(jitter(jitter_ms));
            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                _ = loop_trigger.notified() => {}
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                    continue;
                }
            }

            match queue.flush(transport.as_ref()).await {
                Ok(report) if report.sent > 0 || report.failed > 0 => {
                    info!(sent = report.sent, failed = report.failed, "queue flush");
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "queue flush errored"),
            }
        }
    });

    FlushScheduler {
        trigger,
        shutdown: shutdown_tx,
        handle: Mutex::new(Some(handle)),
    }
}

fn jitter(jitter_ms: u64) -> u64 {
    if jitter_ms == 0 {
        0
    } else {
        rand::thread_rng().gen_range(0..=jitter_ms)
    }
}
