use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Duration;

use super::indexer::BlockIndexer;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MonitorError {
    #[error("monitor already running")]
    AlreadyRunning,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonitorStatus {
    pub running: bool,
    pub last_tick_at: Option<DateTime<Utc>>,
    pub processed_blocks: u64,
}

#[derive(Default)]
struct MonitorStats {
    next_block: AtomicI64,
    processed_blocks: AtomicU64,
    last_tick_at: RwLock<Option<DateTime<Utc>>>,
}

struct RunningTask {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Background task that indexes the next block on every tick.
pub struct ContractsMonitor {
    indexer: Arc<BlockIndexer>,
    poll_interval: Duration,
    task: Mutex<Option<RunningTask>>,
    stats: Arc<MonitorStats>,
}

impl ContractsMonitor {
    pub fn new(indexer: Arc<BlockIndexer>, poll_interval: Duration) -> Self {
        Self {
            indexer,
            poll_interval,
            task: Mutex::new(None),
            stats: Arc::new(MonitorStats::default()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|t| !t.handle.is_finished())
    }

    pub fn start(&self) -> Result<(), MonitorError> {
        let mut slot = self.task.lock();
        if slot.as_ref().is_some_and(|t| !t.handle.is_finished()) {
            return Err(MonitorError::AlreadyRunning);
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(run_monitor_loop(
            self.indexer.clone(),
            self.stats.clone(),
            self.poll_interval,
            stop_rx,
        ));
        *slot = Some(RunningTask { stop_tx, handle });

        tracing::info!(poll_interval_ms = self.poll_interval.as_millis() as u64, "Contracts monitor started");
        Ok(())
    }

    /// Signal the loop to stop and wait for it. Returns whether a task was
    /// running. Stopping an idle monitor is a no-op.
    pub async fn stop(&self) -> bool {
        let task = self.task.lock().take();
        let Some(task) = task else {
            return false;
        };

        let _ = task.stop_tx.send(true);
        if let Err(e) = task.handle.await {
            tracing::error!(error = %e, "Contracts monitor task ended abnormally");
        }
        tracing::info!("Contracts monitor stopped");
        true
    }

    pub fn status(&self) -> MonitorStatus {
        MonitorStatus {
            running: self.is_running(),
            last_tick_at: *self.stats.last_tick_at.read(),
            processed_blocks: self.stats.processed_blocks.load(Ordering::Relaxed),
        }
    }
}

async fn run_monitor_loop(
    indexer: Arc<BlockIndexer>,
    stats: Arc<MonitorStats>,
    poll_interval: Duration,
    mut stop_rx: watch::Receiver<bool>,
) {
    loop {
        if *stop_rx.borrow() {
            break;
        }

        let block = stats.next_block.load(Ordering::Relaxed);
        match indexer.index_block_range(block, block).await {
            Ok(_) => {
                stats.next_block.fetch_add(1, Ordering::Relaxed);
                stats.processed_blocks.fetch_add(1, Ordering::Relaxed);
                *stats.last_tick_at.write() = Some(Utc::now());
                tracing::debug!(block, "Monitor tick indexed block");
            }
            Err(e) => {
                tracing::error!(error = %e, block, "Monitor tick failed");
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(poll_interval) => {}
            changed = stop_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
}
