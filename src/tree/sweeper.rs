//! Background removal of orphaned nodes.
//!
//! A node is an orphan when its declared parent no longer exists, which
//! happens when a multi-statement operation dies halfway. The sweeper runs
//! one bulk delete per tick; orphans created by that delete (grandchildren
//! of a removed node) are picked up on the following tick.

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use super::NodeRepository;
use crate::db::DbPool;
use crate::{Result, SkyvaultError};

/// Default sweep interval in seconds (1 hour).
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 3600;

/// Periodic orphan-node cleaner.
#[derive(Debug, Clone)]
pub struct OrphanSweeper {
    pool: DbPool,
    interval: Duration,
}

impl OrphanSweeper {
    /// Create a sweeper with the default interval.
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
        }
    }

    /// Create a sweeper with a custom interval.
    ///
    /// Fails with `InvalidRequest` if `interval` is zero.
    pub fn with_interval(pool: DbPool, interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(SkyvaultError::InvalidRequest(
                "sweep interval must be greater than zero".to_string(),
            ));
        }
        Ok(Self { pool, interval })
    }

    /// The configured interval between passes.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run a single pass and return the number of nodes removed.
    pub async fn sweep_once(&self) -> Result<u64> {
        NodeRepository::delete_orphans(&self.pool).await
    }

    /// Spawn the sweeper on the current runtime.
    ///
    /// The first pass runs one full interval after start. The task stops
    /// when [`SweeperHandle::stop`] is called or the handle is dropped.
    pub fn start(self) -> SweeperHandle {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            self.run(cancel_rx).await;
        });

        SweeperHandle {
            cancel: cancel_tx,
            task,
        }
    }

    async fn run(&self, mut cancel: watch::Receiver<bool>) {
        info!(
            "Orphan sweeper started (interval: {} seconds)",
            self.interval.as_secs()
        );

        let mut timer = interval_at(Instant::now() + self.interval, self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    match self.sweep_once().await {
                        Ok(0) => debug!("Orphan sweep found nothing"),
                        Ok(removed) => info!("Orphan sweep removed {} node(s)", removed),
                        // Retried on the next tick.
                        Err(e) => error!("Orphan sweep failed: {}", e),
                    }
                }
                // Only `true` is ever sent; a dropped sender also ends the loop.
                _ = cancel.changed() => break,
            }
        }

        info!("Orphan sweeper stopped");
    }
}

/// Handle to a running [`OrphanSweeper`].
pub struct SweeperHandle {
    cancel: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Whether the background task is still running.
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Signal the sweeper to stop and wait for it to exit.
    ///
    /// A pass already in progress is allowed to finish.
    pub async fn stop(self) {
        let _ = self.cancel.send(true);
        if let Err(e) = self.task.await {
            error!("Orphan sweeper task failed: {}", e);
        }
    }
}
