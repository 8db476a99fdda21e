//! Background Expiry Sweeper
//!
//! Reads never check an entry's age, so something has to remove entries
//! that outlived the life window. This module runs that pass as a Tokio task
//! once every clean window.
//!
//! ## Design
//!
//! The sweeper:
//! 1. Waits for the next tick of a fixed interval (the clean window)
//! 2. Sweeps every shard, holding each shard lock only for its own pass
//! 3. Logs how many entries were removed
//!
//! Dropping the returned [`ExpirySweeper`] handle stops the task.

use crate::storage::ShardStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// A handle to the running expiry sweeper.
///
/// When this handle is dropped, the sweeper task will be stopped.
#[derive(Debug)]
pub struct ExpirySweeper {
    /// Sender to signal shutdown
    shutdown_tx: watch::Sender<bool>,
}

impl ExpirySweeper {
    /// Starts the expiry sweeper as a background task.
    ///
    /// # Arguments
    ///
    /// * `store` - The store to sweep
    /// * `interval` - Time between sweeps; must be non-zero
    pub fn start(store: Arc<ShardStore>, interval: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(sweeper_loop(store, interval, shutdown_rx));

        info!(
            interval_secs = interval.as_secs_f64(),
            "Background expiry sweeper started"
        );

        Self { shutdown_tx }
    }

    /// Stops the expiry sweeper.
    ///
    /// This is called automatically when the handle is dropped.
    pub fn stop(&self) {
        if self.shutdown_tx.send(true).is_ok() {
            info!("Background expiry sweeper stopped");
        }
    }
}

impl Drop for ExpirySweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The main sweeper loop.
async fn sweeper_loop(
    store: Arc<ShardStore>,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; there is nothing to sweep yet.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("Expiry sweeper received shutdown signal");
                    return;
                }
            }
        }

        if store.is_empty() {
            continue;
        }

        let expired = store.cleanup_expired();

        if expired > 0 {
            debug!(
                expired = expired,
                entries_remaining = store.len(),
                "Expired entries cleaned up"
            );
        }
    }
}

/// Starts the sweeper at the store's configured clean window.
///
/// Returns `None` when the clean window or the life window is zero, since
/// there is then nothing for a sweeper to do.
pub fn start_expiry_sweeper(store: Arc<ShardStore>) -> Option<ExpirySweeper> {
    let config = store.config();
    if config.clean_window.is_zero() || config.life_window.is_zero() {
        info!("Expiry sweeper disabled");
        return None;
    }

    let interval = config.clean_window;
    Some(ExpirySweeper::start(store, interval))
}
