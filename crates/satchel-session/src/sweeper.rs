//! Periodic garbage collection task.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::provider::SessionProvider;

/// Longest sweep period; larger intervals are clamped to it.
const MAX_INTERVAL: Duration = Duration::from_secs(86400 * 365 * 30);

/// Spawns the background sweeper.
pub struct GcTask;

impl GcTask {
    /// Start sweeping `provider` every `interval`, reclaiming sessions idle
    /// longer than `ttl`.
    ///
    /// The first sweep runs one interval after spawning. Intervals longer
    /// than thirty years are clamped. Must be called from within a tokio
    /// runtime.
    pub fn spawn<P: SessionProvider>(
        provider: Arc<P>,
        ttl: Duration,
        interval: Duration,
    ) -> Result<GcHandle> {
        if interval.is_zero() {
            return Err(Error::InvalidConfig(
                "gc interval must be greater than zero".to_string(),
            ));
        }

        let interval = interval.min(MAX_INTERVAL);
        let cancel = CancellationToken::new();
        let sweeps = Arc::new(AtomicU64::new(0));
        let reclaimed = Arc::new(AtomicU64::new(0));

        let token = cancel.clone();
        let sweep_count = Arc::clone(&sweeps);
        let reclaimed_count = Arc::clone(&reclaimed);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let removed = provider.gc(ttl);
                        sweep_count.fetch_add(1, Ordering::Relaxed);
                        reclaimed_count.fetch_add(removed as u64, Ordering::Relaxed);
                        if removed > 0 {
                            debug!(removed = removed, "Periodic GC sweep");
                        }
                    }
                }
            }

            debug!("GC task stopped");
        });

        info!(ttl = ?ttl, interval = ?interval, "GC task started");

        Ok(GcHandle {
            cancel,
            handle: Some(handle),
            sweeps,
            reclaimed,
        })
    }
}

/// Handle to a running sweeper.
///
/// Dropping the handle cancels the task; [`stop`](Self::stop) also waits
/// for it to finish.
pub struct GcHandle {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
    sweeps: Arc<AtomicU64>,
    reclaimed: Arc<AtomicU64>,
}

impl GcHandle {
    /// Whether the task is still running.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Sweeps completed so far.
    pub fn sweeps(&self) -> u64 {
        self.sweeps.load(Ordering::Relaxed)
    }

    /// Sessions reclaimed by this task so far.
    pub fn reclaimed(&self) -> u64 {
        self.reclaimed.load(Ordering::Relaxed)
    }

    /// Cancel the task and wait for it to exit.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for GcHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
