//! Background eviction of idle cache entries
//!
//! One named thread per cache, running a current-thread tokio runtime that
//! ticks on the sweep interval until its cancellation token fires.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::Store;

const THREAD_NAME: &str = "nf-cache-sweeper";

pub(super) struct Sweeper {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
    exited: mpsc::Receiver<()>,
}

impl Sweeper {
    pub(super) fn spawn(store: Arc<Store>, interval: Duration) -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;

        let token = CancellationToken::new();
        let shutdown_token = token.clone();
        let (exit_tx, exited) = mpsc::channel();

        let handle = std::thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || {
                debug!(interval_secs = interval.as_secs_f64(), "cache sweeper started");
                runtime.block_on(sweep_loop(store, interval, shutdown_token));
                debug!("cache sweeper stopped");
                let _ = exit_tx.send(());
            })?;

        Ok(Self {
            token,
            handle: Some(handle),
            exited,
        })
    }

    /// Signal the thread and wait up to `wait` for it to exit
    pub(super) fn stop(mut self, wait: Duration) {
        self.token.cancel();

        match self.exited.recv_timeout(wait) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if let Some(handle) = self.handle.take() {
                    if handle.join().is_err() {
                        warn!("cache sweeper thread panicked");
                    }
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    wait_ms = wait.as_millis() as u64,
                    "cache sweeper did not stop in time, detaching"
                );
            }
        }
    }
}

async fn sweep_loop(store: Arc<Store>, interval: Duration, shutdown_token: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown_token.cancelled() => {
                debug!("cache sweeper received shutdown signal");
                break;
            }
            _ = ticker.tick() => {
                let evicted = store.evict_idle(Instant::now(), interval);
                if evicted > 0 {
                    debug!(evicted, remaining = store.entries.len(), "sweep evicted idle scripts");
                }
            }
        }
    }
}
