//! # Script Cache
//!
//! Compiled scripts keyed by the SHA-256 of their text. The first request for a
//! text compiles it under the map's entry lock, so concurrent first uses of the
//! same text compile it once; later requests share the same `Arc<Script>`.
//!
//! A second map records the last access per hash. The [`sweeper`] thread
//! evicts entries idle for longer than the sweep interval.
//!
//! [`ScriptRegistry`] is the named counterpart: scripts registered once under
//! an explicit name.

mod registry;
mod sweeper;


use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use crate::interpreter::{compile, hash_source, Script, SyntaxError};

pub use registry::ScriptRegistry;
use sweeper::Sweeper;

/// Sweep interval when none is configured
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

/// How long `shutdown` waits for the sweeper thread
const SHUTDOWN_WAIT: Duration = Duration::from_secs(5);

/// The two maps shared with the sweeper thread
#[derive(Debug, Default)]
pub(crate) struct Store {
    entries: DashMap<String, Arc<Script>>,
    last_access: DashMap<String, Instant>,
}

impl Store {
    /// Remove every entry whose last access is more than `max_idle` before `now`
    pub(crate) fn evict_idle(&self, now: Instant, max_idle: Duration) -> usize {
        let is_idle = |at: &Instant| now.saturating_duration_since(*at) > max_idle;

        let stale: Vec<String> = self
            .last_access
            .iter()
            .filter(|entry| is_idle(entry.value()))
            .map(|entry| entry.key().clone())
            .collect();

        let mut evicted = 0;
        for hash in stale {
            // An access since the scan refreshed the timestamp
            if self.last_access.remove_if(&hash, |_, at| is_idle(at)).is_some() {
                self.entries.remove(&hash);
                evicted += 1;
            }
        }
        evicted
    }

    fn clear(&self) {
        self.entries.clear();
        self.last_access.clear();
    }
}

pub struct ScriptCache {
    store: Arc<Store>,
    sweep_interval: Duration,
    sweeper: Mutex<Option<Sweeper>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ScriptCache {
    /// Create a cache and start its sweeper thread
    pub fn new(sweep_interval: Duration) -> std::io::Result<Self> {
        let store = Arc::new(Store::default());
        let sweeper = Sweeper::spawn(Arc::clone(&store), sweep_interval)?;
        Ok(Self {
            store,
            sweep_interval,
            sweeper: Mutex::new(Some(sweeper)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    /// Compiled script for `text`, compiling it on first use
    pub fn get_or_compile(&self, text: &str) -> Result<Arc<Script>, SyntaxError> {
        let hash = hash_source(text);

        let script = match self.store.entries.get(&hash) {
            Some(script) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Arc::clone(script.value())
            }
            None => match self.store.entries.entry(hash.clone()) {
                // Lost a race with another first use
                Entry::Occupied(entry) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    Arc::clone(entry.get())
                }
                Entry::Vacant(entry) => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    let script = Arc::new(compile(text)?);
                    debug!(hash = &hash[..12], "cached compiled script");
                    entry.insert(Arc::clone(&script));
                    script
                }
            },
        };

        self.store.last_access.insert(hash, Instant::now());
        Ok(script)
    }

    pub fn evict_idle(&self, now: Instant, max_idle: Duration) -> usize {
        let evicted = self.store.evict_idle(now, max_idle);
        if evicted > 0 {
            debug!(evicted, remaining = self.len(), "evicted idle scripts");
        }
        evicted
    }

    pub fn contains(&self, text: &str) -> bool {
        self.store.entries.contains_key(&hash_source(text))
    }

    pub fn len(&self) -> usize {
        self.store.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.entries.is_empty()
    }

    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        match self.sweeper.lock() {
            Ok(sweeper) => sweeper.is_some(),
            Err(poisoned) => poisoned.into_inner().is_some(),
        }
    }

    /// Stop the sweeper and clear both maps. Safe to call more than once.
    pub fn shutdown(&self) {
        let sweeper = match self.sweeper.lock() {
            Ok(mut sweeper) => sweeper.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(sweeper) = sweeper {
            sweeper.stop(SHUTDOWN_WAIT);
        }
        self.store.clear();
    }
}

impl Drop for ScriptCache {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for ScriptCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptCache")
            .field("entries", &self.len())
            .field("sweep_interval", &self.sweep_interval)
            .field("running", &self.is_running())
            .finish()
    }
}
