//! Named thread pools for `task` fan-out
//!
//! A run picks its pool through the `$threadFactoryName` system binding. Unknown
//! or missing names fall back to the default pool.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

pub struct PoolRegistry {
    default: Arc<ThreadPool>,
    named: HashMap<String, Arc<ThreadPool>>,
}

impl PoolRegistry {
    /// Build the default pool plus one pool per `(name, threads)` entry
    pub fn new(default_threads: usize, named: &BTreeMap<String, usize>) -> Result<Self> {
        let default = Arc::new(build_pool("default", default_threads)?);
        let mut pools = HashMap::with_capacity(named.len());
        for (name, threads) in named {
            pools.insert(name.clone(), Arc::new(build_pool(name, *threads)?));
        }
        debug!(default_threads, named = pools.len(), "thread pools ready");
        Ok(Self {
            default,
            named: pools,
        })
    }

    pub fn default_pool(&self) -> &Arc<ThreadPool> {
        &self.default
    }

    /// Pool registered under `name`, or the default pool
    pub fn resolve(&self, name: Option<&str>) -> &Arc<ThreadPool> {
        name.and_then(|n| self.named.get(n)).unwrap_or(&self.default)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.named.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.named.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for PoolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolRegistry")
            .field("default_threads", &self.default.current_num_threads())
            .field("named", &self.names())
            .finish()
    }
}

fn build_pool(name: &str, threads: usize) -> Result<ThreadPool> {
    if threads == 0 {
        bail!("thread pool '{}' needs at least one thread", name);
    }
    let prefix = format!("nf-{}", name);
    ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(move |i| format!("{}-{}", prefix, i))
        .build()
        .with_context(|| format!("failed to build thread pool '{}'", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_named_and_default() {
        let mut named = BTreeMap::new();
        named.insert("io".to_string(), 2);
        let pools = PoolRegistry::new(1, &named).expect("Should build pools");

        assert_eq!(pools.resolve(Some("io")).current_num_threads(), 2);
        assert!(Arc::ptr_eq(pools.resolve(Some("missing")), pools.default_pool()));
        assert!(Arc::ptr_eq(pools.resolve(None), pools.default_pool()));
    }

    #[test]
    fn test_zero_threads_rejected() {
        let mut named = BTreeMap::new();
        named.insert("broken".to_string(), 0);
        assert!(PoolRegistry::new(1, &named).is_err());
    }

    #[test]
    fn test_threads_are_named() {
        let pools = PoolRegistry::new(1, &BTreeMap::new()).expect("Should build pools");
        let name = pools
            .default_pool()
            .install(|| std::thread::current().name().map(str::to_string));
        assert_eq!(name.as_deref(), Some("nf-default-0"));
    }
}
