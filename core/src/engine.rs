//! Engine facade
//!
//! Owns everything a host needs to run scripts: the compiled-script cache,
//! the named registry, task and pool registries, and the optional monitor.
//! An engine is shared across threads; every run gets its own context.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, info_span};

use crate::cache::{ScriptCache, ScriptRegistry};
use crate::config::Config;
use crate::interpreter::{
    ExecutionContext, ExpressionEvaluator, HostContext, Interpreter, NfError, NfEvaluator,
    PoolRegistry, Script, ScriptLogger, Services, SyntaxError, Task, TaskRegistry, Value,
};
use crate::monitor::PerformanceMonitor;

pub struct Engine {
    services: Services,
    cache: ScriptCache,
    registry: ScriptRegistry,
    monitor: Option<PerformanceMonitor>,
    max_duration: Option<Duration>,
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Engine with the standard tasks, configured by `config`
    pub fn new(config: Config) -> Result<Self> {
        Self::builder().config(config).build()
    }

    /// Compile through the cache
    pub fn compile(&self, text: &str) -> Result<Arc<Script>, SyntaxError> {
        self.cache.get_or_compile(text)
    }

    /// Compile (or reuse) `text` and run it.
    ///
    /// Returns the exported value, or `None` when the script never exports.
    pub fn run(
        &self,
        text: &str,
        logger: Option<Arc<dyn ScriptLogger>>,
        host: &HostContext,
    ) -> Result<Option<Value>, NfError> {
        let script = self.cache.get_or_compile(text)?;
        self.execute(&script, logger, host)
    }

    /// Run a script from the named registry
    pub fn run_registered(
        &self,
        name: &str,
        logger: Option<Arc<dyn ScriptLogger>>,
        host: &HostContext,
    ) -> Result<Option<Value>, NfError> {
        let script = self.registry.get_ast(name)?;
        self.execute(&script, logger, host)
    }

    /// Run an already compiled script
    pub fn execute(
        &self,
        script: &Script,
        logger: Option<Arc<dyn ScriptLogger>>,
        host: &HostContext,
    ) -> Result<Option<Value>, NfError> {
        let mut ctx = ExecutionContext::new(host)
            .with_logger(logger)
            .with_max_duration(self.max_duration);

        let short_hash = script.hash.get(..12).unwrap_or(&script.hash);
        let span = info_span!("nf_run", run_id = %ctx.run_id(), hash = short_hash);
        let _enter = span.enter();

        let started = Instant::now();
        let result = Interpreter::new(&self.services, self.monitor.as_ref()).run(script, &mut ctx);
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(export) => debug!(elapsed_ms, exported = export.is_some(), "run finished"),
            Err(e) => debug!(elapsed_ms, error = %e, "run failed"),
        }
        result
    }

    pub fn registry(&self) -> &ScriptRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &ScriptCache {
        &self.cache
    }

    pub fn monitor(&self) -> Option<&PerformanceMonitor> {
        self.monitor.as_ref()
    }

    pub fn tasks(&self) -> &TaskRegistry {
        &self.services.tasks
    }

    pub fn max_duration(&self) -> Option<Duration> {
        self.max_duration
    }

    /// Stop the cache sweeper and drop every cached and registered script,
    /// along with the evaluator's parsed expressions
    pub fn shutdown(&self) {
        self.cache.shutdown();
        self.registry.clear();
        self.services.evaluator.clear();
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("cache", &self.cache)
            .field("registered", &self.registry.size())
            .field("tasks", &self.services.tasks)
            .field("pools", &self.services.pools)
            .field("monitor", &self.monitor.is_some())
            .field("max_duration", &self.max_duration)
            .finish()
    }
}

/// Builder for an [`Engine`]
pub struct EngineBuilder {
    config: Config,
    tasks: TaskRegistry,
    evaluator: Option<Arc<dyn ExpressionEvaluator>>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            config: Config::default(),
            tasks: TaskRegistry::with_defaults(),
            evaluator: None,
        }
    }
}

impl EngineBuilder {
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Register a host task, replacing a standard task of the same name
    pub fn task(mut self, name: impl Into<String>, task: impl Task + 'static) -> Self {
        self.tasks.register(name, task);
        self
    }

    /// Replace the whole task registry, standard tasks included
    pub fn tasks(mut self, tasks: TaskRegistry) -> Self {
        self.tasks = tasks;
        self
    }

    /// Use a custom expression evaluator instead of [`NfEvaluator`]
    pub fn evaluator(mut self, evaluator: Arc<dyn ExpressionEvaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    pub fn monitor(mut self, enabled: bool) -> Self {
        self.config.interpreter.monitor = enabled;
        self
    }

    pub fn max_duration(mut self, limit: Option<Duration>) -> Self {
        self.config.interpreter.max_duration_ms = limit.map_or(0, |d| d.as_millis() as u64);
        self
    }

    pub fn build(self) -> Result<Engine> {
        let config = self.config;

        let pools = PoolRegistry::new(config.pools.default_threads, &config.pools.named)
            .context("Failed to build thread pools")?;
        let cache = ScriptCache::new(config.sweep_interval()).context("Failed to start script cache")?;
        let evaluator = self
            .evaluator
            .unwrap_or_else(|| Arc::new(NfEvaluator::new()));

        debug!(
            tasks = self.tasks.len(),
            pools = ?pools.names(),
            monitor = config.interpreter.monitor,
            "engine ready"
        );

        Ok(Engine {
            services: Services::new(evaluator, Arc::new(self.tasks), Arc::new(pools)),
            cache,
            registry: ScriptRegistry::new(),
            monitor: config.interpreter.monitor.then(PerformanceMonitor::new),
            max_duration: config.max_duration(),
        })
    }
}
