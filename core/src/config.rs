//! Configuration management for NF
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Builder overrides (CLI flags)
//! 2. Environment variables (`NF__INTERPRETER__MAX_DURATION_MS`, etc.)
//! 3. Config file (`--config`, `NF_CONFIG_PATH`, `./nf.toml` or `~/.config/nf/config.toml`)
//! 4. Built-in defaults
//!
//! A `.env` file in the working directory is loaded first, so it can supply
//! any of the environment variables.
//!
//! # Example Config File (nf.toml)
//!
//! ```toml
//! [interpreter]
//! max_duration_ms = 60000
//! monitor = false
//!
//! [cache]
//! sweep_interval_secs = 3600
//!
//! [pools]
//! default_threads = 4
//!
//! [pools.named]
//! io = 8
//! ```

use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

const ENV_PREFIX: &str = "NF";
const ENV_SEPARATOR: &str = "__";
const CONFIG_PATH_VAR: &str = "NF_CONFIG_PATH";

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub interpreter: InterpreterConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub pools: PoolsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterpreterConfig {
    /// Run time limit in milliseconds; 0 disables the limit
    #[serde(default = "default_max_duration_ms")]
    pub max_duration_ms: u64,

    /// Time every statement with the performance monitor
    #[serde(default)]
    pub monitor: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Sweeper tick, also the idle time after which an entry is evicted
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolsConfig {
    #[serde(default = "default_threads")]
    pub default_threads: usize,

    /// Pool name → thread count, selected by a run's `threadFactoryName`
    #[serde(default)]
    pub named: BTreeMap<String, usize>,
}

// Default value functions for serde
fn default_max_duration_ms() -> u64 {
    60_000
}
fn default_sweep_interval_secs() -> u64 {
    3600
}
fn default_threads() -> usize {
    4
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            max_duration_ms: default_max_duration_ms(),
            monitor: false,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl Default for PoolsConfig {
    fn default() -> Self {
        Self {
            default_threads: default_threads(),
            named: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load configuration with the full priority chain
    pub fn load() -> Result<Self> {
        Self::builder().build()
    }

    /// Load configuration from a specific file, without environment overlay
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_str = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: Config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;

        Ok(config)
    }

    /// Create a builder for constructing config with overrides
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    pub fn max_duration(&self) -> Option<Duration> {
        match self.interpreter.max_duration_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.cache.sweep_interval_secs)
    }

    /// Render as TOML, in the same shape the config file uses
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to render config as TOML")
    }

    fn validate(&self) -> Result<()> {
        if self.pools.default_threads == 0 {
            bail!("pools.default_threads must be at least 1");
        }
        if let Some((name, _)) = self.pools.named.iter().find(|(_, threads)| **threads == 0) {
            bail!("pools.named.{} must be at least 1", name);
        }
        if self.cache.sweep_interval_secs == 0 {
            bail!("cache.sweep_interval_secs must be at least 1");
        }
        Ok(())
    }
}

/// Builder for constructing Config with optional overrides
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config_path: Option<PathBuf>,
    skip_env: bool,
    max_duration_ms: Option<u64>,
    monitor: Option<bool>,
    sweep_interval_secs: Option<u64>,
    default_threads: Option<usize>,
    named_pools: BTreeMap<String, usize>,
}

impl ConfigBuilder {
    /// Override the config file path
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    /// Ignore `.env`, `NF__*` variables and `NF_CONFIG_PATH`
    pub fn skip_env(mut self, skip: bool) -> Self {
        self.skip_env = skip;
        self
    }

    pub fn max_duration_ms(mut self, ms: Option<u64>) -> Self {
        self.max_duration_ms = ms;
        self
    }

    pub fn monitor(mut self, enabled: Option<bool>) -> Self {
        self.monitor = enabled;
        self
    }

    pub fn sweep_interval_secs(mut self, secs: Option<u64>) -> Self {
        self.sweep_interval_secs = secs;
        self
    }

    pub fn default_threads(mut self, threads: Option<usize>) -> Self {
        self.default_threads = threads;
        self
    }

    /// Add or replace a named pool
    pub fn named_pool(mut self, name: impl Into<String>, threads: usize) -> Self {
        self.named_pools.insert(name.into(), threads);
        self
    }

    /// Build the final config by applying the priority chain
    pub fn build(self) -> Result<Config> {
        if !self.skip_env {
            // Missing .env is fine
            let _ = dotenvy::dotenv();
        }

        let mut layers = config::Config::builder();

        if let Some(path) = self.locate_file()? {
            layers = layers.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }

        if !self.skip_env {
            layers = layers.add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            );
        }

        let mut config: Config = layers
            .build()
            .context("Failed to load configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        self.apply_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// Config file to load, if any (explicit path, env var, then default locations)
    fn locate_file(&self) -> Result<Option<PathBuf>> {
        if let Some(path) = &self.config_path {
            if !path.exists() {
                bail!("Config file not found: {:?}", path);
            }
            return Ok(Some(path.clone()));
        }

        if !self.skip_env {
            if let Ok(path_str) = env::var(CONFIG_PATH_VAR) {
                let path = PathBuf::from(path_str);
                if !path.exists() {
                    bail!("Config file not found: {:?}", path);
                }
                return Ok(Some(path));
            }
        }

        Ok(Self::find_config_file())
    }

    /// Search for config file in default locations
    fn find_config_file() -> Option<PathBuf> {
        let project_config = PathBuf::from("nf.toml");
        if project_config.exists() {
            return Some(project_config);
        }

        let home = env::var_os("HOME")?;
        let user_config = PathBuf::from(home).join(".config").join("nf").join("config.toml");
        user_config.exists().then_some(user_config)
    }

    /// Apply overrides (highest priority)
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(ms) = self.max_duration_ms {
            config.interpreter.max_duration_ms = ms;
        }
        if let Some(enabled) = self.monitor {
            config.interpreter.monitor = enabled;
        }
        if let Some(secs) = self.sweep_interval_secs {
            config.cache.sweep_interval_secs = secs;
        }
        if let Some(threads) = self.default_threads {
            config.pools.default_threads = threads;
        }
        for (name, threads) in &self.named_pools {
            config.pools.named.insert(name.clone(), *threads);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.interpreter.max_duration_ms, 60_000);
        assert!(!config.interpreter.monitor);
        assert_eq!(config.cache.sweep_interval_secs, 3600);
        assert_eq!(config.pools.default_threads, 4);
        assert!(config.pools.named.is_empty());
        assert_eq!(config.max_duration(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
            [interpreter]
            monitor = true

            [pools.named]
            io = 8
        "#;

        let config: Config = toml::from_str(toml_str).expect("Should parse");
        assert!(config.interpreter.monitor);
        assert_eq!(config.interpreter.max_duration_ms, 60_000); // Default
        assert_eq!(config.pools.named.get("io"), Some(&8));
    }

    #[test]
    fn test_builder_reads_file_and_applies_overrides() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("Should create temp file");
        writeln!(
            file,
            "[interpreter]\nmax_duration_ms = 500\n\n[cache]\nsweep_interval_secs = 10"
        )
        .expect("Should write config");

        let config = Config::builder()
            .config_path(Some(file.path().to_path_buf()))
            .skip_env(true)
            .sweep_interval_secs(Some(20))
            .named_pool("cpu", 2)
            .build()
            .expect("Should build config");

        assert_eq!(config.interpreter.max_duration_ms, 500);
        assert_eq!(config.cache.sweep_interval_secs, 20);
        assert_eq!(config.pools.default_threads, 4);
        assert_eq!(config.pools.named.get("cpu"), Some(&2));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = Config::builder()
            .config_path(Some(PathBuf::from("/definitely/not/here/nf.toml")))
            .skip_env(true)
            .build();
        let message = format!("{:#}", result.expect_err("Should fail"));
        assert!(message.contains("Config file not found"));
    }

    #[test]
    fn test_zero_threads_rejected() {
        let result = Config::builder()
            .skip_env(true)
            .default_threads(Some(0))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_duration_disables_limit() {
        let config = Config::builder()
            .skip_env(true)
            .max_duration_ms(Some(0))
            .build()
            .expect("Should build config");
        assert_eq!(config.max_duration(), None);
    }

    #[test]
    fn test_environment_overlay() {
        std::env::set_var("NF__POOLS__NAMED__ENVTESTPOOL", "3");
        let config = Config::builder().build().expect("Should build config");
        std::env::remove_var("NF__POOLS__NAMED__ENVTESTPOOL");

        assert_eq!(config.pools.named.get("envtestpool"), Some(&3));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = Config::builder()
            .skip_env(true)
            .named_pool("io", 3)
            .build()
            .expect("Should build config");
        let rendered = config.to_toml().expect("Should render");
        assert!(rendered.contains("[pools.named]"));
        let parsed: Config = toml::from_str(&rendered).expect("Should parse rendered config");
        assert_eq!(parsed, config);
    }
}
