//! Tasks callable from scripts
//!
//! `run name(args)`, `task t { key: name(args) }` and bare `name(args)` calls
//! resolve here after user functions. Hosts register their own tasks on a
//! [`TaskRegistry`]; [`register_defaults`] adds the small standard set:
//!
//! | name | args | result |
//! |---|---|---|
//! | `sleep` | `ms` | `null` after sleeping |
//! | `now` | | current UTC date |
//! | `parseJson` | `text` | parsed value |
//! | `toJson` | `value` | JSON string |
//! | `env` | `name` | environment variable or `null` |
//! | `fail` | `message` | always an error |
//! | `identity` | `value` | the value |

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};

use super::types::Value;

/// A named operation a script can call
pub trait Task: Send + Sync {
    fn call(&self, args: &[Value]) -> Result<Value>;
}

impl<F> Task for F
where
    F: Fn(&[Value]) -> Result<Value> + Send + Sync,
{
    fn call(&self, args: &[Value]) -> Result<Value> {
        self(args)
    }
}

/// Name → task lookup shared by every run of an engine
#[derive(Clone, Default)]
pub struct TaskRegistry {
    tasks: HashMap<String, Arc<dyn Task>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the standard tasks
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        register_defaults(&mut registry);
        registry
    }

    /// Register `task` under `name`, replacing any previous task of that name
    pub fn register(&mut self, name: impl Into<String>, task: impl Task + 'static) {
        self.tasks.insert(name.into(), Arc::new(task));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Task>> {
        self.tasks.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tasks.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl std::fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRegistry")
            .field("tasks", &self.names())
            .finish()
    }
}

/* ===================== Standard Tasks ===================== */

pub fn register_defaults(registry: &mut TaskRegistry) {
    registry.register("sleep", sleep);
    registry.register("now", now);
    registry.register("parseJson", parse_json);
    registry.register("toJson", to_json);
    registry.register("env", env);
    registry.register("fail", fail);
    registry.register("identity", identity);
}

fn sleep(args: &[Value]) -> Result<Value> {
    let ms = arg(args, 0, "sleep")?
        .as_i64()
        .filter(|ms| *ms >= 0)
        .ok_or_else(|| anyhow!("sleep() expects a non-negative number of milliseconds"))?;
    std::thread::sleep(Duration::from_millis(ms as u64));
    Ok(Value::Null)
}

fn now(_args: &[Value]) -> Result<Value> {
    Ok(Value::Date(chrono::Utc::now()))
}

fn parse_json(args: &[Value]) -> Result<Value> {
    let text = arg(args, 0, "parseJson")?
        .as_str()
        .ok_or_else(|| anyhow!("parseJson() expects a string"))?;
    let json: serde_json::Value =
        serde_json::from_str(text).context("parseJson() received invalid JSON")?;
    Ok(Value::from(json))
}

fn to_json(args: &[Value]) -> Result<Value> {
    let value = arg(args, 0, "toJson")?;
    let text = serde_json::to_string(&value.to_json())?;
    Ok(Value::from(text))
}

fn env(args: &[Value]) -> Result<Value> {
    let name = arg(args, 0, "env")?
        .as_str()
        .ok_or_else(|| anyhow!("env() expects a variable name"))?;
    Ok(std::env::var(name).map(Value::from).unwrap_or(Value::Null))
}

fn fail(args: &[Value]) -> Result<Value> {
    match args.first() {
        Some(message) => bail!("{}", message),
        None => bail!("fail() called"),
    }
}

fn identity(args: &[Value]) -> Result<Value> {
    Ok(arg(args, 0, "identity")?.clone())
}

fn arg<'v>(args: &'v [Value], index: usize, task: &str) -> Result<&'v Value> {
    args.get(index)
        .ok_or_else(|| anyhow!("{}() expects at least {} argument(s)", task, index + 1))
}
