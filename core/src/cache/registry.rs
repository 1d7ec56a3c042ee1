//! Named scripts
//!
//! Names are registered once. Text is compiled at registration, so a malformed
//! script fails there and never on first use.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use crate::interpreter::{compile, RegistryError, Script};

#[derive(Debug, Default)]
pub struct ScriptRegistry {
    scripts: DashMap<String, Arc<Script>>,
}

impl ScriptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile `text` and store it under `name`; an existing name is an error
    /// and keeps its script.
    pub fn register(&self, name: &str, text: &str) -> Result<Arc<Script>, RegistryError> {
        match self.scripts.entry(name.to_string()) {
            Entry::Occupied(_) => Err(RegistryError::Duplicate(name.to_string())),
            Entry::Vacant(entry) => {
                let script = compile(text).map_err(|source| RegistryError::Invalid {
                    name: name.to_string(),
                    source,
                })?;
                let script = Arc::new(script);
                entry.insert(Arc::clone(&script));
                debug!(name, statements = script.nodes.len(), "registered script");
                Ok(script)
            }
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.scripts.contains_key(name)
    }

    pub fn get_ast(&self, name: &str) -> Result<Arc<Script>, RegistryError> {
        self.scripts
            .get(name)
            .map(|script| Arc::clone(script.value()))
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    pub fn remove(&self, name: &str) -> Result<Arc<Script>, RegistryError> {
        self.scripts
            .remove(name)
            .map(|(_, script)| script)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    pub fn clear(&self) {
        self.scripts.clear();
    }

    pub fn size(&self) -> usize {
        self.scripts.len()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.scripts.iter().map(|e| e.key().clone()).collect();
        names.sort_unstable();
        names
    }
}
