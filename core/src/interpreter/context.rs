//! Execution context and scope chain
//!
//! One [`ExecutionContext`] per run. Scopes live in an arena indexed by
//! [`ScopeId`]; each scope points at its parent, and lookups walk from the
//! current scope to the global root. Hoisted functions are bound per scope and
//! resolve the same way. Scopes are strictly nested, so leaving a scope
//! truncates the arena back to it.
//!
//! Host values enter through [`HostContext`]. Three host keys become read-only
//! system bindings (`$threadFactoryName`, `$preValue`, `$params`); all other
//! entries are pre-seeded globals.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use uuid::Uuid;

use super::errors::NfError;
use super::logger::ScriptLogger;
use super::types::{Node, Value};

/* ===================== System Bindings ===================== */

pub const THREAD_FACTORY_NAME: &str = "$threadFactoryName";
pub const PRE_VALUE: &str = "$preValue";
pub const PARAMS: &str = "$params";
/// Written only by `export`, read once when the run ends
pub const EXPORT_SLOT: &str = "$export";

/// Host keys that map onto system bindings
const HOST_SYSTEM_KEYS: &[(&str, &str)] = &[
    ("threadFactoryName", THREAD_FACTORY_NAME),
    ("preValue", PRE_VALUE),
    ("params", PARAMS),
];

/// Variable table handed to the expression evaluator
pub type VarTable<'v> = HashMap<&'v str, &'v Value>;

/* ===================== Scopes ===================== */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(u32);

impl ScopeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Block,
    Function,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableInfo {
    pub name: String,
    pub value: Value,
    pub declared_type: Option<String>,
}

#[derive(Debug)]
struct Scope<'a> {
    parent: Option<ScopeId>,
    kind: ScopeKind,
    bindings: HashMap<String, VariableInfo>,
    functions: HashMap<String, &'a Node>,
}

impl<'a> Scope<'a> {
    fn new(parent: Option<ScopeId>, kind: ScopeKind) -> Self {
        Self {
            parent,
            kind,
            bindings: HashMap::new(),
            functions: HashMap::new(),
        }
    }
}

/* ===================== Host Context ===================== */

/// Values a host passes into a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostContext {
    entries: BTreeMap<String, Value>,
}

impl HostContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<HashMap<String, Value>> for HostContext {
    fn from(entries: HashMap<String, Value>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }
}

/* ===================== Execution Context ===================== */

/// Per-run state. `'a` is the lifetime of the compiled script the run walks.
pub struct ExecutionContext<'a> {
    run_id: String,
    scopes: Vec<Scope<'a>>,
    current: ScopeId,
    /// alias -> imported path
    import_aliases: HashMap<String, String>,
    logger: Option<Arc<dyn ScriptLogger>>,
    started_at: Instant,
    max_duration: Option<Duration>,
    /// Loops entered in the current function frame
    loop_depth: usize,
    call_depth: usize,
}

impl<'a> ExecutionContext<'a> {
    /// Fresh context with the host values seeded into the global scope
    pub fn new(host: &HostContext) -> Self {
        let mut global = Scope::new(None, ScopeKind::Global);

        for (key, value) in host.iter() {
            let name = HOST_SYSTEM_KEYS
                .iter()
                .find(|(host_key, _)| host_key == key)
                .map(|(_, system)| (*system).to_string())
                .unwrap_or_else(|| key.clone());
            global.bindings.insert(
                name.clone(),
                VariableInfo {
                    name,
                    value: value.share_or_copy(),
                    declared_type: None,
                },
            );
        }

        Self {
            run_id: Uuid::new_v4().to_string(),
            scopes: vec![global],
            current: ScopeId(0),
            import_aliases: HashMap::new(),
            logger: None,
            started_at: Instant::now(),
            max_duration: None,
            loop_depth: 0,
            call_depth: 0,
        }
    }

    pub fn with_logger(mut self, logger: Option<Arc<dyn ScriptLogger>>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_max_duration(mut self, max_duration: Option<Duration>) -> Self {
        self.max_duration = max_duration;
        self
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn logger(&self) -> Option<&Arc<dyn ScriptLogger>> {
        self.logger.as_ref()
    }

    /// Name of the thread pool fan-out should use, if the host set one
    pub fn thread_factory_name(&self) -> Option<&str> {
        self.lookup(THREAD_FACTORY_NAME).and_then(Value::as_str)
    }

    /* ----- scopes ----- */

    pub fn current_scope(&self) -> ScopeId {
        self.current
    }

    pub fn global_scope(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn scope_kind(&self, id: ScopeId) -> Option<ScopeKind> {
        self.scopes.get(id.index()).map(|s| s.kind)
    }

    pub fn scope_parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.scopes.get(id.index()).and_then(|s| s.parent)
    }

    /// Number of live scopes, global included
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Create a child of the current scope and make it current
    pub fn push_scope(&mut self, kind: ScopeKind) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope::new(Some(self.current), kind));
        self.current = id;
        id
    }

    /// Leave `id` (and anything pushed after it), restoring its parent
    pub fn pop_scope(&mut self, id: ScopeId) {
        if id == self.global_scope() || id.index() >= self.scopes.len() {
            return;
        }
        self.current = self.scopes[id.index()].parent.unwrap_or(ScopeId(0));
        self.scopes.truncate(id.index());
    }

    /* ----- bindings ----- */

    /// Bind `name` in the current scope, replacing an existing binding there
    pub fn declare(&mut self, name: &str, value: Value, declared_type: Option<String>) {
        let scope = &mut self.scopes[self.current.index()];
        scope.bindings.insert(
            name.to_string(),
            VariableInfo {
                name: name.to_string(),
                value,
                declared_type,
            },
        );
    }

    /// Update the nearest binding of `name`; declare it in the current scope
    /// when no scope binds it
    pub fn assign(&mut self, name: &str, value: Value) {
        match self.find(name) {
            Some(id) => {
                if let Some(info) = self.scopes[id.index()].bindings.get_mut(name) {
                    info.value = value;
                }
            }
            None => self.declare(name, value, None),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.lookup_info(name).map(|info| &info.value)
    }

    pub fn lookup_info(&self, name: &str) -> Option<&VariableInfo> {
        let id = self.find(name)?;
        self.scopes[id.index()].bindings.get(name)
    }

    fn find(&self, name: &str) -> Option<ScopeId> {
        self.chain().find(|id| self.scopes[id.index()].bindings.contains_key(name))
    }

    /// Scope ids from the current scope up to the root
    fn chain(&self) -> impl Iterator<Item = ScopeId> + '_ {
        std::iter::successors(Some(self.current), move |id| self.scopes[id.index()].parent)
    }

    /// Every visible binding, inner scopes shadowing outer ones
    pub fn flatten(&self) -> VarTable<'_> {
        let chain: Vec<ScopeId> = self.chain().collect();
        let mut table = VarTable::new();
        for id in chain.into_iter().rev() {
            for (name, info) in &self.scopes[id.index()].bindings {
                table.insert(name.as_str(), &info.value);
            }
        }
        table
    }

    /* ----- export ----- */

    pub fn set_export(&mut self, value: Value) {
        let global = &mut self.scopes[0];
        global.bindings.insert(
            EXPORT_SLOT.to_string(),
            VariableInfo {
                name: EXPORT_SLOT.to_string(),
                value,
                declared_type: None,
            },
        );
    }

    pub fn take_export(&mut self) -> Option<Value> {
        self.scopes[0].bindings.remove(EXPORT_SLOT).map(|info| info.value)
    }

    /* ----- imports and functions ----- */

    pub fn register_import(&mut self, alias: &str, path: &str) {
        self.import_aliases.insert(alias.to_string(), path.to_string());
    }

    /// Resolve an import alias; unknown names resolve to themselves
    pub fn resolve_alias<'n>(&'n self, name: &'n str) -> &'n str {
        self.import_aliases.get(name).map(String::as_str).unwrap_or(name)
    }

    /// Bind a function definition in the current scope
    pub fn define_function(&mut self, name: &str, node: &'a Node) {
        self.scopes[self.current.index()]
            .functions
            .insert(name.to_string(), node);
    }

    /// Nearest definition of `name`, walking current to root
    pub fn function(&self, name: &str) -> Option<&'a Node> {
        self.chain()
            .find_map(|id| self.scopes[id.index()].functions.get(name).copied())
    }

    /* ----- frames ----- */

    pub fn loop_depth(&self) -> usize {
        self.loop_depth
    }

    pub fn enter_loop(&mut self) {
        self.loop_depth += 1;
    }

    pub fn exit_loop(&mut self) {
        self.loop_depth = self.loop_depth.saturating_sub(1);
    }

    pub fn call_depth(&self) -> usize {
        self.call_depth
    }

    /// Start a function frame; returns the caller's loop depth for [`Self::exit_function`]
    pub fn enter_function(&mut self) -> usize {
        self.call_depth += 1;
        std::mem::replace(&mut self.loop_depth, 0)
    }

    pub fn exit_function(&mut self, saved_loop_depth: usize) {
        self.call_depth = self.call_depth.saturating_sub(1);
        self.loop_depth = saved_loop_depth;
    }

    /* ----- time budget ----- */

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Fail with [`NfError::Timeout`] once the run is over its budget
    pub fn check_deadline(&self, line: usize) -> Result<(), NfError> {
        let Some(limit) = self.max_duration else {
            return Ok(());
        };
        let elapsed = self.elapsed();
        if elapsed > limit {
            return Err(NfError::Timeout {
                line,
                elapsed_ms: elapsed.as_millis(),
                limit_ms: limit.as_millis(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::types::NodeKind;

    #[test]
    fn test_host_values_seed_globals_and_system_bindings() {
        let host = HostContext::new()
            .with("preValue", 7)
            .with("threadFactoryName", "io")
            .with("user", "ada");
        let ctx = ExecutionContext::new(&host);

        assert_eq!(ctx.lookup(PRE_VALUE), Some(&Value::Int(7)));
        assert_eq!(ctx.lookup("preValue"), None);
        assert_eq!(ctx.lookup("user"), Some(&Value::str("ada")));
        assert_eq!(ctx.thread_factory_name(), Some("io"));
    }

    #[test]
    fn test_host_strings_are_shared() {
        let shared = Value::str("big payload");
        let host = HostContext::new().with("payload", shared.clone());
        let ctx = ExecutionContext::new(&host);
        match (ctx.lookup("payload"), &shared) {
            (Some(Value::Str(a)), Value::Str(b)) => assert!(Arc::ptr_eq(a, b)),
            other => panic!("expected shared strings, got {:?}", other),
        }
    }

    #[test]
    fn test_shadowing_and_flatten() {
        let mut ctx = ExecutionContext::new(&HostContext::new());
        ctx.declare("x", Value::Int(1), None);
        ctx.declare("y", Value::Int(2), None);

        let inner = ctx.push_scope(ScopeKind::Block);
        ctx.declare("x", Value::Int(10), None);
        assert_eq!(ctx.lookup("x"), Some(&Value::Int(10)));

        let table = ctx.flatten();
        assert_eq!(table.get("x"), Some(&&Value::Int(10)));
        assert_eq!(table.get("y"), Some(&&Value::Int(2)));

        ctx.pop_scope(inner);
        assert_eq!(ctx.lookup("x"), Some(&Value::Int(1)));
        assert_eq!(ctx.current_scope(), ctx.global_scope());
    }

    #[test]
    fn test_assign_updates_nearest_binding() {
        let mut ctx = ExecutionContext::new(&HostContext::new());
        ctx.declare("total", Value::Int(0), None);

        let block = ctx.push_scope(ScopeKind::Block);
        ctx.assign("total", Value::Int(5));
        ctx.assign("fresh", Value::Bool(true));
        ctx.pop_scope(block);

        assert_eq!(ctx.lookup("total"), Some(&Value::Int(5)));
        assert_eq!(ctx.lookup("fresh"), None);
    }

    #[test]
    fn test_scope_arena_is_reclaimed() {
        let mut ctx = ExecutionContext::new(&HostContext::new());
        for _ in 0..100 {
            let id = ctx.push_scope(ScopeKind::Block);
            assert_eq!(ctx.scope_parent(id), Some(ctx.global_scope()));
            ctx.pop_scope(id);
        }
        assert_eq!(ctx.depth(), 1);
    }

    #[test]
    fn test_pop_scope_ignores_global() {
        let mut ctx = ExecutionContext::new(&HostContext::new());
        let global = ctx.global_scope();
        ctx.pop_scope(global);
        assert_eq!(ctx.depth(), 1);
        assert_eq!(ctx.scope_kind(global), Some(ScopeKind::Global));
    }

    #[test]
    fn test_export_slot_read_once() {
        let mut ctx = ExecutionContext::new(&HostContext::new());
        assert_eq!(ctx.take_export(), None);

        let block = ctx.push_scope(ScopeKind::Block);
        ctx.set_export(Value::Int(1));
        ctx.set_export(Value::Int(2));
        ctx.pop_scope(block);

        assert_eq!(ctx.take_export(), Some(Value::Int(2)));
        assert_eq!(ctx.take_export(), None);
    }

    #[test]
    fn test_function_frame_resets_loop_depth() {
        let mut ctx = ExecutionContext::new(&HostContext::new());
        ctx.enter_loop();
        ctx.enter_loop();
        let saved = ctx.enter_function();
        assert_eq!(ctx.loop_depth(), 0);
        assert_eq!(ctx.call_depth(), 1);
        ctx.exit_function(saved);
        assert_eq!(ctx.loop_depth(), 2);
        assert_eq!(ctx.call_depth(), 0);
    }

    #[test]
    fn test_import_aliases() {
        let mut ctx = ExecutionContext::new(&HostContext::new());
        ctx.register_import("fetch", "com.acme.Fetcher");
        assert_eq!(ctx.resolve_alias("fetch"), "com.acme.Fetcher");
        assert_eq!(ctx.resolve_alias("other"), "other");
    }

    #[test]
    fn test_deadline() {
        let ctx = ExecutionContext::new(&HostContext::new()).with_max_duration(Some(Duration::ZERO));
        std::thread::sleep(Duration::from_millis(2));
        match ctx.check_deadline(3) {
            Err(NfError::Timeout { line, limit_ms, .. }) => {
                assert_eq!(line, 3);
                assert_eq!(limit_ms, 0);
            }
            other => panic!("expected timeout, got {:?}", other),
        }

        let unlimited = ExecutionContext::new(&HostContext::new());
        assert!(unlimited.check_deadline(1).is_ok());
    }

    #[test]
    fn test_functions_resolve_through_scope_chain() {
        let outer = Node::block(
            NodeKind::FunctionDef { name: "f".to_string(), params: vec![] },
            1,
            vec![],
        );
        let inner = Node::block(
            NodeKind::FunctionDef { name: "f".to_string(), params: vec![] },
            3,
            vec![],
        );

        let mut ctx = ExecutionContext::new(&HostContext::new());
        ctx.define_function("f", &outer);

        let block = ctx.push_scope(ScopeKind::Block);
        ctx.define_function("f", &inner);
        assert_eq!(ctx.function("f").map(|n| n.line), Some(3));
        ctx.pop_scope(block);

        assert_eq!(ctx.function("f").map(|n| n.line), Some(1));
        assert!(ctx.function("g").is_none());
    }
}
