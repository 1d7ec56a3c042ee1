//! Semantic Validation for NF scripts
//!
//! An extensible rule-based pass that runs once on every freshly parsed AST,
//! before it is cached or executed. It catches what the statement rules cannot
//! see locally: loop control outside loops, `return` outside functions,
//! duplicate function names, and malformed node shapes (the AST is
//! deserializable, so it may not have come from the parser at all).
//!
//! # Architecture
//!
//! 1. **ValidationRule trait** - Each rule implements this trait
//! 2. **Validator** - Collects and runs all rules
//! 3. **ValidationError** - One finding, convertible into a [`SyntaxError`]
//!
//! # Adding a New Rule
//!
//! 1. Create a new file in `semantic_validator/rules/`
//! 2. Implement `ValidationRule` for your struct
//! 3. Add it to the `Validator::new()` constructor

pub mod rules;

use crate::interpreter::errors::{SyntaxCategory, SyntaxError};
use crate::interpreter::types::Node;

// ============================================================================
// Validation Error Types
// ============================================================================

/// A validation finding produced by semantic analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// 1-based line of the offending node
    pub line: usize,
    /// Human-readable message
    pub message: String,
    /// Which rule produced this error
    pub rule_id: &'static str,
    pub category: SyntaxCategory,
    pub suggestion: String,
}

impl ValidationError {
    pub fn new(
        line: usize,
        category: SyntaxCategory,
        message: impl Into<String>,
        suggestion: impl Into<String>,
        rule_id: &'static str,
    ) -> Self {
        Self {
            line,
            message: message.into(),
            rule_id,
            category,
            suggestion: suggestion.into(),
        }
    }

    /// Convert into the compile error surfaced to hosts.
    ///
    /// Validation works on nodes, not tokens, so the context names the rule.
    pub fn into_syntax_error(self) -> SyntaxError {
        SyntaxError::new(
            self.line,
            self.category,
            self.message,
            format!("[{}]", self.rule_id),
            self.suggestion,
        )
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "error at line {}: {} [{}]",
            self.line, self.message, self.rule_id
        )
    }
}

impl std::error::Error for ValidationError {}

// ============================================================================
// ValidationRule Trait
// ============================================================================

/// Trait that all validation rules must implement.
///
/// Rules are independent of each other and must not assume another rule ran.
pub trait ValidationRule: Send + Sync {
    /// Unique identifier for this rule (e.g., "loop-control")
    fn id(&self) -> &'static str;

    /// Human-readable description of what this rule checks
    fn description(&self) -> &'static str;

    /// Run the validation over the top-level statement list.
    ///
    /// Returns every finding in source order; empty means no issues.
    fn validate(&self, nodes: &[Node]) -> Vec<ValidationError>;
}

// ============================================================================
// Validator - Runs All Rules
// ============================================================================

/// Runs every registered rule in order
pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    /// Create a new validator with all built-in rules.
    ///
    /// Structure comes first: the other rules walk `children` and would report
    /// noise on a malformed tree.
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(rules::BlockStructureRule),
                Box::new(rules::LoopControlRule),
                Box::new(rules::ReturnOutsideFunctionRule),
                Box::new(rules::DuplicateFunctionRule),
            ],
        }
    }

    /// Run all validation rules and collect errors.
    pub fn validate(&self, nodes: &[Node]) -> Vec<ValidationError> {
        self.rules
            .iter()
            .flat_map(|rule| rule.validate(nodes))
            .collect()
    }

    /// Get a list of all registered rules (id, description)
    pub fn rules(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.rules.iter().map(|r| (r.id(), r.description()))
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Validate a parsed script and return all findings.
pub fn validate_nodes(nodes: &[Node]) -> Vec<ValidationError> {
    Validator::new().validate(nodes)
}

/// Validate a parsed script; the first finding aborts compilation.
pub fn validate_script(nodes: &[Node]) -> Result<(), SyntaxError> {
    match validate_nodes(nodes).into_iter().next() {
        Some(error) => Err(error.into_syntax_error()),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests;
