//! Control flow outcome of executing a statement

use super::values::Value;

/* ===================== Control Flow ===================== */

/// Result of executing one statement or statement list.
///
/// Anything other than `Normal` unwinds the enclosing statement lists until a
/// handler takes it: `Return` stops at the function-call boundary, `Break` and
/// `Continue` at the nearest loop, `BreakAll` at the outermost loop of the
/// current function frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    Return(Value),
    Break,
    BreakAll,
    Continue,
}

impl Flow {
    pub fn is_normal(&self) -> bool {
        matches!(self, Flow::Normal)
    }
}
