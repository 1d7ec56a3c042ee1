//! Tree evaluation of [`ExprNode`] against a variable table

use std::cmp::Ordering;

use super::builtins;
use super::parse::{BinaryOp, ExprNode, UnaryOp};
use crate::interpreter::context::VarTable;
use crate::interpreter::errors::{EvalError, RuntimeErrorKind};
use crate::interpreter::types::Value;

pub(crate) fn eval(node: &ExprNode, vars: &VarTable<'_>) -> Result<Value, EvalError> {
    match node {
        ExprNode::Literal(value) => Ok(value.clone()),
        ExprNode::Var(name) => vars.get(name.as_str()).map(|v| (*v).clone()).ok_or_else(|| {
            EvalError::new(
                RuntimeErrorKind::UndefinedVariable,
                format!("undefined variable '{}'", name),
            )
        }),
        ExprNode::List(items) => items
            .iter()
            .map(|item| eval(item, vars))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        ExprNode::Unary { op, operand } => {
            let value = eval(operand, vars)?;
            unary(*op, value)
        }
        ExprNode::Binary {
            op: BinaryOp::And,
            left,
            right,
        } => {
            if !eval(left, vars)?.is_truthy() {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(eval(right, vars)?.is_truthy()))
        }
        ExprNode::Binary {
            op: BinaryOp::Or,
            left,
            right,
        } => {
            if eval(left, vars)?.is_truthy() {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(eval(right, vars)?.is_truthy()))
        }
        ExprNode::Binary { op, left, right } => {
            let left = eval(left, vars)?;
            let right = eval(right, vars)?;
            binary(*op, left, right)
        }
        ExprNode::Ternary {
            condition,
            then,
            otherwise,
        } => {
            if eval(condition, vars)?.is_truthy() {
                eval(then, vars)
            } else {
                eval(otherwise, vars)
            }
        }
        ExprNode::Member { target, field } => {
            let target = eval(target, vars)?;
            member(target, field)
        }
        ExprNode::Index { target, index } => {
            let target = eval(target, vars)?;
            let index = eval(index, vars)?;
            index_into(target, index)
        }
        ExprNode::Call { name, args } => {
            let args = args
                .iter()
                .map(|arg| eval(arg, vars))
                .collect::<Result<Vec<_>, _>>()?;
            builtins::call(name, args)
        }
    }
}

/* ===================== Operators ===================== */

fn unary(op: UnaryOp, value: Value) -> Result<Value, EvalError> {
    match (op, value) {
        (UnaryOp::Not, value) => Ok(Value::Bool(!value.is_truthy())),
        (UnaryOp::Neg, Value::Int(i)) => i.checked_neg().map(Value::Int).ok_or_else(overflow),
        (UnaryOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnaryOp::Neg, other) => Err(type_error(format!(
            "cannot negate a {}",
            other.type_name()
        ))),
    }
}

pub(crate) fn binary(op: BinaryOp, left: Value, right: Value) -> Result<Value, EvalError> {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(values_equal(&left, &right))),
        BinaryOp::Ne => Ok(Value::Bool(!values_equal(&left, &right))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = compare(&left, &right).ok_or_else(|| {
                type_error(format!(
                    "cannot compare {} {} {}",
                    left.type_name(),
                    op.symbol(),
                    right.type_name()
                ))
            })?;
            let result = match op {
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::Le => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            };
            Ok(Value::Bool(result))
        }
        BinaryOp::Add => add(left, right),
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => arithmetic(op, left, right),
        BinaryOp::And => Ok(Value::Bool(left.is_truthy() && right.is_truthy())),
        BinaryOp::Or => Ok(Value::Bool(left.is_truthy() || right.is_truthy())),
    }
}

fn add(left: Value, right: Value) -> Result<Value, EvalError> {
    match (left, right) {
        (Value::Str(a), b) => Ok(Value::str(format!("{}{}", a, b))),
        (a, Value::Str(b)) => Ok(Value::str(format!("{}{}", a, b))),
        (Value::List(mut a), Value::List(b)) => {
            a.extend(b);
            Ok(Value::List(a))
        }
        (left, right) => arithmetic(BinaryOp::Add, left, right),
    }
}

fn arithmetic(op: BinaryOp, left: Value, right: Value) -> Result<Value, EvalError> {
    match (&left, &right) {
        (Value::Int(a), Value::Int(b)) => {
            let (a, b) = (*a, *b);
            if matches!(op, BinaryOp::Div | BinaryOp::Rem) && b == 0 {
                return Err(division_by_zero());
            }
            let result = match op {
                BinaryOp::Add => a.checked_add(b),
                BinaryOp::Sub => a.checked_sub(b),
                BinaryOp::Mul => a.checked_mul(b),
                BinaryOp::Div => a.checked_div(b),
                _ => a.checked_rem(b),
            };
            result.map(Value::Int).ok_or_else(overflow)
        }
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => {
                if matches!(op, BinaryOp::Div | BinaryOp::Rem) && b == 0.0 {
                    return Err(division_by_zero());
                }
                let result = match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div => a / b,
                    _ => a % b,
                };
                Ok(Value::Float(result))
            }
            _ => Err(type_error(format!(
                "unsupported operands {} {} {}",
                left.type_name(),
                op.symbol(),
                right.type_name()
            ))),
        },
    }
}

/// Equality with `Int`/`Float` compared numerically
pub(crate) fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => (*a as f64) == *b,
        _ => left == right,
    }
}

pub(crate) fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        },
    }
}

/* ===================== Access ===================== */

/// Null-safe member access: missing keys and null targets yield `null`
fn member(target: Value, field: &str) -> Result<Value, EvalError> {
    match target {
        Value::Null => Ok(Value::Null),
        Value::Map(mut map) => Ok(map.remove(field).unwrap_or(Value::Null)),
        Value::List(items) if field == "length" || field == "size" => Ok(Value::Int(items.len() as i64)),
        Value::Str(s) if field == "length" => Ok(Value::Int(s.chars().count() as i64)),
        other => Err(type_error(format!(
            "cannot read field '{}' of a {}",
            field,
            other.type_name()
        ))),
    }
}

fn index_into(target: Value, index: Value) -> Result<Value, EvalError> {
    match (target, index) {
        (Value::Null, _) => Ok(Value::Null),
        (Value::List(mut items), Value::Int(i)) => {
            let len = items.len();
            match usize::try_from(i) {
                Ok(i) if i < len => Ok(items.swap_remove(i)),
                _ => Ok(Value::Null),
            }
        }
        (Value::Map(mut map), Value::Str(key)) => Ok(map.remove(key.as_ref()).unwrap_or(Value::Null)),
        (Value::Str(s), Value::Int(i)) => Ok(usize::try_from(i)
            .ok()
            .and_then(|i| s.chars().nth(i))
            .map(|c| Value::str(c.to_string()))
            .unwrap_or(Value::Null)),
        (target, index) => Err(type_error(format!(
            "cannot index a {} with a {}",
            target.type_name(),
            index.type_name()
        ))),
    }
}

/* ===================== Errors ===================== */

fn type_error(message: String) -> EvalError {
    EvalError::new(RuntimeErrorKind::Type, message)
}

fn overflow() -> EvalError {
    EvalError::new(RuntimeErrorKind::Evaluation, "integer overflow")
}

fn division_by_zero() -> EvalError {
    EvalError::new(RuntimeErrorKind::DivisionByZero, "division by zero")
}
