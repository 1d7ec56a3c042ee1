//! Builtin functions callable from expressions

use std::cmp::Ordering;

use super::eval::{compare, values_equal};
use crate::interpreter::errors::{EvalError, RuntimeErrorKind};
use crate::interpreter::types::Value;

/// Names the evaluator resolves on its own
pub const BUILTINS: &[&str] = &[
    "len", "str", "int", "float", "abs", "min", "max", "contains", "keys", "upper", "lower",
    "typeOf", "isNull",
];

pub(crate) fn call(name: &str, args: Vec<Value>) -> Result<Value, EvalError> {
    match name {
        "len" => {
            let [value] = exact::<1>(name, args)?;
            match &value {
                Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
                Value::List(items) => Ok(Value::Int(items.len() as i64)),
                Value::Map(map) => Ok(Value::Int(map.len() as i64)),
                Value::Null => Ok(Value::Int(0)),
                other => Err(type_error(name, other)),
            }
        }
        "str" => {
            let [value] = exact::<1>(name, args)?;
            Ok(match value {
                s @ Value::Str(_) => s,
                other => Value::str(other.to_string()),
            })
        }
        "int" => {
            let [value] = exact::<1>(name, args)?;
            match value {
                Value::Int(i) => Ok(Value::Int(i)),
                Value::Float(f) if f.is_finite() => Ok(Value::Int(f.trunc() as i64)),
                Value::Bool(b) => Ok(Value::Int(i64::from(b))),
                Value::Str(s) => s.trim().parse::<i64>().map(Value::Int).map_err(|_| {
                    EvalError::new(
                        RuntimeErrorKind::Type,
                        format!("int(): '{}' is not an integer", s),
                    )
                }),
                other => Err(type_error(name, &other)),
            }
        }
        "float" => {
            let [value] = exact::<1>(name, args)?;
            match value {
                Value::Int(i) => Ok(Value::Float(i as f64)),
                Value::Float(f) => Ok(Value::Float(f)),
                Value::Str(s) => s.trim().parse::<f64>().map(Value::Float).map_err(|_| {
                    EvalError::new(
                        RuntimeErrorKind::Type,
                        format!("float(): '{}' is not a number", s),
                    )
                }),
                other => Err(type_error(name, &other)),
            }
        }
        "abs" => {
            let [value] = exact::<1>(name, args)?;
            match value {
                Value::Int(i) => i.checked_abs().map(Value::Int).ok_or_else(|| {
                    EvalError::new(RuntimeErrorKind::Evaluation, "integer overflow")
                }),
                Value::Float(f) => Ok(Value::Float(f.abs())),
                other => Err(type_error(name, &other)),
            }
        }
        "min" => extreme(name, args, Ordering::Less),
        "max" => extreme(name, args, Ordering::Greater),
        "contains" => {
            let [haystack, needle] = exact::<2>(name, args)?;
            match (&haystack, &needle) {
                (Value::Str(s), Value::Str(sub)) => Ok(Value::Bool(s.contains(sub.as_ref()))),
                (Value::List(items), needle) => {
                    Ok(Value::Bool(items.iter().any(|item| values_equal(item, needle))))
                }
                (Value::Map(map), Value::Str(key)) => Ok(Value::Bool(map.contains_key(key.as_ref()))),
                (Value::Null, _) => Ok(Value::Bool(false)),
                (other, _) => Err(type_error(name, other)),
            }
        }
        "keys" => {
            let [value] = exact::<1>(name, args)?;
            match value {
                Value::Map(map) => Ok(Value::List(map.into_keys().map(Value::from).collect())),
                other => Err(type_error(name, &other)),
            }
        }
        "upper" | "lower" => {
            let [value] = exact::<1>(name, args)?;
            match value {
                Value::Str(s) if name == "upper" => Ok(Value::str(s.to_uppercase())),
                Value::Str(s) => Ok(Value::str(s.to_lowercase())),
                other => Err(type_error(name, &other)),
            }
        }
        "typeOf" => {
            let [value] = exact::<1>(name, args)?;
            Ok(Value::str(value.type_name()))
        }
        "isNull" => {
            let [value] = exact::<1>(name, args)?;
            Ok(Value::Bool(value.is_null()))
        }
        _ => Err(EvalError::new(
            RuntimeErrorKind::UndefinedFunction,
            format!(
                "unknown function '{}' (builtins: {})",
                name,
                BUILTINS.join(", ")
            ),
        )),
    }
}

/// `min`/`max` over the arguments, or over a single list argument
fn extreme(name: &str, args: Vec<Value>, keep: Ordering) -> Result<Value, EvalError> {
    let items = match <[Value; 1]>::try_from(args) {
        Ok([Value::List(items)]) => items,
        Ok([single]) => vec![single],
        Err(args) => args,
    };

    let mut best: Option<Value> = None;
    for item in items {
        best = Some(match best {
            None => item,
            Some(current) => {
                let ordering = compare(&item, &current).ok_or_else(|| {
                    EvalError::new(
                        RuntimeErrorKind::Type,
                        format!(
                            "{}(): cannot compare {} with {}",
                            name,
                            item.type_name(),
                            current.type_name()
                        ),
                    )
                })?;
                if ordering == keep {
                    item
                } else {
                    current
                }
            }
        });
    }
    best.ok_or_else(|| {
        EvalError::new(
            RuntimeErrorKind::Arity,
            format!("{}() needs at least one value", name),
        )
    })
}

fn exact<const N: usize>(name: &str, args: Vec<Value>) -> Result<[Value; N], EvalError> {
    let got = args.len();
    <[Value; N]>::try_from(args).map_err(|_| {
        EvalError::new(
            RuntimeErrorKind::Arity,
            format!("{}() takes {} argument(s), got {}", name, N, got),
        )
    })
}

fn type_error(name: &str, value: &Value) -> EvalError {
    EvalError::new(
        RuntimeErrorKind::Type,
        format!("{}() does not accept a {}", name, value.type_name()),
    )
}
