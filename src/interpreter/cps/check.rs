use std::collections::HashSet;

use crate::interpreter::cps::{Formals, RuntimeError, Value};
use crate::runtime_error;

/// Checks that `expr` is a proper list with between `min` and `max` elements
/// (no upper bound when `max` is `None`) and returns its length.
pub fn check_form(expr: &Value, min: usize, max: Option<usize>) -> Result<usize, RuntimeError> {
    let len = match expr.list_len() {
        Some(len) => len,
        None => runtime_error!(MalformedForm, "badly formed expression: {:?}", expr),
    };
    if len < min {
        runtime_error!(MalformedForm, "too few operands in form: {:?}", expr)
    }
    if let Some(max) = max {
        if len > max {
            runtime_error!(MalformedForm, "too many operands in form: {:?}", expr)
        }
    }
    Ok(len)
}

/// Validates a formal parameter list: distinct symbols, optionally closed by
/// a dotted symbol that collects the remaining arguments.
pub fn check_formals(formals: &Value) -> Result<Formals, RuntimeError> {
    let mut seen = HashSet::new();
    let mut check_and_add = |symbol: &Value| -> Result<String, RuntimeError> {
        let name = match symbol.as_symbol() {
            Some(name) => name.to_string(),
            None => runtime_error!(MalformedFormals, "non-symbol in parameter list: {:?}", symbol),
        };
        if !seen.insert(name.clone()) {
            runtime_error!(MalformedFormals, "duplicate symbol in parameter list: {}", name)
        }
        Ok(name)
    };

    let mut iter = formals.iter();
    let names = iter.by_ref().map(&mut check_and_add).collect::<Result<Vec<String>, RuntimeError>>()?;
    let rest = match iter.tail() {
        Value::Nil => None,
        tail => Some(check_and_add(tail)?),
    };
    Ok(Formals { names, rest })
}
