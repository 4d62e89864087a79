//! Evaluación de placeholders `((ref))` dentro de valores JSON.
//!
//! Un string que es exactamente un placeholder se reemplaza por el valor
//! completo (conserva su tipo JSON). Placeholders embebidos en un string más
//! largo se reemplazan por su forma textual.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use super::reference::VarRef;
use super::scope::VariableScope;
use crate::errors::{TemplateError, VarError};

static VAR_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(\(([^()\s]+)\)\)").expect("var pattern is valid"));

/// Qué referencias resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolve {
    /// Todas; una referencia inexistente es un error.
    All,
    /// Sólo `((.:name))`; las demás quedan intactas para resolverse al
    /// ejecutar el step.
    LocalOnly,
}

pub fn evaluate(value: &Value, vars: &VariableScope, resolve: Resolve) -> Result<Value, TemplateError> {
    Ok(match value {
        Value::String(s) => evaluate_str(s, vars, resolve)?,
        Value::Array(items) => {
            Value::Array(items.iter().map(|v| evaluate(v, vars, resolve)).collect::<Result<Vec<_>, _>>()?)
        }
        Value::Object(map) => Value::Object(evaluate_map(map, vars, resolve)?),
        other => other.clone(),
    })
}

pub fn evaluate_map(map: &Map<String, Value>, vars: &VariableScope, resolve: Resolve)
                    -> Result<Map<String, Value>, TemplateError> {
    let mut out = Map::with_capacity(map.len());
    for (k, v) in map {
        out.insert(k.clone(), evaluate(v, vars, resolve)?);
    }
    Ok(out)
}

fn evaluate_str(s: &str, vars: &VariableScope, resolve: Resolve) -> Result<Value, TemplateError> {
    if let Some(caps) = VAR_PATTERN.captures(s) {
        let whole = caps.get(0).map(|m| m.range());
        if whole == Some(0..s.len()) {
            return Ok(match lookup(&caps[1], vars, resolve)? {
                Some(v) => v,
                None => Value::String(s.to_string()),
            });
        }
    } else {
        return Ok(Value::String(s.to_string()));
    }

    let mut out = String::with_capacity(s.len());
    let mut last = 0;
    for caps in VAR_PATTERN.captures_iter(s) {
        let Some(m) = caps.get(0) else { continue };
        out.push_str(&s[last..m.start()]);
        match lookup(&caps[1], vars, resolve)? {
            Some(Value::String(text)) => out.push_str(&text),
            Some(other) => out.push_str(&other.to_string()),
            None => out.push_str(m.as_str()),
        }
        last = m.end();
    }
    out.push_str(&s[last..]);
    Ok(Value::String(out))
}

/// `Ok(None)` cuando la referencia se deja sin resolver a propósito.
fn lookup(raw: &str, vars: &VariableScope, resolve: Resolve) -> Result<Option<Value>, TemplateError> {
    let var = VarRef::parse(raw)?;
    if resolve == Resolve::LocalOnly && !var.is_local() {
        return Ok(None);
    }
    match vars.get(&var)? {
        Some(v) => Ok(Some(v)),
        None => Err(VarError::Undefined(var.to_string()).into()),
    }
}
