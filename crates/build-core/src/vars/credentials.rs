use std::collections::HashMap;
use std::sync::Mutex;

use indexmap::IndexSet;
use serde_json::Value;

use crate::errors::VarError;

/// Fuente externa de credenciales (Vault, SSM, ...).
pub trait CredentialManager: Send + Sync {
    /// Valor de la credencial en `path`, o `None` si no existe.
    fn get(&self, source: Option<&str>, path: &str) -> Result<Option<Value>, VarError>;
}

/// Credenciales fijas indexadas por path. Ignora el nombre de la fuente.
#[derive(Debug, Default)]
pub struct InMemoryCredentials {
    values: HashMap<String, Value>,
}

impl InMemoryCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: impl Into<String>, value: Value) -> Self {
        self.values.insert(path.into(), value);
        self
    }
}

impl CredentialManager for InMemoryCredentials {
    fn get(&self, _source: Option<&str>, path: &str) -> Result<Option<Value>, VarError> {
        Ok(self.values.get(path).cloned())
    }
}

/// Valores de credenciales leídos durante el build.
#[derive(Debug, Default)]
pub struct CredentialTracker {
    values: Mutex<IndexSet<String>>,
}

impl CredentialTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra todas las hojas string/número de `value`.
    pub fn track(&self, value: &Value) {
        let mut leaves = vec![];
        collect_leaves(value, &mut leaves);
        let mut values = self.values.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        for leaf in leaves {
            values.insert(leaf);
        }
    }

    pub fn values(&self) -> Vec<String> {
        self.values.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).iter().cloned().collect()
    }
}

fn collect_leaves(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Number(n) => out.push(n.to_string()),
        Value::Array(items) => items.iter().for_each(|v| collect_leaves(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_leaves(v, out)),
        Value::Null | Value::Bool(_) => {}
    }
}
