use std::sync::{Arc, RwLock};

use indexmap::IndexMap;
use serde_json::Value;

use super::credentials::{CredentialManager, CredentialTracker};
use super::reference::VarRef;
use crate::errors::VarError;

/// Pila de bindings de variables.
///
/// Las referencias locales (`((.:name))`) se resuelven del scope más interno
/// hacia afuera. El resto va al credential manager, y cada valor leído queda
/// registrado en el `CredentialTracker` compartido por todos los scopes del
/// build.
pub struct VariableScope {
    parent: Option<Arc<VariableScope>>,
    local: RwLock<IndexMap<String, Value>>,
    credentials: Option<Arc<dyn CredentialManager>>,
    tracker: Arc<CredentialTracker>,
}

impl VariableScope {
    pub fn new(credentials: Option<Arc<dyn CredentialManager>>) -> Self {
        Self { parent: None,
               local: RwLock::new(IndexMap::new()),
               credentials,
               tracker: Arc::new(CredentialTracker::new()) }
    }

    pub fn new_local_scope(self: &Arc<Self>) -> Arc<VariableScope> {
        Arc::new(VariableScope { parent: Some(Arc::clone(self)),
                                 local: RwLock::new(IndexMap::new()),
                                 credentials: self.credentials.clone(),
                                 tracker: Arc::clone(&self.tracker) })
    }

    /// Liga `name` en este scope. Sombrea bindings de los padres.
    pub fn bind(&self, name: impl Into<String>, value: Value) {
        let mut local = self.local.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        local.insert(name.into(), value);
    }

    /// Igual que `bind`, pero el valor se trata como secreto y se redacta.
    pub fn bind_secret(&self, name: impl Into<String>, value: Value) {
        self.tracker.track(&value);
        self.bind(name, value);
    }

    pub fn tracker(&self) -> &Arc<CredentialTracker> {
        &self.tracker
    }

    /// Resuelve una referencia. `Ok(None)` si la variable no existe.
    pub fn get(&self, var: &VarRef) -> Result<Option<Value>, VarError> {
        let root = if var.is_local() {
            self.local_value(&var.path)
        } else {
            match &self.credentials {
                Some(creds) => {
                    let found = creds.get(var.source.as_deref(), &var.path)?;
                    if let Some(value) = &found {
                        self.tracker.track(value);
                    }
                    found
                }
                None => None,
            }
        };
        match root {
            Some(value) => select_fields(var, value).map(Some),
            None => Ok(None),
        }
    }

    fn local_value(&self, name: &str) -> Option<Value> {
        let found = self.local.read().unwrap_or_else(|poisoned| poisoned.into_inner()).get(name).cloned();
        found.or_else(|| self.parent.as_ref().and_then(|p| p.local_value(name)))
    }
}

fn select_fields(var: &VarRef, mut value: Value) -> Result<Value, VarError> {
    for field in &var.fields {
        value = match value {
            Value::Object(mut map) => map.remove(field),
            _ => None,
        }.ok_or_else(|| VarError::MissingField { reference: var.to_string(),
                                                 field: field.clone() })?;
    }
    Ok(value)
}

impl std::fmt::Debug for VariableScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self.local.read().map(|l| l.keys().cloned().collect()).unwrap_or_default();
        f.debug_struct("VariableScope")
         .field("local", &names)
         .field("has_parent", &self.parent.is_some())
         .finish_non_exhaustive()
    }
}
