//! Repositorio de artifacts del build con scopes anidados.

use std::sync::{Arc, Mutex, MutexGuard};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Handle opaco de un volumen registrado por un step.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactHandle(String);

impl ArtifactHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactEntry {
    pub handle: ArtifactHandle,
    /// El volumen se reutilizó desde una cache en lugar de producirse ahora.
    pub from_cache: bool,
}

/// Mapea nombres de artifacts locales al step a handles de volumen.
///
/// Un scope hijo lee los artifacts del padre pero sus escrituras quedan
/// locales hasta `merge_into_parent`.
#[derive(Debug, Default)]
pub struct ArtifactRepository {
    parent: Option<Arc<ArtifactRepository>>,
    entries: Mutex<IndexMap<String, ArtifactEntry>>,
}

impl ArtifactRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_local_scope(self: &Arc<Self>) -> Arc<ArtifactRepository> {
        Arc::new(ArtifactRepository { parent: Some(Arc::clone(self)),
                                      entries: Mutex::new(IndexMap::new()) })
    }

    pub fn parent(&self) -> Option<&Arc<ArtifactRepository>> {
        self.parent.as_ref()
    }

    pub fn register(&self, name: impl Into<String>, handle: ArtifactHandle, from_cache: bool) {
        self.entries().insert(name.into(), ArtifactEntry { handle, from_cache });
    }

    /// Busca primero en este scope y luego en los ancestros.
    pub fn lookup(&self, name: &str) -> Option<ArtifactEntry> {
        if let Some(entry) = self.entries().get(name) {
            return Some(entry.clone());
        }
        self.parent.as_ref().and_then(|p| p.lookup(name))
    }

    /// Vista aplanada: artifacts del padre sobreescritos por los locales.
    pub fn as_map(&self) -> IndexMap<String, ArtifactEntry> {
        let mut all = self.parent.as_ref().map(|p| p.as_map()).unwrap_or_default();
        for (name, entry) in self.entries().iter() {
            all.insert(name.clone(), entry.clone());
        }
        all
    }

    pub fn local_names(&self) -> Vec<String> {
        self.entries().keys().cloned().collect()
    }

    /// Copia los artifacts locales al scope padre. No-op en la raíz.
    pub fn merge_into_parent(&self) {
        let Some(parent) = &self.parent else { return };
        let local: Vec<(String, ArtifactEntry)> = self.entries().iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        let mut target = parent.entries();
        for (name, entry) in local {
            target.insert(name, entry);
        }
    }

    fn entries(&self) -> MutexGuard<'_, IndexMap<String, ArtifactEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
