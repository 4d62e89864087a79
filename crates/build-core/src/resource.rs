//! Versiones y caches de recursos.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Versión de un recurso: mapa plano de strings (`{"digest": "sha256:..."}`).
pub type Version = BTreeMap<String, String>;

/// Registro de procedencia de un fetch memoizado de
/// `(type, source, version, params)`.
///
/// Lo devuelve la resolución de imágenes para que los steps siguientes puedan
/// encadenar configs de tipos custom, y se guarda en el build como versión de
/// imagen usada.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceCache {
    pub id: i64,
    pub resource_type: String,
    pub version: Version,
    /// Hash del source evaluado (nunca el source mismo).
    pub source_hash: String,
    pub params_hash: String,
}

impl ResourceCache {
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn version(&self) -> &Version {
        &self.version
    }
}
