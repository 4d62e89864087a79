//! Contratos de recursos usados por la resolución de imágenes.
//!
//! Un `ResourceConfig` identifica `(type, source)`; sus scopes guardan la
//! última versión descubierta por el checker fuera de banda. Una
//! `ResourceCache` memoiza un fetch concreto `(type, source, version,
//! params)` y es lo que se registra como procedencia de la imagen.

mod memory;

use std::sync::Arc;

use build_core::plan::{Params, Source};
use build_core::{ResourceCache, Version};
use uuid::Uuid;

use crate::errors::ResourceError;

pub use memory::{InMemoryResourceCaches, InMemoryResourceConfigs};

pub trait ResourceConfigFactory: Send + Sync {
    fn find_or_create_resource_config(&self,
                                      resource_type: &str,
                                      source: &Source,
                                      parent: Option<&ResourceCache>)
                                      -> Result<Arc<dyn ResourceConfig>, ResourceError>;
}

pub trait ResourceConfig: Send + Sync {
    fn id(&self) -> i64;

    /// `resource_id` es `None` para configs anónimas (imágenes, tipos).
    fn find_or_create_scope(&self, resource_id: Option<i64>) -> Result<Arc<dyn ResourceConfigScope>, ResourceError>;
}

pub trait ResourceConfigScope: Send + Sync {
    fn latest_version(&self) -> Result<Option<Version>, ResourceError>;
}

/// Quién retiene una cache (para el garbage collector).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheUser {
    Build(Uuid),
}

pub trait ResourceCacheFactory: Send + Sync {
    fn find_or_create_resource_cache(&self,
                                     user: CacheUser,
                                     resource_type: &str,
                                     version: &Version,
                                     source: &Source,
                                     params: &Params,
                                     parent: Option<&ResourceCache>)
                                     -> Result<ResourceCache, ResourceError>;
}

/// Fábricas necesarias para el camino rápido de imágenes.
#[derive(Clone)]
pub struct ResourceServices {
    pub configs: Arc<dyn ResourceConfigFactory>,
    pub caches: Arc<dyn ResourceCacheFactory>,
}

impl std::fmt::Debug for ResourceServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceServices").finish_non_exhaustive()
    }
}
