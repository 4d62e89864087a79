use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use build_core::hashing::hash_value;
use build_core::plan::{Params, Source};
use build_core::{ResourceCache, Version};
use serde_json::{json, Value};

use super::{CacheUser, ResourceCacheFactory, ResourceConfig, ResourceConfigFactory, ResourceConfigScope};
use crate::errors::ResourceError;

fn config_key(resource_type: &str, source: &Source, parent: Option<&ResourceCache>) -> String {
    hash_value(&json!({
        "type": resource_type,
        "source": Value::Object(source.clone()),
        "parent": parent.map(|p| p.id),
    }))
}

/// Configs en memoria, direccionadas por el hash de `(type, source, parent)`.
#[derive(Default)]
pub struct InMemoryResourceConfigs {
    next_id: AtomicI64,
    configs: Mutex<HashMap<String, Arc<InMemoryResourceConfig>>>,
}

impl InMemoryResourceConfigs {
    pub fn new() -> Self {
        Self::default()
    }

    fn config(&self, key: String) -> Result<Arc<InMemoryResourceConfig>, ResourceError> {
        let mut configs = self.configs.lock().map_err(|_| ResourceError::Unavailable("config map poisoned".into()))?;
        let config = configs.entry(key).or_insert_with(|| {
                                           let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
                                           Arc::new(InMemoryResourceConfig { id,
                                                                             scopes: Mutex::new(HashMap::new()) })
                                       });
        Ok(Arc::clone(config))
    }

    /// Simula al checker: fija la última versión del scope anónimo de
    /// `(type, source)`.
    pub fn set_latest_version(&self,
                              resource_type: &str,
                              source: &Source,
                              version: Version)
                              -> Result<(), ResourceError> {
        let config = self.config(config_key(resource_type, source, None))?;
        let scope = config.scope(None)?;
        *scope.latest.lock().map_err(|_| ResourceError::Unavailable("scope poisoned".into()))? = Some(version);
        Ok(())
    }
}

impl ResourceConfigFactory for InMemoryResourceConfigs {
    fn find_or_create_resource_config(&self,
                                      resource_type: &str,
                                      source: &Source,
                                      parent: Option<&ResourceCache>)
                                      -> Result<Arc<dyn ResourceConfig>, ResourceError> {
        let config: Arc<dyn ResourceConfig> = self.config(config_key(resource_type, source, parent))?;
        Ok(config)
    }
}

struct InMemoryResourceConfig {
    id: i64,
    scopes: Mutex<HashMap<Option<i64>, Arc<InMemoryScope>>>,
}

impl InMemoryResourceConfig {
    fn scope(&self, resource_id: Option<i64>) -> Result<Arc<InMemoryScope>, ResourceError> {
        let mut scopes = self.scopes.lock().map_err(|_| ResourceError::Unavailable("scope map poisoned".into()))?;
        Ok(Arc::clone(scopes.entry(resource_id).or_default()))
    }
}

impl ResourceConfig for InMemoryResourceConfig {
    fn id(&self) -> i64 {
        self.id
    }

    fn find_or_create_scope(&self, resource_id: Option<i64>) -> Result<Arc<dyn ResourceConfigScope>, ResourceError> {
        let scope: Arc<dyn ResourceConfigScope> = self.scope(resource_id)?;
        Ok(scope)
    }
}

#[derive(Default)]
struct InMemoryScope {
    latest: Mutex<Option<Version>>,
}

impl ResourceConfigScope for InMemoryScope {
    fn latest_version(&self) -> Result<Option<Version>, ResourceError> {
        self.latest.lock().map(|v| v.clone()).map_err(|_| ResourceError::Unavailable("scope poisoned".into()))
    }
}

/// Caches en memoria. La misma `(type, version, source, params, parent)`
/// devuelve siempre la misma cache.
#[derive(Default)]
pub struct InMemoryResourceCaches {
    next_id: AtomicI64,
    caches: Mutex<HashMap<String, ResourceCache>>,
}

impl InMemoryResourceCaches {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.caches.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResourceCacheFactory for InMemoryResourceCaches {
    fn find_or_create_resource_cache(&self,
                                     _user: CacheUser,
                                     resource_type: &str,
                                     version: &Version,
                                     source: &Source,
                                     params: &Params,
                                     parent: Option<&ResourceCache>)
                                     -> Result<ResourceCache, ResourceError> {
        let source_hash = hash_value(&Value::Object(source.clone()));
        let params_hash = hash_value(&Value::Object(params.clone()));
        let key = hash_value(&json!({
            "type": resource_type,
            "version": version,
            "source": source_hash,
            "params": params_hash,
            "parent": parent.map(|p| p.id),
        }));

        let mut caches = self.caches.lock().map_err(|_| ResourceError::Unavailable("cache map poisoned".into()))?;
        let cache = caches.entry(key).or_insert_with(|| ResourceCache { id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
                                                                       resource_type: resource_type.to_string(),
                                                                       version: version.clone(),
                                                                       source_hash,
                                                                       params_hash });
        Ok(cache.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn source() -> Source {
        json!({"repository": "my-org/img", "tag": "latest"}).as_object().cloned().unwrap()
    }

    #[test]
    fn latest_version_is_visible_through_the_factory() {
        let configs = InMemoryResourceConfigs::new();
        let version: Version = [("digest".to_string(), "sha256:abc".to_string())].into();
        configs.set_latest_version("registry-image", &source(), version.clone()).unwrap();

        let config = configs.find_or_create_resource_config("registry-image", &source(), None).unwrap();
        let scope = config.find_or_create_scope(None).unwrap();
        assert_eq!(scope.latest_version().unwrap(), Some(version));

        let other = configs.find_or_create_resource_config("git", &source(), None).unwrap();
        assert_ne!(other.id(), config.id());
        assert_eq!(other.find_or_create_scope(None).unwrap().latest_version().unwrap(), None);
    }

    #[test]
    fn caches_are_memoized_and_never_store_the_source() {
        let caches = InMemoryResourceCaches::new();
        let version: Version = [("digest".to_string(), "sha256:abc".to_string())].into();
        let user = CacheUser::Build(Uuid::new_v4());
        let a = caches.find_or_create_resource_cache(user, "registry-image", &version, &source(), &Params::new(), None)
                      .unwrap();
        let b = caches.find_or_create_resource_cache(user, "registry-image", &version, &source(), &Params::new(), None)
                      .unwrap();
        assert_eq!(a, b);
        assert_eq!(caches.len(), 1);
        assert_eq!(a.source_hash, hash_value(&Value::Object(source())));
    }
}
