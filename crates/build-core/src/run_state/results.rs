use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use log::warn;

use crate::plan::PlanId;

/// Resultados estructurados por `PlanId`.
///
/// Es write-once en operación normal: un segundo `store` para el mismo plan
/// reemplaza el valor y queda registrado como warning.
#[derive(Default)]
pub struct ResultStore {
    results: Mutex<HashMap<PlanId, Arc<dyn Any + Send + Sync>>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store<T: Any + Send + Sync>(&self, plan_id: PlanId, value: T) {
        let mut results = self.results();
        if results.contains_key(&plan_id) {
            warn!("result for plan {plan_id} stored more than once, replacing");
        }
        results.insert(plan_id, Arc::new(value));
    }

    /// Resultado tipado. `None` si no existe o si es de otro tipo.
    pub fn get<T: Any + Clone>(&self, plan_id: &PlanId) -> Option<T> {
        self.results().get(plan_id).and_then(|v| v.downcast_ref::<T>()).cloned()
    }

    pub fn contains(&self, plan_id: &PlanId) -> bool {
        self.results().contains_key(plan_id)
    }

    fn results(&self) -> MutexGuard<'_, HashMap<PlanId, Arc<dyn Any + Send + Sync>>> {
        self.results.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for ResultStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<String> = self.results().keys().map(|k| k.to_string()).collect();
        keys.sort();
        f.debug_struct("ResultStore").field("plans", &keys).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Out(u32);

    #[test]
    fn typed_lookup() {
        let store = ResultStore::new();
        store.store(PlanId::new("1"), Out(3));
        assert_eq!(store.get::<Out>(&PlanId::new("1")), Some(Out(3)));
        assert_eq!(store.get::<String>(&PlanId::new("1")), None);
        assert!(store.get::<Out>(&PlanId::new("2")).is_none());
        assert!(store.contains(&PlanId::new("1")));
    }
}
