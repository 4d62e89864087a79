use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{BuildEvent, BuildEventKind};
use crate::errors::StoreError;
use crate::plan::PlanId;

/// Almacenamiento de eventos append-only. Sin updates ni deletes.
pub trait EventStore: Send + Sync {
    /// Agrega un evento y devuelve el evento completo (con `seq`).
    fn append(&self, build_id: Uuid, origin: PlanId, time: DateTime<Utc>, kind: BuildEventKind)
              -> Result<BuildEvent, StoreError>;
    /// Lista eventos de un build (orden ascendente por seq).
    fn list(&self, build_id: Uuid) -> Vec<BuildEvent>;
}

#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    inner: Mutex<HashMap<Uuid, Vec<BuildEvent>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventStore for InMemoryEventStore {
    fn append(&self, build_id: Uuid, origin: PlanId, time: DateTime<Utc>, kind: BuildEventKind)
              -> Result<BuildEvent, StoreError> {
        let mut inner = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        let events = inner.entry(build_id).or_default();
        let ev = BuildEvent { seq: events.len() as u64,
                              build_id,
                              origin,
                              time,
                              kind };
        events.push(ev.clone());
        Ok(ev)
    }

    fn list(&self, build_id: Uuid) -> Vec<BuildEvent> {
        match self.inner.lock() {
            Ok(inner) => inner.get(&build_id).cloned().unwrap_or_default(),
            Err(poisoned) => poisoned.into_inner().get(&build_id).cloned().unwrap_or_default(),
        }
    }
}
