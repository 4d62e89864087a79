//! Contrato del build en ejecución visto desde los delegates.
//!
//! El build es dueño del log de eventos y de la procedencia de las imágenes
//! usadas. Los delegates nunca hablan con el `EventStore` directamente.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::StoreError;
use crate::event::{BuildEvent, BuildEventKind, EventStore, InMemoryEventStore};
use crate::plan::PlanId;
use crate::resource::ResourceCache;

/// Entidad lógica dueña de un contenedor, para el garbage collector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContainerOwner {
    BuildStep { build_id: Uuid, plan_id: PlanId, team_name: String },
}

pub trait Build: Send + Sync {
    fn id(&self) -> Uuid;
    fn name(&self) -> &str;
    fn team_name(&self) -> &str;
    fn pipeline_name(&self) -> Option<&str>;

    fn save_event(&self, origin: &PlanId, time: DateTime<Utc>, kind: BuildEventKind) -> Result<(), StoreError>;

    /// Registra la cache de una imagen usada por el build (procedencia).
    fn save_image_resource_version(&self, cache: &ResourceCache) -> Result<(), StoreError>;

    fn container_owner(&self, plan_id: &PlanId) -> ContainerOwner {
        ContainerOwner::BuildStep { build_id: self.id(),
                                    plan_id: plan_id.clone(),
                                    team_name: self.team_name().to_string() }
    }
}

/// Build respaldado por un `EventStore` y una lista en memoria de versiones
/// de imagen (una entrada por llamada, sin deduplicar).
pub struct InMemoryBuild<E: EventStore = InMemoryEventStore> {
    id: Uuid,
    name: String,
    team_name: String,
    pipeline_name: Option<String>,
    events: Arc<E>,
    image_versions: Mutex<Vec<ResourceCache>>,
}

impl InMemoryBuild<InMemoryEventStore> {
    pub fn new(team_name: impl Into<String>, pipeline_name: Option<&str>) -> Self {
        Self::with_store(team_name, pipeline_name, Arc::new(InMemoryEventStore::new()))
    }
}

impl<E: EventStore> InMemoryBuild<E> {
    pub fn with_store(team_name: impl Into<String>, pipeline_name: Option<&str>, events: Arc<E>) -> Self {
        let id = Uuid::new_v4();
        Self { id,
               name: id.simple().to_string()[..8].to_string(),
               team_name: team_name.into(),
               pipeline_name: pipeline_name.map(str::to_string),
               events,
               image_versions: Mutex::new(vec![]) }
    }

    pub fn events(&self) -> Vec<BuildEvent> {
        self.events.list(self.id)
    }

    pub fn image_resource_versions(&self) -> Vec<ResourceCache> {
        match self.image_versions.lock() {
            Ok(v) => v.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl<E: EventStore> Build for InMemoryBuild<E> {
    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn team_name(&self) -> &str {
        &self.team_name
    }

    fn pipeline_name(&self) -> Option<&str> {
        self.pipeline_name.as_deref()
    }

    fn save_event(&self, origin: &PlanId, time: DateTime<Utc>, kind: BuildEventKind) -> Result<(), StoreError> {
        self.events.append(self.id, origin.clone(), time, kind).map(|_| ())
    }

    fn save_image_resource_version(&self, cache: &ResourceCache) -> Result<(), StoreError> {
        let mut versions = self.image_versions.lock().map_err(|_| StoreError::Poisoned)?;
        versions.push(cache.clone());
        Ok(())
    }
}
