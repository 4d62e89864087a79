//! build-core: modelo de datos y stores hoja del ejecutor de builds.
//!
//! Este crate no ejecuta steps. Provee los contratos y estructuras que el
//! ejecutor (`build-exec`) y las políticas (`build-policies`) comparten:
//! - `plan`: árbol inmutable de steps con `PlanId` jerárquicos.
//! - `event`: eventos tipados append-only y el contrato `EventStore`.
//! - `build`: contrato `Build` (eventos, procedencia de imágenes, dueños de
//!   contenedores).
//! - `run_state`: repositorio de artifacts con scopes anidados, store de
//!   resultados y el runner de planes.
//! - `vars`: scope de variables, tracking de credenciales y templates `((ref))`.
//! - `redact`: reemplazo de secretos conocidos en texto observable.

pub mod build;
pub mod cancel;
pub mod constants;
pub mod errors;
pub mod event;
pub mod hashing;
pub mod plan;
pub mod redact;
pub mod resource;
pub mod run_state;
pub mod vars;

pub use build::{Build, ContainerOwner, InMemoryBuild};
pub use cancel::CancelToken;
pub use errors::{RunError, StoreError, TemplateError, VarError};
pub use event::{BuildEvent, BuildEventKind, EventStore, InMemoryEventStore, LogStream};
pub use plan::{Plan, PlanId, PlanStep};
pub use redact::Redactor;
pub use resource::{ResourceCache, Version};
pub use run_state::{ArtifactEntry, ArtifactHandle, ArtifactRepository, GetResult, PlanRunner, ResultStore, RunState};
pub use vars::{CredentialManager, CredentialTracker, InMemoryCredentials, VarRef, VariableScope};
