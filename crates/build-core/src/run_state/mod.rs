//! Estado de ejecución de un build.
//!
//! `RunState` pertenece a una sola ejecución de build. Agrupa:
//! - el repositorio de artifacts (con scopes anidados),
//! - el store de resultados por `PlanId` (compartido entre scopes: es el
//!   único canal por el que una sub-ejecución devuelve datos),
//! - el scope de variables,
//! - el `PlanRunner` que ejecuta sub-planes.

mod artifacts;
mod results;

use std::any::Any;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use artifacts::{ArtifactEntry, ArtifactHandle, ArtifactRepository};
pub use results::ResultStore;

use crate::cancel::CancelToken;
use crate::errors::RunError;
use crate::plan::{Plan, PlanId};
use crate::resource::ResourceCache;
use crate::vars::VariableScope;

/// Ejecutor de planes. Se implementa fuera de este core.
pub trait PlanRunner: Send + Sync {
    /// Ejecuta `plan` dentro de `state`. `Ok(false)` significa que el plan
    /// terminó pero no fue exitoso.
    fn run(&self, plan: &Plan, state: &RunState, cancel: &CancelToken) -> Result<bool, RunError>;
}

/// Resultado que un get deja en el `ResultStore` bajo su `PlanId`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetResult {
    pub name: String,
    pub resource_cache: Option<ResourceCache>,
}

#[derive(Clone)]
pub struct RunState {
    artifacts: Arc<ArtifactRepository>,
    results: Arc<ResultStore>,
    vars: Arc<VariableScope>,
    runner: Arc<dyn PlanRunner>,
}

impl RunState {
    pub fn new(runner: Arc<dyn PlanRunner>, vars: Arc<VariableScope>) -> Self {
        Self { artifacts: Arc::new(ArtifactRepository::new()),
               results: Arc::new(ResultStore::new()),
               vars,
               runner }
    }

    /// Scope hijo: artifacts y variables locales nuevos, resultados
    /// compartidos con el padre.
    pub fn new_local_scope(&self) -> RunState {
        Self { artifacts: self.artifacts.new_local_scope(),
               results: Arc::clone(&self.results),
               vars: self.vars.new_local_scope(),
               runner: Arc::clone(&self.runner) }
    }

    pub fn artifacts(&self) -> &Arc<ArtifactRepository> {
        &self.artifacts
    }

    pub fn results(&self) -> &Arc<ResultStore> {
        &self.results
    }

    pub fn vars(&self) -> &Arc<VariableScope> {
        &self.vars
    }

    pub fn run(&self, plan: &Plan, cancel: &CancelToken) -> Result<bool, RunError> {
        if cancel.is_cancelled() {
            return Err(RunError::Cancelled);
        }
        self.runner.run(plan, self, cancel)
    }

    pub fn store_result<T: Any + Send + Sync>(&self, plan_id: PlanId, value: T) {
        self.results.store(plan_id, value);
    }

    pub fn result<T: Any + Clone>(&self, plan_id: &PlanId) -> Option<T> {
        self.results.get(plan_id)
    }
}

impl std::fmt::Debug for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunState")
         .field("artifacts", &self.artifacts)
         .field("results", &self.results)
         .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RegisteringRunner;

    impl PlanRunner for RegisteringRunner {
        fn run(&self, plan: &Plan, state: &RunState, _cancel: &CancelToken) -> Result<bool, RunError> {
            state.artifacts().register("out", ArtifactHandle::new(format!("vol-{}", plan.id)), false);
            state.store_result(plan.id.clone(), GetResult { name: "out".into(), resource_cache: None });
            Ok(true)
        }
    }

    fn state() -> RunState {
        RunState::new(Arc::new(RegisteringRunner), Arc::new(VariableScope::new(None)))
    }

    fn plan() -> Plan {
        serde_json::from_value(serde_json::json!({"id": "9", "get": {"name": "out", "type": "git", "source": {}}})).unwrap()
    }

    #[test]
    fn local_scope_shares_results_but_not_artifacts() {
        let parent = state();
        let child = parent.new_local_scope();
        assert!(child.run(&plan(), &CancelToken::new()).unwrap());

        assert!(child.artifacts().lookup("out").is_some());
        assert!(parent.artifacts().lookup("out").is_none());
        let res: Option<GetResult> = parent.result(&PlanId::new("9"));
        assert_eq!(res.map(|r| r.name), Some("out".to_string()));
    }

    #[test]
    fn cancelled_token_short_circuits() {
        let token = CancelToken::new();
        token.cancel();
        assert_eq!(state().run(&plan(), &token), Err(RunError::Cancelled));
    }
}
