use build_core::{Plan, RunState};

use crate::delegate::{BuildStepDelegate, DelegateDeps, StepKind};

/// Crea un delegate por step, todos ligados al mismo build.
#[derive(Clone)]
pub struct DelegateFactory {
    deps: DelegateDeps,
}

impl DelegateFactory {
    pub fn new(deps: DelegateDeps) -> Self {
        Self { deps }
    }

    pub fn deps(&self) -> &DelegateDeps {
        &self.deps
    }

    pub fn delegate_for(&self, plan: &Plan, state: RunState) -> BuildStepDelegate {
        BuildStepDelegate::new(StepKind::of(&plan.step), plan.id.clone(), state, self.deps.clone())
    }
}
