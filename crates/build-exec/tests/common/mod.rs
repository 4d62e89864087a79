#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use build_core::{ArtifactHandle, Build, BuildEvent, BuildEventKind, CancelToken, GetResult, InMemoryBuild,
                 InMemoryCredentials, LogStream, Plan, PlanId, PlanRunner, PlanStep, ResourceCache, RunError,
                 RunState, VariableScope, Version};
use build_exec::{DelegateConfig, DelegateDeps, SystemClock};
use build_policies::{NoopPolicyChecker, PolicyAgent, PolicyCheckInput, PolicyCheckResult, PolicyChecker, PolicyError};
use serde_json::{json, Value};

/// Runner de prueba: los check responden `check_ok`; los get responden
/// `get_ok` y, si corresponde, registran artifact y resultado.
pub struct ScriptedRunner {
    pub check_ok: bool,
    pub get_ok: bool,
    pub store_result: bool,
    pub register_artifact: bool,
    pub cache: Option<ResourceCache>,
    pub ran: Mutex<Vec<PlanId>>,
}

impl ScriptedRunner {
    pub fn succeeding(cache: Option<ResourceCache>) -> Self {
        Self { check_ok: true,
               get_ok: true,
               store_result: true,
               register_artifact: true,
               cache,
               ran: Mutex::new(vec![]) }
    }

    pub fn ran(&self) -> Vec<PlanId> {
        self.ran.lock().unwrap().clone()
    }
}

impl PlanRunner for ScriptedRunner {
    fn run(&self, plan: &Plan, state: &RunState, _cancel: &CancelToken) -> Result<bool, RunError> {
        self.ran.lock().unwrap().push(plan.id.clone());
        match &plan.step {
            PlanStep::Check(_) => Ok(self.check_ok),
            PlanStep::Get(get) => {
                if !self.get_ok {
                    return Ok(false);
                }
                if self.register_artifact {
                    state.artifacts().register(get.name.clone(), ArtifactHandle::new(format!("vol-{}", plan.id)), false);
                }
                if self.store_result {
                    state.store_result(plan.id.clone(),
                                       GetResult { name: get.name.clone(), resource_cache: self.cache.clone() });
                }
                Ok(true)
            }
            _ => Err(RunError::Failed(format!("unexpected plan {}", plan.id))),
        }
    }
}

/// Motor de políticas que responde siempre lo mismo y guarda los inputs.
pub struct RecordingAgent {
    pub result: Result<PolicyCheckResult, PolicyError>,
    pub inputs: Mutex<Vec<PolicyCheckInput>>,
}

impl RecordingAgent {
    pub fn new(result: Result<PolicyCheckResult, PolicyError>) -> Arc<Self> {
        Arc::new(Self { result, inputs: Mutex::new(vec![]) })
    }

    pub fn inputs(&self) -> Vec<PolicyCheckInput> {
        self.inputs.lock().unwrap().clone()
    }
}

impl PolicyAgent for RecordingAgent {
    fn check(&self, input: &PolicyCheckInput) -> Result<PolicyCheckResult, PolicyError> {
        self.inputs.lock().unwrap().push(input.clone());
        self.result.clone()
    }
}

pub fn credentials() -> Arc<InMemoryCredentials> {
    Arc::new(InMemoryCredentials::new().with("registry-password", json!("hunter22")))
}

pub fn run_state(runner: Arc<ScriptedRunner>) -> RunState {
    RunState::new(runner, Arc::new(VariableScope::new(Some(credentials()))))
}

pub fn deps(build: Arc<InMemoryBuild>, policy: Option<Arc<dyn PolicyChecker>>) -> DelegateDeps {
    DelegateDeps { build,
                   clock: Arc::new(SystemClock),
                   policy: policy.unwrap_or_else(|| Arc::new(NoopPolicyChecker) as Arc<dyn PolicyChecker>),
                   resources: None,
                   config: DelegateConfig::default() }
}

pub fn plan(value: Value) -> Plan {
    serde_json::from_value(value).unwrap()
}

pub fn digest_version(digest: &str) -> Version {
    [("digest".to_string(), digest.to_string())].into()
}

pub fn cache(id: i64, digest: &str) -> ResourceCache {
    ResourceCache { id,
                    resource_type: "registry-image".into(),
                    version: digest_version(digest),
                    source_hash: "source".into(),
                    params_hash: "params".into() }
}

pub fn events_named(build: &InMemoryBuild, name: &str) -> Vec<BuildEvent> {
    build.events().into_iter().filter(|e| e.kind.name() == name).collect()
}

pub fn logs(build: &InMemoryBuild, stream: LogStream) -> Vec<String> {
    build.events()
         .into_iter()
         .filter_map(|e| match e.kind {
             BuildEventKind::Log { stream: s, payload } if s == stream => Some(payload),
             _ => None,
         })
         .collect()
}

pub fn build() -> Arc<InMemoryBuild> {
    Arc::new(InMemoryBuild::new("main", Some("ci")))
}

pub fn as_dyn(build: &Arc<InMemoryBuild>) -> Arc<dyn Build> {
    build.clone()
}
