use std::sync::Arc;

use buildflow::build_core::{ArtifactHandle, CancelToken, GetResult, InMemoryBuild, LogStream, Plan, PlanRunner,
                            PlanStep, RunError, RunState, VariableScope};
use buildflow::build_exec::{DelegateDeps, DelegateError, DelegateFactory, ImageRequest, SystemClock};
use buildflow::build_policies::{PolicyAgent, PolicyCheckInput, PolicyCheckResult, PolicyError};
use buildflow::AppConfig;
use serde_json::json;

struct GetOnly;

impl PlanRunner for GetOnly {
    fn run(&self, plan: &Plan, state: &RunState, _cancel: &CancelToken) -> Result<bool, RunError> {
        let Some(get) = plan.as_get() else { return Ok(true) };
        state.artifacts().register(get.name.clone(), ArtifactHandle::new("vol-1"), false);
        state.store_result(plan.id.clone(), GetResult { name: get.name.clone(), resource_cache: None });
        Ok(true)
    }
}

struct Deny(bool);

impl PolicyAgent for Deny {
    fn check(&self, _input: &PolicyCheckInput) -> Result<PolicyCheckResult, PolicyError> {
        Ok(PolicyCheckResult::deny(self.0, vec!["untrusted registry".into()]))
    }
}

fn request() -> ImageRequest {
    ImageRequest { check_plan: None,
                   get_plan: serde_json::from_value(json!({
                       "id": "1.1",
                       "get": {"name": "image", "type": "registry-image", "source": {"repository": "evil/img", "tag": "x"}}
                   })).unwrap(),
                   privileged: false }
}

fn factory(cfg: &AppConfig, build: Arc<InMemoryBuild>, agent: Arc<dyn PolicyAgent>) -> DelegateFactory {
    DelegateFactory::new(DelegateDeps { build,
                                        clock: Arc::new(SystemClock),
                                        policy: cfg.policy_checker(Some(agent)),
                                        resources: None,
                                        config: cfg.delegate.clone() })
}

fn task() -> Plan {
    Plan::new("1", PlanStep::Task(serde_json::from_value(json!({"name": "unit"})).unwrap()))
}

#[test]
fn configured_actions_enable_the_policy_gate() {
    let cfg = AppConfig::from_lookup(|var| (var == "BUILDFLOW_POLICY_CHECK_ACTIONS").then(|| "useimage".to_string()))
        .unwrap();
    let state = RunState::new(Arc::new(GetOnly), Arc::new(VariableScope::new(None)));
    let delegate = factory(&cfg, Arc::new(InMemoryBuild::new("main", None)), Arc::new(Deny(true)))
        .delegate_for(&task(), state);

    let err = delegate.fetch_image(&request(), &CancelToken::new()).unwrap_err();
    assert!(matches!(err, DelegateError::Policy(PolicyError::Blocked { .. })));
    assert_eq!(err.to_string(), "policy check failed: untrusted registry");
}

#[test]
fn without_configured_actions_the_gate_is_skipped() {
    let cfg = AppConfig::from_lookup(|_| None).unwrap();
    let state = RunState::new(Arc::new(GetOnly), Arc::new(VariableScope::new(None)));
    let build = Arc::new(InMemoryBuild::new("main", None));
    let delegate = factory(&cfg, build.clone(), Arc::new(Deny(true))).delegate_for(&task(), state);

    let image = delegate.fetch_image(&request(), &CancelToken::new()).unwrap();
    assert_eq!(image.spec.image_artifact, Some(ArtifactHandle::new("vol-1")));
    assert_eq!(image.spec.resource_type.as_deref(), Some("registry-image"));
}

#[test]
fn soft_enforcement_from_config_warns_on_stderr() {
    let cfg = AppConfig::from_lookup(|var| (var == "BUILDFLOW_POLICY_CHECK_ACTIONS").then(|| "UseImage".to_string()))
        .unwrap();
    let state = RunState::new(Arc::new(GetOnly), Arc::new(VariableScope::new(None)));
    let build = Arc::new(InMemoryBuild::new("main", None));
    let delegate = factory(&cfg, build.clone(), Arc::new(Deny(false))).delegate_for(&task(), state);

    delegate.fetch_image(&request(), &CancelToken::new()).unwrap();
    let stderr: Vec<String> = build.events()
                                   .into_iter()
                                   .filter_map(|e| match e.kind {
                                       buildflow::build_core::BuildEventKind::Log { stream: LogStream::Stderr, payload } => {
                                           Some(payload)
                                       }
                                       _ => None,
                                   })
                                   .collect();
    assert_eq!(stderr.len(), 2);
}
