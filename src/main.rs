//! Demo: un build en memoria que resuelve la imagen de un task por ambos
//! caminos y expande un step across.

use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use buildflow::build_core::{ArtifactHandle, Build, BuildEventKind, CancelToken, GetResult, InMemoryBuild,
                            InMemoryCredentials, Plan, PlanRunner, PlanStep, RunError, RunState, VariableScope, Version};
use buildflow::build_exec::{CacheUser, DelegateDeps, DelegateFactory, ImageRequest, InMemoryResourceCaches,
                            InMemoryResourceConfigs, ResourceCacheFactory, ResourceServices, SystemClock};
use buildflow::build_policies::{PolicyAgent, PolicyCheckInput, PolicyCheckResult, PolicyError};
use buildflow::config::{init_dotenv, AppConfig};
use serde_json::json;

/// Simula el trabajo de los workers: los check pasan y los get registran un
/// volumen y su resource cache.
struct LocalRunner {
    build: Arc<InMemoryBuild>,
    caches: Arc<InMemoryResourceCaches>,
}

impl PlanRunner for LocalRunner {
    fn run(&self, plan: &Plan, state: &RunState, _cancel: &CancelToken) -> Result<bool, RunError> {
        match &plan.step {
            PlanStep::Check(_) => Ok(true),
            PlanStep::Get(get) => {
                let version: Version = [("digest".to_string(), "sha256:4f1c0b2e".to_string())].into();
                let cache = self.caches
                                .find_or_create_resource_cache(CacheUser::Build(self.build.id()),
                                                               &get.type_,
                                                               &version,
                                                               &get.source,
                                                               &get.params,
                                                               None)
                                .map_err(|e| RunError::Failed(e.to_string()))?;
                state.artifacts().register(get.name.clone(), ArtifactHandle::new(format!("volume-{}", plan.id)), false);
                state.store_result(plan.id.clone(), GetResult { name: get.name.clone(), resource_cache: Some(cache) });
                Ok(true)
            }
            _ => Err(RunError::Failed(format!("demo runner cannot run plan {}", plan.id))),
        }
    }
}

/// Advierte (sin bloquear) sobre imágenes privilegiadas.
struct WarnOnPrivileged;

impl PolicyAgent for WarnOnPrivileged {
    fn check(&self, input: &PolicyCheckInput) -> Result<PolicyCheckResult, PolicyError> {
        if input.data["privileged"] == json!(true) {
            return Ok(PolicyCheckResult::deny(false, vec!["privileged images need review".into()]));
        }
        Ok(PolicyCheckResult::allow())
    }
}

fn main() -> ExitCode {
    init_dotenv();
    let mut config = match AppConfig::from_env() {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("invalid configuration: {err}");
            return ExitCode::from(2);
        }
    };
    if config.policy_check_actions.is_empty() {
        config.policy_check_actions.push("UseImage".into());
    }

    let build = Arc::new(InMemoryBuild::new("main", Some("demo")));
    let configs = Arc::new(InMemoryResourceConfigs::new());
    let caches = Arc::new(InMemoryResourceCaches::new());
    let credentials = InMemoryCredentials::new().with("registry-password", json!("s3cr3t-pass"));
    let vars = Arc::new(VariableScope::new(Some(Arc::new(credentials))));
    let runner = Arc::new(LocalRunner { build: build.clone(), caches: caches.clone() });
    let state = RunState::new(runner, vars);

    let deps = DelegateDeps { build: build.clone(),
                              clock: Arc::new(SystemClock),
                              policy: config.policy_checker(Some(Arc::new(WarnOnPrivileged))),
                              resources: Some(ResourceServices { configs: configs.clone(),
                                                                 caches: caches.clone() }),
                              config: config.delegate.clone() };
    let factory = DelegateFactory::new(deps);

    let task: Plan = match serde_json::from_value(json!({
        "id": "1",
        "task": {
            "name": "unit",
            "privileged": true,
            "image": {
                "check": {"id": "1/image-check", "check": {"name": "image", "type": "registry-image",
                          "source": {"repository": "my-org/builder", "tag": "latest"}}},
                "get": {"id": "1/image-get", "get": {"name": "image", "type": "registry-image",
                        "source": {"repository": "my-org/builder", "tag": "latest",
                                   "password": "((registry-password))"},
                        "version_from": "1/image-check"}}
            }
        }
    })) {
        Ok(plan) => plan,
        Err(err) => {
            eprintln!("invalid demo plan: {err}");
            return ExitCode::FAILURE;
        }
    };

    let delegate = factory.delegate_for(&task, state.clone());
    delegate.initializing();
    let Some(request) = (match &task.step {
        PlanStep::Task(t) => ImageRequest::from_task(t),
        _ => None,
    }) else {
        eprintln!("task has no image");
        return ExitCode::FAILURE;
    };

    println!("== image via check + get");
    match delegate.fetch_image(&request, &CancelToken::new()) {
        Ok(image) => println!("   {:?}", image.spec),
        Err(err) => {
            delegate.errored(err.to_string());
            eprintln!("image resolution failed: {err}");
            return ExitCode::FAILURE;
        }
    }
    delegate.starting();
    let mut out = delegate.stdout();
    let _ = out.write_all(b"logging in with s3cr3t-pass\nrunning tests");
    let _ = delegate.stdout().close();
    delegate.finished(true);

    println!("== image from metadata");
    if let Some(get) = request.get_plan.as_get() {
        let evaluated = json!({"repository": "my-org/builder", "tag": "latest", "password": "s3cr3t-pass"});
        if let Some(source) = evaluated.as_object() {
            let version: Version = [("digest".to_string(), "sha256:9d2a77e1".to_string())].into();
            if let Err(err) = configs.set_latest_version(&get.type_, source, version) {
                eprintln!("cannot seed resource version: {err}");
            }
        }
    }
    let mut native = factory.deps().clone();
    native.config.native_image_fetch_enabled = true;
    let delegate = DelegateFactory::new(native).delegate_for(&task, state.clone());
    match delegate.fetch_image(&request, &CancelToken::new()) {
        Ok(image) => println!("   {:?}", image.spec),
        Err(err) => eprintln!("image resolution failed: {err}"),
    }

    println!("== across");
    let across: Plan = match serde_json::from_value(json!({
        "id": "2",
        "across": {
            "vars": [{"var": "go", "values": ["1.22", "1.23"]}],
            "substep_template": json!({
                "id": "t",
                "task": {"name": "test-go-((.:go))"}
            }).to_string()
        }
    })) {
        Ok(plan) => plan,
        Err(err) => {
            eprintln!("invalid demo plan: {err}");
            return ExitCode::FAILURE;
        }
    };
    if let PlanStep::Across(plan) = &across.step {
        let delegate = factory.delegate_for(&across, state);
        match delegate.construct_across_substeps(plan.substep_template.as_bytes(), &plan.var_names(), &plan.combinations())
        {
            Ok(substeps) => {
                for s in substeps {
                    println!("   {} {}", s.plan.id, s.plan.public());
                }
            }
            Err(err) => eprintln!("across expansion failed: {err}"),
        }
    }

    println!("== events");
    for ev in build.events() {
        match &ev.kind {
            BuildEventKind::Log { stream, payload } => println!("   #{} {} log/{:?} {:?}", ev.seq, ev.origin, stream, payload),
            kind => println!("   #{} {} {}", ev.seq, ev.origin, kind.name()),
        }
    }
    println!("== image versions used: {}", build.image_resource_versions().len());
    ExitCode::SUCCESS
}
