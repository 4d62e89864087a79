use serde_json::{json, Map, Value};

use super::steps::{Plan, PlanStep};

impl Plan {
    /// Forma pública del plan para eventos y la UI.
    ///
    /// Omite `source`, `params`, `vars` y configs de task: cualquiera puede
    /// contener credenciales ya interpoladas.
    pub fn public(&self) -> Value {
        let mut out = Map::new();
        out.insert("id".into(), json!(self.id));
        let (key, body) = match &self.step {
            PlanStep::Get(get) => ("get",
                                   json!({
                                       "name": get.name,
                                       "type": get.type_,
                                       "resource": get.resource,
                                       "version": get.version,
                                   })),
            PlanStep::Put(put) => ("put",
                                   json!({
                                       "name": put.name,
                                       "type": put.type_,
                                       "resource": put.resource,
                                   })),
            PlanStep::Task(task) => ("task", json!({ "name": task.name, "privileged": task.privileged })),
            PlanStep::Check(check) => ("check",
                                       json!({
                                           "name": check.name,
                                           "type": check.type_,
                                           "resource": check.resource,
                                       })),
            PlanStep::SetPipeline(sp) => ("set_pipeline", json!({ "name": sp.name, "team": sp.team })),
            PlanStep::Do(steps) => ("do", Value::Array(steps.iter().map(Plan::public).collect())),
            PlanStep::InParallel(par) => ("in_parallel",
                                          json!({
                                              "steps": par.steps.iter().map(Plan::public).collect::<Vec<_>>(),
                                              "limit": par.limit,
                                              "fail_fast": par.fail_fast,
                                          })),
            PlanStep::Across(across) => {
                let vars: Vec<Value> = across.vars
                                             .iter()
                                             .map(|v| json!({ "name": v.var, "max_in_flight": v.max_in_flight }))
                                             .collect();
                ("across", json!({ "vars": vars, "fail_fast": across.fail_fast }))
            }
            PlanStep::OnSuccess(hook) => ("on_success", json!({ "step": hook.step.public(), "on_success": hook.next.public() })),
            PlanStep::OnFailure(hook) => ("on_failure", json!({ "step": hook.step.public(), "on_failure": hook.next.public() })),
            PlanStep::OnError(hook) => ("on_error", json!({ "step": hook.step.public(), "on_error": hook.next.public() })),
            PlanStep::Ensure(hook) => ("ensure", json!({ "step": hook.step.public(), "ensure": hook.next.public() })),
            PlanStep::Try(step) => ("try", json!({ "step": step.public() })),
            PlanStep::Retry(steps) => ("retry", Value::Array(steps.iter().map(Plan::public).collect())),
        };
        out.insert(key.into(), body);
        Value::Object(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_get_hides_source_and_params() {
        let plan: Plan = serde_json::from_value(json!({
            "id": "img",
            "get": {
                "name": "image",
                "type": "registry-image",
                "source": {"repository": "my-org/img", "password": "hunter22"},
                "params": {"format": "oci"},
                "version": {"digest": "sha256:abc123"}
            }
        })).unwrap();
        let public = plan.public();
        assert_eq!(public["id"], "img");
        assert_eq!(public["get"]["type"], "registry-image");
        assert_eq!(public["get"]["version"]["digest"], "sha256:abc123");
        assert!(!public.to_string().contains("hunter22"));
        assert!(public["get"].get("params").is_none());
    }

    #[test]
    fn public_recurses_into_containers() {
        let plan: Plan = serde_json::from_value(json!({
            "id": "1",
            "do": [{"id": "2", "task": {"name": "build", "config": {"run": {"path": "make"}}}}]
        })).unwrap();
        let public = plan.public();
        assert_eq!(public["do"][0]["task"]["name"], "build");
        assert!(public["do"][0]["task"].get("config").is_none());
    }
}
