//! Recorrido del árbol de planes.
//!
//! `each`/`each_mut` visitan cada nodo exactamente una vez en pre-orden,
//! incluyendo los planes anidados de imágenes (type images e imágenes de
//! task). Los templates de across no se recorren: son texto hasta que se
//! expanden.

use super::steps::{AcrossPlan, AcrossVar, CheckPlan, GetPlan, HookPlan, ImagePlans, InParallelPlan, Plan, PlanStep,
                   PutPlan, SetPipelinePlan, TaskPlan, TypeImage};
use super::PlanId;

/// Campos de tipo `PlanId` de un nodo: su propio id y las referencias a
/// otros nodos.
pub struct PlanIdFields<'a> {
    pub id: &'a mut PlanId,
    pub references: Vec<&'a mut PlanId>,
}

impl Plan {
    pub fn each(&self, f: &mut impl FnMut(&Plan)) {
        f(self);
        for child in self.children() {
            child.each(f);
        }
    }

    pub fn each_mut(&mut self, f: &mut impl FnMut(&mut Plan)) {
        f(self);
        for child in self.children_mut() {
            child.each_mut(f);
        }
    }

    /// Cantidad de nodos del árbol (incluye este).
    pub fn node_count(&self) -> usize {
        let mut n = 0;
        self.each(&mut |_| n += 1);
        n
    }

    fn children(&self) -> Vec<&Plan> {
        match &self.step {
            PlanStep::Get(get) => type_image_plans(get.type_image.as_ref()),
            PlanStep::Put(put) => type_image_plans(put.type_image.as_ref()),
            PlanStep::Check(check) => type_image_plans(check.type_image.as_ref()),
            PlanStep::Task(task) => match &task.image {
                Some(ImagePlans { check, get }) => check.iter().map(|p| p.as_ref()).chain(std::iter::once(get.as_ref())).collect(),
                None => vec![],
            },
            PlanStep::SetPipeline(_) | PlanStep::Across(_) => vec![],
            PlanStep::Do(steps) | PlanStep::Retry(steps) => steps.iter().collect(),
            PlanStep::InParallel(par) => par.steps.iter().collect(),
            PlanStep::OnSuccess(hook) | PlanStep::OnFailure(hook) | PlanStep::OnError(hook) | PlanStep::Ensure(hook) => {
                vec![hook.step.as_ref(), hook.next.as_ref()]
            }
            PlanStep::Try(step) => vec![step.as_ref()],
        }
    }

    fn children_mut(&mut self) -> Vec<&mut Plan> {
        match &mut self.step {
            PlanStep::Get(get) => type_image_plans_mut(get.type_image.as_mut()),
            PlanStep::Put(put) => type_image_plans_mut(put.type_image.as_mut()),
            PlanStep::Check(check) => type_image_plans_mut(check.type_image.as_mut()),
            PlanStep::Task(task) => match &mut task.image {
                Some(ImagePlans { check, get }) => {
                    check.iter_mut().map(|p| p.as_mut()).chain(std::iter::once(get.as_mut())).collect()
                }
                None => vec![],
            },
            PlanStep::SetPipeline(_) | PlanStep::Across(_) => vec![],
            PlanStep::Do(steps) | PlanStep::Retry(steps) => steps.iter_mut().collect(),
            PlanStep::InParallel(par) => par.steps.iter_mut().collect(),
            PlanStep::OnSuccess(hook) | PlanStep::OnFailure(hook) | PlanStep::OnError(hook) | PlanStep::Ensure(hook) => {
                let HookPlan { step, next } = hook;
                vec![step.as_mut(), next.as_mut()]
            }
            PlanStep::Try(step) => vec![step.as_mut()],
        }
    }

    /// Todos los campos `PlanId` de este nodo (no de sus hijos).
    ///
    /// Los patrones enumeran cada campo sin `..`: agregar un campo a un step
    /// obliga a decidir aquí si es una referencia a otro plan.
    pub fn plan_id_fields_mut(&mut self) -> PlanIdFields<'_> {
        let Plan { id, step } = self;
        let references: Vec<&mut PlanId> = match step {
            PlanStep::Get(GetPlan { name: _,
                                    type_: _,
                                    resource: _,
                                    source: _,
                                    params: _,
                                    version: _,
                                    version_from,
                                    produces: _,
                                    type_image: _ }) => version_from.iter_mut().collect(),
            PlanStep::Put(PutPlan { name: _,
                                    type_: _,
                                    resource: _,
                                    source: _,
                                    params: _,
                                    inputs: _,
                                    type_image: _ }) => vec![],
            PlanStep::Task(TaskPlan { name: _,
                                      privileged: _,
                                      config_path: _,
                                      config: _,
                                      image_artifact_name: _,
                                      image: _ }) => vec![],
            PlanStep::Check(CheckPlan { name: _,
                                        type_: _,
                                        resource: _,
                                        source: _,
                                        from_version: _,
                                        type_image: _ }) => vec![],
            PlanStep::SetPipeline(SetPipelinePlan { name: _,
                                                    file: _,
                                                    team: _,
                                                    vars: _,
                                                    instance_vars: _ }) => vec![],
            PlanStep::InParallel(InParallelPlan { steps: _,
                                                  limit: _,
                                                  fail_fast: _ }) => vec![],
            PlanStep::Across(AcrossPlan { vars,
                                          substep_template: _,
                                          fail_fast: _ }) => {
                vars.iter().for_each(|AcrossVar { var: _, values: _, max_in_flight: _ }| {});
                vec![]
            }
            PlanStep::OnSuccess(HookPlan { step: _, next: _ })
            | PlanStep::OnFailure(HookPlan { step: _, next: _ })
            | PlanStep::OnError(HookPlan { step: _, next: _ })
            | PlanStep::Ensure(HookPlan { step: _, next: _ }) => vec![],
            // solo hijos, sin campos propios
            PlanStep::Do(_) | PlanStep::Try(_) | PlanStep::Retry(_) => vec![],
        };
        PlanIdFields { id, references }
    }
}

fn type_image_plans(image: Option<&TypeImage>) -> Vec<&Plan> {
    match image {
        Some(ti) => ti.check_plan.iter().chain(ti.get_plan.iter()).map(|p| p.as_ref()).collect(),
        None => vec![],
    }
}

fn type_image_plans_mut(image: Option<&mut TypeImage>) -> Vec<&mut Plan> {
    match image {
        Some(ti) => ti.check_plan.iter_mut().chain(ti.get_plan.iter_mut()).map(|p| p.as_mut()).collect(),
        None => vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tree() -> Plan {
        serde_json::from_value(json!({
            "id": "root",
            "on_success": {
                "step": {"id": "a", "do": [
                    {"id": "b", "get": {"name": "repo", "type": "git", "source": {}}},
                    {"id": "c", "task": {"name": "unit", "image": {
                        "check": {"id": "c-check", "check": {"name": "img", "type": "registry-image", "source": {}}},
                        "get": {"id": "c-get", "get": {"name": "img", "type": "registry-image", "source": {}, "version_from": "c-check"}}
                    }}}
                ]},
                "next": {"id": "d", "try": {"id": "e", "put": {"name": "out", "type": "s3", "source": {}}}}
            }
        })).unwrap()
    }

    #[test]
    fn each_visits_every_node_once_in_preorder() {
        let mut ids = vec![];
        tree().each(&mut |p| ids.push(p.id.to_string()));
        assert_eq!(ids, vec!["root", "a", "b", "c", "c-check", "c-get", "d", "e"]);
    }

    #[test]
    fn each_mut_can_rewrite_ids() {
        let mut plan = tree();
        plan.each_mut(&mut |p| p.id = PlanId::new(format!("x-{}", p.id)));
        let mut ids = vec![];
        plan.each(&mut |p| ids.push(p.id.to_string()));
        assert!(ids.iter().all(|id| id.starts_with("x-")));
        assert_eq!(plan.node_count(), 8);
    }

    #[test]
    fn only_get_carries_references() {
        let mut plan = tree();
        let mut refs = vec![];
        plan.each_mut(&mut |p| {
                for r in p.plan_id_fields_mut().references {
                    refs.push(r.to_string());
                }
            });
        assert_eq!(refs, vec!["c-check"]);
    }

    #[test]
    fn across_and_hooks_expose_only_their_own_id() {
        let mut across: Plan = serde_json::from_value(json!({
            "id": "5",
            "across": {
                "vars": [{"var": "version", "values": ["1.0"], "max_in_flight": 2}],
                "substep_template": "{\"id\": \"t\", \"get\": {\"name\": \"x\", \"type\": \"git\", \"source\": {}, \"version_from\": \"t0\"}}"
            }
        })).unwrap();
        let fields = across.plan_id_fields_mut();
        assert_eq!(fields.id.to_string(), "5");
        assert!(fields.references.is_empty());

        let mut hook = tree();
        let fields = hook.plan_id_fields_mut();
        assert_eq!(fields.id.to_string(), "root");
        assert!(fields.references.is_empty());
    }
}
