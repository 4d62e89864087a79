//! Expansión de steps `across` en sub-planes concretos.

use std::collections::HashMap;

use build_core::vars::{template, Resolve};
use build_core::{BuildEventKind, Plan, PlanId, TemplateError};
use log::debug;
use serde_json::Value;

use crate::delegate::BuildStepDelegate;
use crate::errors::DelegateError;

/// Un sub-plan del across y los valores con que se interpoló.
#[derive(Debug, Clone, PartialEq)]
pub struct AcrossSubstep {
    pub values: Vec<Value>,
    pub plan: Plan,
}

impl BuildStepDelegate {
    /// Instancia `template` una vez por combinación.
    ///
    /// Cada combinación se liga en un scope local nuevo y sólo se resuelven
    /// las referencias `((.:var))`; las credenciales se evalúan al ejecutar.
    /// Los ids del sub-plan `i` pasan a ser `<id del across>/<i>/<n>`, con
    /// `n` el orden pre-orden del nodo, y las referencias internas
    /// (`version_from`) se remapean a los ids nuevos. Emite un único evento
    /// `AcrossSubsteps` con la forma pública de todos los sub-planes.
    pub fn construct_across_substeps(&self,
                                     template: &[u8],
                                     var_names: &[String],
                                     combinations: &[Vec<Value>])
                                     -> Result<Vec<AcrossSubstep>, DelegateError> {
        let template: Value =
            serde_json::from_slice(template).map_err(|e| DelegateError::AcrossTemplate(TemplateError::Parse(e)))?;

        let mut substeps = Vec::with_capacity(combinations.len());
        for (index, values) in combinations.iter().enumerate() {
            if values.len() != var_names.len() {
                return Err(DelegateError::AcrossArity { index,
                                                        expected: var_names.len(),
                                                        got: values.len() });
            }

            let scope = self.state.vars().new_local_scope();
            for (name, value) in var_names.iter().zip(values) {
                scope.bind(name.clone(), value.clone());
            }

            let interpolated = template::evaluate(&template, &scope, Resolve::LocalOnly)
                .map_err(|source| DelegateError::AcrossSubstep { index, source })?;
            let mut plan: Plan = serde_json::from_value(interpolated)
                .map_err(|e| DelegateError::AcrossSubstep { index, source: TemplateError::Decode(e) })?;
            remap_plan_ids(&mut plan, &self.plan_id, index);

            substeps.push(AcrossSubstep { values: values.clone(), plan });
        }

        debug!("across {} expanded into {} substeps", self.plan_id, substeps.len());
        self.save_event(BuildEventKind::AcrossSubsteps { substeps: substeps.iter().map(|s| s.plan.public()).collect() });
        Ok(substeps)
    }
}

fn remap_plan_ids(plan: &mut Plan, parent: &PlanId, substep: usize) {
    let mut mapping: HashMap<PlanId, PlanId> = HashMap::new();
    let mut node = 0;
    plan.each_mut(&mut |p| {
            let fresh = parent.substep_node(substep, node);
            node += 1;
            let old = std::mem::replace(p.plan_id_fields_mut().id, fresh.clone());
            mapping.insert(old, fresh);
        });

    plan.each_mut(&mut |p| {
            for reference in p.plan_id_fields_mut().references {
                if let Some(fresh) = mapping.get(&*reference) {
                    *reference = fresh.clone();
                }
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn remap_rewrites_ids_and_references() {
        let mut plan: Plan = serde_json::from_value(json!({
            "id": "10",
            "do": [
                {"id": "11", "check": {"name": "img", "type": "registry-image", "source": {}}},
                {"id": "12", "get": {"name": "img", "type": "registry-image", "version_from": "11"}}
            ]
        })).unwrap();
        remap_plan_ids(&mut plan, &PlanId::new("7"), 2);

        let mut ids = vec![];
        plan.each(&mut |p| ids.push(p.id.to_string()));
        assert_eq!(ids, vec!["7/2/0", "7/2/1", "7/2/2"]);

        let mut refs = vec![];
        plan.each(&mut |p| {
                if let Some(get) = p.as_get() {
                    refs.extend(get.version_from.clone());
                }
            });
        assert_eq!(refs, vec![PlanId::new("7/2/1")]);
    }
}
