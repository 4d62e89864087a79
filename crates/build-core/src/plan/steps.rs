use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::PlanId;
use crate::resource::Version;

/// Configuración `source` de un recurso. Puede contener `((ref))` sin evaluar.
pub type Source = Map<String, Value>;
/// Parámetros de un get/put. Puede contener `((ref))` sin evaluar.
pub type Params = Map<String, Value>;

/// Nodo del plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: PlanId,
    #[serde(flatten)]
    pub step: PlanStep,
}

impl Plan {
    pub fn new(id: impl Into<PlanId>, step: PlanStep) -> Self {
        Self { id: id.into(), step }
    }

    /// El get plan contenido, si este nodo es un get.
    pub fn as_get(&self) -> Option<&GetPlan> {
        match &self.step {
            PlanStep::Get(get) => Some(get),
            _ => None,
        }
    }
}

/// Tipos de step soportados. Se serializa externamente etiquetado junto al
/// `id` del nodo: `{"id": "3", "get": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStep {
    Get(GetPlan),
    Put(PutPlan),
    Task(TaskPlan),
    Check(CheckPlan),
    SetPipeline(SetPipelinePlan),
    Do(Vec<Plan>),
    InParallel(InParallelPlan),
    Across(AcrossPlan),
    OnSuccess(HookPlan),
    OnFailure(HookPlan),
    OnError(HookPlan),
    Ensure(HookPlan),
    Try(Box<Plan>),
    Retry(Vec<Plan>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetPlan {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    #[serde(default)]
    pub source: Source,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub params: Params,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,
    /// Plan cuyo resultado provee la versión a traer (típicamente el check
    /// previo del mismo recurso).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_from: Option<PlanId>,
    /// Tipo de imagen que produce un resource type propio (p.ej. un tipo
    /// custom que entrega una imagen `registry-image`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub produces: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_image: Option<TypeImage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PutPlan {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    #[serde(default)]
    pub source: Source,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub params: Params,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_image: Option<TypeImage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskPlan {
    pub name: String,
    #[serde(default)]
    pub privileged: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
    /// Artifact ya registrado que se usa como imagen del task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_artifact_name: Option<String>,
    /// Planes para traer la imagen declarada en `image_resource`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImagePlans>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckPlan {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    #[serde(default)]
    pub source: Source,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_version: Option<Version>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_image: Option<TypeImage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetPipelinePlan {
    pub name: String,
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub vars: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub instance_vars: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InParallelPlan {
    pub steps: Vec<Plan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(default)]
    pub fail_fast: bool,
}

/// Step templado: se expande en un sub-plan por combinación de valores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcrossPlan {
    pub vars: Vec<AcrossVar>,
    /// Plan serializado (JSON) con placeholders `((.:var))`.
    pub substep_template: String,
    #[serde(default)]
    pub fail_fast: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcrossVar {
    pub var: String,
    pub values: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_in_flight: Option<usize>,
}

impl AcrossPlan {
    pub fn var_names(&self) -> Vec<String> {
        self.vars.iter().map(|v| v.var.clone()).collect()
    }

    /// Producto cartesiano de los valores, en el orden de declaración de las
    /// variables (la última varía más rápido).
    pub fn combinations(&self) -> Vec<Vec<Value>> {
        let mut combos: Vec<Vec<Value>> = vec![vec![]];
        for var in &self.vars {
            combos = combos.into_iter()
                           .flat_map(|prefix| {
                               var.values.iter().map(move |v| {
                                                    let mut next = prefix.clone();
                                                    next.push(v.clone());
                                                    next
                                                })
                           })
                           .collect();
        }
        combos
    }
}

/// Hooks `on_success`/`on_failure`/`on_error`/`ensure`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookPlan {
    pub step: Box<Plan>,
    pub next: Box<Plan>,
}

/// Cómo obtener la imagen de un resource type propio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeImage {
    pub base_type: String,
    #[serde(default)]
    pub privileged: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_plan: Option<Box<Plan>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get_plan: Option<Box<Plan>>,
}

/// Planes de check/get para la imagen de un task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagePlans {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check: Option<Box<Plan>>,
    pub get: Box<Plan>,
}
