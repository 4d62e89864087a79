//! Plan compilado de un build.
//!
//! Un `Plan` es un nodo del árbol de steps: un `PlanId` único dentro del build
//! y un `PlanStep` con la configuración del step. El árbol es inmutable una
//! vez compilado; la única excepción son los sub-planes que genera un step
//! across, que se construyen nuevos a partir de un template serializado.

mod id;
mod public;
mod steps;
mod walk;

pub use id::PlanId;
pub use steps::{AcrossPlan, AcrossVar, CheckPlan, GetPlan, HookPlan, ImagePlans, InParallelPlan, Params, Plan, PlanStep,
                PutPlan, SetPipelinePlan, Source, TaskPlan, TypeImage};
pub use walk::PlanIdFields;
