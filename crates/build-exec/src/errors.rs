use build_core::{PlanId, RunError, StoreError, TemplateError};
use build_policies::PolicyError;
use thiserror::Error;

/// Errores de contratos de recursos (configs, scopes y caches).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResourceError {
    #[error("resource backend unavailable: {0}")]
    Unavailable(String),
    #[error("resource config not found for type '{0}'")]
    ConfigNotFound(String),
}

/// Errores que un delegate devuelve al ejecutor del step.
///
/// Los fallos al persistir eventos de ciclo de vida nunca llegan aquí: se
/// loguean y se descartan.
#[derive(Debug, Error)]
pub enum DelegateError {
    #[error(transparent)]
    Policy(#[from] PolicyError),
    #[error("image plan {0} is not a get step")]
    NotAGetPlan(PlanId),
    #[error("run image check plan: {0}")]
    ImageCheckRun(#[source] RunError),
    #[error("image check failed")]
    ImageCheckFailed,
    #[error("run image get plan: {0}")]
    ImageGetRun(#[source] RunError),
    #[error("image fetching failed")]
    ImageFetchFailed,
    #[error("get did not return a result")]
    MissingGetResult,
    #[error("image artifact '{0}' was not registered")]
    MissingImageArtifact(String),
    #[error("save image resource version: {0}")]
    SaveImageVersion(#[source] StoreError),
    #[error("image resource cache: {0}")]
    ImageResourceCache(#[source] ResourceError),
    #[error("evaluate image params: {0}")]
    ImageParams(#[source] TemplateError),
    #[error("image resolution cancelled")]
    Cancelled,
    #[error("across template: {0}")]
    AcrossTemplate(#[source] TemplateError),
    #[error("across substep {index}: expected {expected} values, got {got}")]
    AcrossArity { index: usize, expected: usize, got: usize },
    #[error("across substep {index}: {source}")]
    AcrossSubstep { index: usize, source: TemplateError },
}
