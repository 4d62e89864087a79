//! Errores del core.

use thiserror::Error;

/// Fallas del store de eventos o de procedencia del build.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store lock poisoned")]
    Poisoned,
}

/// Fallas al resolver una referencia de variable.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum VarError {
    #[error("invalid var reference '{0}'")]
    InvalidReference(String),
    #[error("undefined var: {0}")]
    Undefined(String),
    #[error("var '{reference}' has no field '{field}'")]
    MissingField { reference: String, field: String },
    #[error("credential lookup for '{reference}' failed: {reason}")]
    Credential { reference: String, reason: String },
}

/// Fallas al evaluar un template con placeholders `((ref))`.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error(transparent)]
    Var(#[from] VarError),
    #[error("template is not valid JSON: {0}")]
    Parse(serde_json::Error),
    #[error("interpolated template is not a valid plan: {0}")]
    Decode(serde_json::Error),
}

/// Resultado fallido de ejecutar un sub-plan a través del `PlanRunner`.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum RunError {
    #[error("execution cancelled")]
    Cancelled,
    #[error("{0}")]
    Failed(String),
}
