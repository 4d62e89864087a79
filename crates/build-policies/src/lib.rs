//! build-policies – gate de políticas para acciones privilegiadas.
//!
//! Provee el contrato con el motor de políticas externo (`PolicyAgent`), el
//! filtro que decide qué acciones se evalúan (`PolicyChecker`) y la
//! traducción del resultado a un veredicto: permitir, advertir (soft) o
//! bloquear (hard).
//!
//! Este crate no redacta ni emite eventos: quien llama (el delegate del
//! step) redacta el input antes de `check` y decide cómo reportar un
//! `Verdict::SoftDenied`.

use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Acción evaluada antes de usar una imagen provista por el usuario.
pub const ACTION_USE_IMAGE: &str = "UseImage";

/// Nombre del servicio que aparece en cada input de política.
pub const POLICY_SERVICE: &str = "buildflow";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// El motor de políticas no respondió. Siempre fatal.
    #[error("policy engine unreachable: {0}")]
    Transport(String),
    /// Denegación con enforcement bloqueante.
    #[error("policy check failed: {}", .messages.join(", "))]
    Blocked { messages: Vec<String> },
}

/// Input enviado al motor. `data` ya debe venir redactado.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyCheckInput {
    pub service: String,
    pub cluster_name: String,
    pub action: String,
    pub team: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<String>,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyCheckResult {
    pub allowed: bool,
    pub should_block: bool,
    #[serde(default)]
    pub messages: Vec<String>,
}

impl PolicyCheckResult {
    pub fn allow() -> Self {
        Self { allowed: true, should_block: false, messages: vec![] }
    }

    pub fn deny(should_block: bool, messages: Vec<String>) -> Self {
        Self { allowed: false, should_block, messages }
    }

    pub fn allowed(&self) -> bool {
        self.allowed
    }

    pub fn should_block(&self) -> bool {
        self.should_block
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn verdict(&self) -> Verdict {
        match (self.allowed, self.should_block) {
            (true, _) => Verdict::Allowed,
            (false, true) => Verdict::HardDenied { messages: self.messages.clone() },
            (false, false) => Verdict::SoftDenied { messages: self.messages.clone() },
        }
    }
}

/// Decisión final sobre una acción.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allowed,
    /// No permitido, pero el enforcement es soft: se advierte y se continúa.
    SoftDenied { messages: Vec<String> },
    HardDenied { messages: Vec<String> },
}

impl Verdict {
    /// `Err(Blocked)` sólo para una denegación bloqueante.
    pub fn enforce(self) -> Result<Verdict, PolicyError> {
        match self {
            Verdict::HardDenied { messages } => Err(PolicyError::Blocked { messages }),
            other => Ok(other),
        }
    }
}

/// Motor de políticas externo (OPA u otro).
pub trait PolicyAgent: Send + Sync {
    fn check(&self, input: &PolicyCheckInput) -> Result<PolicyCheckResult, PolicyError>;
}

/// Lo que ven los delegates.
pub trait PolicyChecker: Send + Sync {
    /// `false` cuando el despliegue no evalúa esta clase de acción.
    fn should_check_action(&self, action: &str) -> bool;
    fn check(&self, input: &PolicyCheckInput) -> Result<PolicyCheckResult, PolicyError>;
}

/// Evalúa sólo las acciones configuradas, delegando en un `PolicyAgent`.
pub struct FilteredPolicyChecker {
    agent: Arc<dyn PolicyAgent>,
    actions: Vec<String>,
}

impl FilteredPolicyChecker {
    pub fn new(agent: Arc<dyn PolicyAgent>, actions: Vec<String>) -> Self {
        Self { agent, actions }
    }
}

impl PolicyChecker for FilteredPolicyChecker {
    fn should_check_action(&self, action: &str) -> bool {
        self.actions.iter().any(|a| a.eq_ignore_ascii_case(action))
    }

    fn check(&self, input: &PolicyCheckInput) -> Result<PolicyCheckResult, PolicyError> {
        debug!("policy check action={} team={}", input.action, input.team);
        self.agent.check(input)
    }
}

/// Checker para despliegues sin motor de políticas.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPolicyChecker;

impl PolicyChecker for NoopPolicyChecker {
    fn should_check_action(&self, _action: &str) -> bool {
        false
    }

    fn check(&self, _input: &PolicyCheckInput) -> Result<PolicyCheckResult, PolicyError> {
        Ok(PolicyCheckResult::allow())
    }
}
