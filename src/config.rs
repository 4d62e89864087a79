//! Configuración de la aplicación desde variables de entorno.
//!
//! Carga `.env` una sola vez y traduce las variables `BUILDFLOW_*` a la
//! configuración de delegates y al filtro de políticas. Un valor inválido es
//! un error, nunca un default silencioso.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use build_exec::DelegateConfig;
use build_policies::{FilteredPolicyChecker, NoopPolicyChecker, PolicyAgent, PolicyChecker};
use dotenvy::dotenv;
use log::debug;
use once_cell::sync::Lazy;
use thiserror::Error;

pub const ENV_NATIVE_IMAGE_FETCH: &str = "BUILDFLOW_NATIVE_IMAGE_FETCH";
pub const ENV_REDACT_SECRETS: &str = "BUILDFLOW_REDACT_SECRETS";
pub const ENV_OUTPUT_FLUSH_INTERVAL_MS: &str = "BUILDFLOW_OUTPUT_FLUSH_INTERVAL_MS";
pub const ENV_POLICY_CHECK_ACTIONS: &str = "BUILDFLOW_POLICY_CHECK_ACTIONS";
pub const ENV_CLUSTER_NAME: &str = "BUILDFLOW_CLUSTER_NAME";

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    if dotenv().is_err() {
        debug!("no .env file loaded");
    }
});

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: expected a boolean, got '{value}'")]
    InvalidBool { var: &'static str, value: String },
    #[error("{var}: expected milliseconds, got '{value}'")]
    InvalidDuration { var: &'static str, value: String },
    #[error("{var} must not be empty")]
    Empty { var: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub delegate: DelegateConfig,
    /// Acciones que pasan por el motor de políticas. Vacío: ninguna.
    pub policy_check_actions: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self { delegate: DelegateConfig::default(),
               policy_check_actions: vec![] }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Lazy::force(&DOTENV_LOADED);
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Igual que `from_env`, leyendo de `lookup` en lugar del entorno.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();
        let d = &mut cfg.delegate;

        if let Some(v) = lookup(ENV_NATIVE_IMAGE_FETCH) {
            d.native_image_fetch_enabled = parse_bool(ENV_NATIVE_IMAGE_FETCH, &v)?;
        }
        if let Some(v) = lookup(ENV_REDACT_SECRETS) {
            d.redact_secrets = parse_bool(ENV_REDACT_SECRETS, &v)?;
        }
        if let Some(v) = lookup(ENV_OUTPUT_FLUSH_INTERVAL_MS) {
            let ms: u64 = v.trim()
                           .parse()
                           .map_err(|_| ConfigError::InvalidDuration { var: ENV_OUTPUT_FLUSH_INTERVAL_MS,
                                                                       value: v.clone() })?;
            d.output_flush_interval = Duration::from_millis(ms);
        }
        if let Some(v) = lookup(ENV_CLUSTER_NAME) {
            let name = v.trim();
            if name.is_empty() {
                return Err(ConfigError::Empty { var: ENV_CLUSTER_NAME });
            }
            d.cluster_name = name.to_string();
        }
        if let Some(v) = lookup(ENV_POLICY_CHECK_ACTIONS) {
            cfg.policy_check_actions = v.split(',')
                                        .map(str::trim)
                                        .filter(|a| !a.is_empty())
                                        .map(str::to_string)
                                        .collect();
        }
        Ok(cfg)
    }

    /// Checker según las acciones configuradas; sin acciones o sin motor no
    /// se evalúa nada.
    pub fn policy_checker(&self, agent: Option<Arc<dyn PolicyAgent>>) -> Arc<dyn PolicyChecker> {
        match agent {
            Some(agent) if !self.policy_check_actions.is_empty() => {
                Arc::new(FilteredPolicyChecker::new(agent, self.policy_check_actions.clone()))
            }
            _ => Arc::new(NoopPolicyChecker),
        }
    }
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool { var, value: value.to_string() }),
    }
}

/// Forzar carga temprana de .env desde aplicaciones externas si se desea.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}
