use std::io::Write;

use build_core::plan::Source;
use build_policies::{PolicyCheckInput, PolicyError, Verdict, ACTION_USE_IMAGE, POLICY_SERVICE};
use log::{error, warn};
use serde_json::{json, Value};

use crate::delegate::BuildStepDelegate;
use crate::errors::DelegateError;

const SOFT_ENFORCEMENT_WARNING: &str = "WARNING: unblocking from the policy check failure for soft enforcement";

impl BuildStepDelegate {
    /// Gate de política `UseImage` para una imagen provista por el usuario.
    ///
    /// El source se redacta siempre antes de salir hacia el motor. Una
    /// denegación soft escribe dos mensajes en stderr y continúa.
    pub fn check_image_policy(&self, image_type: &str, image_source: &Source, privileged: bool)
                              -> Result<(), DelegateError> {
        let checker = &self.deps.policy;
        if !checker.should_check_action(ACTION_USE_IMAGE) {
            return Ok(());
        }

        let source = self.secret_redactor().redact_value(&Value::Object(image_source.clone()));
        let build = &self.deps.build;
        let input = PolicyCheckInput { service: POLICY_SERVICE.to_string(),
                                       cluster_name: self.deps.config.cluster_name.clone(),
                                       action: ACTION_USE_IMAGE.to_string(),
                                       team: build.team_name().to_string(),
                                       pipeline: build.pipeline_name().map(str::to_string),
                                       data: json!({
                                           "image_type": image_type,
                                           "image_source": source,
                                           "privileged": privileged,
                                       }) };

        let result = checker.check(&input)?;
        if let Verdict::SoftDenied { messages } = result.verdict().enforce()? {
            warn!("soft policy denial for {} {}: {}", self.kind.as_str(), self.plan_id, messages.join(", "));
            let denial = PolicyError::Blocked { messages }.to_string();
            let mut stderr = self.stderr();
            let written = stderr.write_all(format!("\x1b[1;33m{denial}\x1b[0m\n\n").as_bytes())
                                .and_then(|_| {
                                    stderr.write_all(format!("\x1b[33m{SOFT_ENFORCEMENT_WARNING}\x1b[0m\n").as_bytes())
                                });
            if let Err(err) = written {
                error!("failed to report soft policy denial for {}: {}", self.plan_id, err);
            }
        }
        Ok(())
    }
}
