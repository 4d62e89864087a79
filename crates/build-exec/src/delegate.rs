//! Delegate de un step: puente entre el ejecutor del step y el build.
//!
//! Un delegate por step en ejecución. Reporta el ciclo de vida como eventos,
//! provee los sinks de output, y resuelve imágenes y substeps de across.
//! Los errores al guardar eventos de ciclo de vida se loguean y se descartan:
//! el resultado del step no depende de la persistencia de esos eventos.

use std::sync::{Arc, OnceLock};

use build_core::{Build, BuildEventKind, ContainerOwner, LogStream, PlanId, PlanStep, Redactor, RunState};
use build_policies::PolicyChecker;
use log::{debug, error};

use crate::clock::Clock;
use crate::config::DelegateConfig;
use crate::output::{LogSink, SharedSink};
use crate::resource::ResourceServices;

/// Clase de step que atiende un delegate. Sólo afecta logs y diagnóstico.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Get,
    Put,
    Task,
    Check,
    SetPipeline,
    Across,
    Other,
}

impl StepKind {
    pub fn of(step: &PlanStep) -> Self {
        match step {
            PlanStep::Get(_) => StepKind::Get,
            PlanStep::Put(_) => StepKind::Put,
            PlanStep::Task(_) => StepKind::Task,
            PlanStep::Check(_) => StepKind::Check,
            PlanStep::SetPipeline(_) => StepKind::SetPipeline,
            PlanStep::Across(_) => StepKind::Across,
            _ => StepKind::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::Get => "get",
            StepKind::Put => "put",
            StepKind::Task => "task",
            StepKind::Check => "check",
            StepKind::SetPipeline => "set_pipeline",
            StepKind::Across => "across",
            StepKind::Other => "step",
        }
    }
}

/// Colaboradores compartidos por todos los delegates de un build.
#[derive(Clone)]
pub struct DelegateDeps {
    pub build: Arc<dyn Build>,
    pub clock: Arc<dyn Clock>,
    pub policy: Arc<dyn PolicyChecker>,
    /// `None` deshabilita el camino rápido de imágenes.
    pub resources: Option<ResourceServices>,
    pub config: DelegateConfig,
}

pub struct BuildStepDelegate {
    pub(crate) kind: StepKind,
    pub(crate) plan_id: PlanId,
    pub(crate) state: RunState,
    pub(crate) deps: DelegateDeps,
    stdout: OnceLock<SharedSink>,
    stderr: OnceLock<SharedSink>,
}

impl BuildStepDelegate {
    pub fn new(kind: StepKind, plan_id: PlanId, state: RunState, deps: DelegateDeps) -> Self {
        Self { kind,
               plan_id,
               state,
               deps,
               stdout: OnceLock::new(),
               stderr: OnceLock::new() }
    }

    pub fn kind(&self) -> StepKind {
        self.kind
    }

    pub fn plan_id(&self) -> &PlanId {
        &self.plan_id
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn initializing(&self) {
        self.save_event(BuildEventKind::Initialize);
    }

    pub fn starting(&self) {
        self.save_event(BuildEventKind::Start);
    }

    pub fn finished(&self, succeeded: bool) {
        self.save_event(BuildEventKind::Finish { succeeded });
        debug!("{} {} finished succeeded={}", self.kind.as_str(), self.plan_id, succeeded);
    }

    pub fn errored(&self, message: impl Into<String>) {
        self.save_event(BuildEventKind::Error { message: message.into() });
    }

    pub fn waiting_for_worker(&self) {
        self.save_event(BuildEventKind::WaitingForWorker);
    }

    pub fn selected_worker(&self, worker: impl Into<String>) {
        self.save_event(BuildEventKind::SelectedWorker { worker: worker.into() });
    }

    pub fn streaming_volume(&self, volume: impl Into<String>, source_worker: impl Into<String>, dest_worker: impl Into<String>) {
        self.save_event(BuildEventKind::StreamingVolume { volume: volume.into(),
                                                          source_worker: source_worker.into(),
                                                          dest_worker: dest_worker.into() });
    }

    pub fn waiting_for_streamed_volume(&self, volume: impl Into<String>, dest_worker: impl Into<String>) {
        self.save_event(BuildEventKind::WaitingForStreamedVolume { volume: volume.into(),
                                                                   dest_worker: dest_worker.into() });
    }

    /// Sink de stdout del step. Siempre devuelve el mismo sink.
    pub fn stdout(&self) -> &SharedSink {
        self.stdout.get_or_init(|| self.new_sink(LogStream::Stdout))
    }

    /// Sink de stderr del step. Siempre devuelve el mismo sink.
    pub fn stderr(&self) -> &SharedSink {
        self.stderr.get_or_init(|| self.new_sink(LogStream::Stderr))
    }

    pub fn container_owner(&self, plan_id: &PlanId) -> ContainerOwner {
        self.deps.build.container_owner(plan_id)
    }

    /// Redactor de output, o `None` si la redacción está deshabilitada.
    pub fn redactor(&self) -> Option<Redactor> {
        self.deps.config.redact_secrets.then(|| self.secret_redactor())
    }

    /// Redactor incondicional, para datos que salen del build (políticas).
    pub(crate) fn secret_redactor(&self) -> Redactor {
        Redactor::new(Arc::clone(self.state.vars().tracker()))
    }

    pub(crate) fn save_event(&self, kind: BuildEventKind) {
        let name = kind.name();
        if let Err(err) = self.deps.build.save_event(&self.plan_id, self.deps.clock.now(), kind) {
            error!("failed to save {} event build={} {}={}: {}",
                   name,
                   self.deps.build.id(),
                   self.kind.as_str(),
                   self.plan_id,
                   err);
        }
    }

    fn new_sink(&self, stream: LogStream) -> SharedSink {
        SharedSink::new(LogSink::new(Arc::clone(&self.deps.build),
                                     self.plan_id.clone(),
                                     stream,
                                     Arc::clone(&self.deps.clock),
                                     self.redactor(),
                                     self.deps.config.output_flush_interval))
    }
}

impl std::fmt::Debug for BuildStepDelegate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildStepDelegate")
         .field("kind", &self.kind)
         .field("plan_id", &self.plan_id)
         .finish_non_exhaustive()
    }
}
