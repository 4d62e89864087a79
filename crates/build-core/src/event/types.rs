//! Tipos de evento del build y estructura `BuildEvent`.
//!
//! Rol en el flujo:
//! - Cada delegate de step emite eventos a un `EventStore` append-only.
//! - La API de logs y la UI los consumen por `build_id`, en orden de `seq`.
//! - `BuildEventKind` es el único formato "de cable" de este core: cambiar
//!   nombres o campos rompe a los consumidores.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::plan::PlanId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStream {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum BuildEventKind {
    Initialize,
    Start,
    Finish { succeeded: bool },
    /// Output ya redactado de un step.
    Log { stream: LogStream, payload: String },
    /// Error no terminal reportado por el step.
    Error { message: String },
    /// Check de la imagen del step (forma pública del plan).
    ImageCheck { plan: Value },
    /// Get de la imagen del step (forma pública del plan).
    ImageGet { plan: Value },
    WaitingForWorker,
    SelectedWorker { worker: String },
    StreamingVolume { volume: String, source_worker: String, dest_worker: String },
    WaitingForStreamedVolume { volume: String, dest_worker: String },
    /// Sub-planes concretos de un step across, en orden de combinación.
    AcrossSubsteps { substeps: Vec<Value> },
}

impl BuildEventKind {
    /// Nombre estable del evento (igual al tag serializado).
    pub fn name(&self) -> &'static str {
        match self {
            BuildEventKind::Initialize => "initialize",
            BuildEventKind::Start => "start",
            BuildEventKind::Finish { .. } => "finish",
            BuildEventKind::Log { .. } => "log",
            BuildEventKind::Error { .. } => "error",
            BuildEventKind::ImageCheck { .. } => "image-check",
            BuildEventKind::ImageGet { .. } => "image-get",
            BuildEventKind::WaitingForWorker => "waiting-for-worker",
            BuildEventKind::SelectedWorker { .. } => "selected-worker",
            BuildEventKind::StreamingVolume { .. } => "streaming-volume",
            BuildEventKind::WaitingForStreamedVolume { .. } => "waiting-for-streamed-volume",
            BuildEventKind::AcrossSubsteps { .. } => "across-substeps",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildEvent {
    pub seq: u64, // asignado por el EventStore (orden append)
    pub build_id: Uuid,
    /// Plan que originó el evento.
    pub origin: PlanId,
    pub time: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: BuildEventKind,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kind_serializes_with_event_tag() {
        let kind = BuildEventKind::Log { stream: LogStream::Stderr, payload: "boom\n".into() };
        let v = serde_json::to_value(&kind).unwrap();
        assert_eq!(v, json!({"event": "log", "data": {"stream": "stderr", "payload": "boom\n"}}));
        assert_eq!(kind.name(), v["event"]);
    }

    #[test]
    fn unit_kinds_roundtrip() {
        let v = serde_json::to_value(&BuildEventKind::WaitingForWorker).unwrap();
        assert_eq!(v["event"], "waiting-for-worker");
        let back: BuildEventKind = serde_json::from_value(v).unwrap();
        assert_eq!(back, BuildEventKind::WaitingForWorker);
    }
}
