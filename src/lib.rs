//! buildflow: núcleo de ejecución de steps de un orquestador CI.
//!
//! Este crate agrupa los crates del workspace:
//! - `build_core`: planes, eventos, estado de ejecución, variables y redacción.
//! - `build_policies`: gate de políticas.
//! - `build_exec`: delegates de steps, resolución de imágenes y across.
//!
//! y agrega `config` para cargar la configuración desde el entorno.

pub mod config;

pub use build_core;
pub use build_exec;
pub use build_policies;

pub use config::{AppConfig, ConfigError};
