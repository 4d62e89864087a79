//! build-exec: delegates de steps.
//!
//! Cada step en ejecución recibe un `BuildStepDelegate` que:
//! - reporta su ciclo de vida como eventos del build,
//! - convierte su output en eventos `Log` redactados (`output`),
//! - resuelve su imagen pasando por el gate de políticas (`image`, `policy`),
//! - expande steps `across` en sub-planes con ids únicos (`across`).

pub mod across;
pub mod clock;
pub mod config;
pub mod delegate;
pub mod errors;
pub mod factory;
pub mod image;
pub mod output;
mod policy;
pub mod resource;

pub use across::AcrossSubstep;
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::DelegateConfig;
pub use delegate::{BuildStepDelegate, DelegateDeps, StepKind};
pub use errors::{DelegateError, ResourceError};
pub use factory::DelegateFactory;
pub use image::{registry_image_url, FetchedImage, ImageRequest, ImageSpec};
pub use output::{LogSink, SharedSink};
pub use resource::{CacheUser, InMemoryResourceCaches, InMemoryResourceConfigs, ResourceCacheFactory, ResourceConfig,
                   ResourceConfigFactory, ResourceConfigScope, ResourceServices};
