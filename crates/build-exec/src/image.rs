//! Resolución de la imagen de un step.
//!
//! Dos caminos, ambos precedidos por el gate de políticas:
//! - metadatos: para imágenes `registry-image` con la feature habilitada,
//!   toma la última versión ya conocida del recurso sin ejecutar planes.
//!   Cualquier dato faltante vuelve, sin error, al camino de planes.
//! - planes: ejecuta check (opcional) y get en un scope hijo y toma el
//!   artifact que el get registró.

use build_core::constants::REGISTRY_IMAGE_TYPE;
use build_core::plan::{GetPlan, Source, TaskPlan, TypeImage};
use build_core::vars::{template, Resolve};
use build_core::{ArtifactHandle, BuildEventKind, CancelToken, GetResult, Plan, ResourceCache, RunError, Version};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::delegate::BuildStepDelegate;
use crate::errors::{DelegateError, ResourceError};
use crate::resource::{CacheUser, ResourceServices};

/// Planes que producen la imagen de un step.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRequest {
    pub check_plan: Option<Plan>,
    pub get_plan: Plan,
    pub privileged: bool,
}

impl ImageRequest {
    pub fn from_type_image(image: &TypeImage) -> Option<Self> {
        let get_plan = image.get_plan.as_deref()?.clone();
        Some(Self { check_plan: image.check_plan.as_deref().cloned(),
                    get_plan,
                    privileged: image.privileged })
    }

    pub fn from_task(task: &TaskPlan) -> Option<Self> {
        let plans = task.image.as_ref()?;
        Some(Self { check_plan: plans.check.as_deref().cloned(),
                    get_plan: plans.get.as_ref().clone(),
                    privileged: task.privileged })
    }
}

/// Cómo el runtime de contenedores obtiene la imagen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSpec {
    pub image_artifact: Option<ArtifactHandle>,
    /// `docker:///repo@digest` o `docker:///repo:tag`.
    pub image_url: Option<String>,
    pub resource_type: Option<String>,
    pub privileged: bool,
}

impl ImageSpec {
    /// Una imagen utilizable tiene artifact, URL o resource type.
    pub fn is_valid(&self) -> bool {
        self.image_artifact.is_some() || self.image_url.is_some() || self.resource_type.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchedImage {
    pub spec: ImageSpec,
    /// Cache de la versión usada, para encadenar configs de tipos custom.
    pub cache: Option<ResourceCache>,
}

/// Motivo para abandonar el camino de metadatos.
#[derive(Debug, Error)]
enum MetadataMiss {
    #[error("native image fetch disabled")]
    Disabled,
    #[error("image type '{0}' does not produce a registry image")]
    NotRegistryImage(String),
    #[error("evaluate image source: {0}")]
    Source(build_core::TemplateError),
    #[error("resource config: {0}")]
    Config(ResourceError),
    #[error("no version discovered yet")]
    NoVersion,
    #[error("source has no repository")]
    NoRepository,
}

impl BuildStepDelegate {
    /// Resuelve la imagen descrita por `request`.
    pub fn fetch_image(&self, request: &ImageRequest, cancel: &CancelToken) -> Result<FetchedImage, DelegateError> {
        let get = request.get_plan
                         .as_get()
                         .ok_or_else(|| DelegateError::NotAGetPlan(request.get_plan.id.clone()))?;

        self.check_image_policy(&get.type_, &get.source, request.privileged)?;

        match self.resolve_from_metadata(request, get) {
            Ok(found) => return self.finish_metadata_fetch(request, get, found),
            Err(miss) => debug!("image for {} resolved through plans: {}", self.plan_id, miss),
        }
        self.fetch_image_via_plans(request, get, cancel)
    }

    fn resolve_from_metadata(&self, request: &ImageRequest, get: &GetPlan) -> Result<MetadataHit, MetadataMiss> {
        let resources = match &self.deps.resources {
            Some(r) if self.deps.config.native_image_fetch_enabled => r,
            _ => return Err(MetadataMiss::Disabled),
        };
        if !produces_registry_image(get) {
            return Err(MetadataMiss::NotRegistryImage(get.type_.clone()));
        }

        let source = template::evaluate_map(&get.source, self.state.vars(), Resolve::All).map_err(MetadataMiss::Source)?;
        let config = resources.configs
                              .find_or_create_resource_config(&get.type_, &source, None)
                              .map_err(MetadataMiss::Config)?;
        let scope = config.find_or_create_scope(None).map_err(MetadataMiss::Config)?;
        let version = scope.latest_version().map_err(MetadataMiss::Config)?.ok_or(MetadataMiss::NoVersion)?;
        let url = registry_image_url(&source, &version).ok_or(MetadataMiss::NoRepository)?;
        debug!("image for {} resolved from metadata (privileged={})", self.plan_id, request.privileged);
        Ok(MetadataHit { resources: resources.clone(),
                         source,
                         version,
                         url })
    }

    fn finish_metadata_fetch(&self, request: &ImageRequest, get: &GetPlan, hit: MetadataHit)
                             -> Result<FetchedImage, DelegateError> {
        let params = template::evaluate_map(&get.params, self.state.vars(), Resolve::All).map_err(DelegateError::ImageParams)?;
        let cache = hit.resources
                       .caches
                       .find_or_create_resource_cache(CacheUser::Build(self.deps.build.id()),
                                                      &get.type_,
                                                      &hit.version,
                                                      &hit.source,
                                                      &params,
                                                      None)
                       .map_err(DelegateError::ImageResourceCache)?;
        self.deps.build.save_image_resource_version(&cache).map_err(DelegateError::SaveImageVersion)?;

        // ningún plan se ejecutó, pero la UI muestra los mismos pasos
        self.emit_image_events(request);

        info!("image for {} from metadata: {}", self.plan_id, hit.url);
        Ok(FetchedImage { spec: ImageSpec { image_artifact: None,
                                            image_url: Some(hit.url),
                                            resource_type: None,
                                            privileged: request.privileged },
                          cache: Some(cache) })
    }

    fn fetch_image_via_plans(&self, request: &ImageRequest, get: &GetPlan, cancel: &CancelToken)
                             -> Result<FetchedImage, DelegateError> {
        let child = self.state.new_local_scope();

        if let Some(check) = &request.check_plan {
            let ok = child.run(check, cancel).map_err(|e| run_error(e, DelegateError::ImageCheckRun))?;
            if !ok {
                return Err(DelegateError::ImageCheckFailed);
            }
        }

        let ok = child.run(&request.get_plan, cancel).map_err(|e| run_error(e, DelegateError::ImageGetRun))?;
        if !ok {
            return Err(DelegateError::ImageFetchFailed);
        }

        let result: GetResult = child.result(&request.get_plan.id).ok_or(DelegateError::MissingGetResult)?;
        if let Some(cache) = &result.resource_cache {
            self.deps.build.save_image_resource_version(cache).map_err(DelegateError::SaveImageVersion)?;
        }

        let artifact = child.artifacts()
                            .lookup(&get.name)
                            .ok_or_else(|| DelegateError::MissingImageArtifact(get.name.clone()))?;

        let image_url = match (&result.resource_cache, produces_registry_image(get)) {
            (Some(cache), true) => template::evaluate_map(&get.source, self.state.vars(), Resolve::All)
                .ok()
                .and_then(|source| registry_image_url(&source, cache.version())),
            _ => None,
        };
        let resource_type = image_url.is_none().then(|| get.type_.clone());

        self.emit_image_events(request);

        Ok(FetchedImage { spec: ImageSpec { image_artifact: Some(artifact.handle),
                                            image_url,
                                            resource_type,
                                            privileged: request.privileged },
                          cache: result.resource_cache })
    }

    fn emit_image_events(&self, request: &ImageRequest) {
        if let Some(check) = &request.check_plan {
            self.save_event(BuildEventKind::ImageCheck { plan: check.public() });
        }
        self.save_event(BuildEventKind::ImageGet { plan: request.get_plan.public() });
    }
}

struct MetadataHit {
    resources: ResourceServices,
    source: Source,
    version: Version,
    url: String,
}

fn run_error(err: RunError, wrap: fn(RunError) -> DelegateError) -> DelegateError {
    match err {
        RunError::Cancelled => DelegateError::Cancelled,
        other => wrap(other),
    }
}

fn produces_registry_image(get: &GetPlan) -> bool {
    get.type_ == REGISTRY_IMAGE_TYPE || get.produces.as_deref() == Some(REGISTRY_IMAGE_TYPE)
}

/// URL de la imagen para un source `registry-image` y su versión.
///
/// Preferencia: digest de la versión, digest del source, tag del source.
/// Sin `repository` no hay URL.
pub fn registry_image_url(source: &Source, version: &Version) -> Option<String> {
    let repository = source.get("repository").and_then(Value::as_str).filter(|r| !r.is_empty())?;
    let non_empty = |key: &str| source.get(key).and_then(Value::as_str).filter(|v| !v.is_empty());

    if let Some(digest) = version.get("digest").filter(|d| !d.is_empty()) {
        return Some(format!("docker:///{repository}@{digest}"));
    }
    if let Some(digest) = non_empty("digest") {
        return Some(format!("docker:///{repository}@{digest}"));
    }
    non_empty("tag").map(|tag| format!("docker:///{repository}:{tag}"))
}
