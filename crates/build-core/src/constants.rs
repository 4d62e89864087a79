//! Constantes compartidas por el core.

/// Texto que reemplaza cualquier secreto conocido en output observable.
pub const REDACTED_PLACEHOLDER: &str = "((redacted))";

/// Tipo de recurso cuyas imágenes se pueden referenciar por URL docker.
pub const REGISTRY_IMAGE_TYPE: &str = "registry-image";

/// Fuente de las variables locales (`((.:name))`), ligadas por across y
/// load_var en lugar de un credential manager.
pub const LOCAL_VAR_SOURCE: &str = ".";
