use std::time::Duration;

/// Configuración de los delegates de un build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegateConfig {
    /// Habilita la resolución de imágenes `registry-image` desde metadatos,
    /// sin ejecutar los planes de check/get.
    pub native_image_fetch_enabled: bool,
    /// Redacta valores de credenciales en el output de los steps.
    pub redact_secrets: bool,
    /// Tiempo máximo que el output parcial (sin fin de línea) queda en buffer.
    pub output_flush_interval: Duration,
    /// Aparece en cada input enviado al motor de políticas.
    pub cluster_name: String,
}

impl Default for DelegateConfig {
    fn default() -> Self {
        Self { native_image_fetch_enabled: false,
               redact_secrets: true,
               output_flush_interval: Duration::from_secs(1),
               cluster_name: "buildflow".to_string() }
    }
}
