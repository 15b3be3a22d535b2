use crate::config::ServerConfig;
use crate::converter::{Converter, LibreOffice};
use crate::metrics::Registry;
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    /// Server configuration
    pub config: ServerConfig,

    /// Process-wide conversion metrics
    pub metrics: Registry,

    /// Converter invoked by the upload handler
    pub converter: Arc<dyn Converter>,
}

impl AppState {
    /// State backed by the LibreOffice converter from `config`.
    pub fn new(config: ServerConfig) -> Self {
        let converter = Arc::new(LibreOffice::new(config.libreoffice_path.clone()));
        Self::with_converter(config, converter)
    }

    /// State with an explicit converter. Test seam.
    pub fn with_converter(config: ServerConfig, converter: Arc<dyn Converter>) -> Self {
        Self {
            config,
            metrics: Registry::new(),
            converter,
        }
    }
}
