use service_core::config::{self as core_config, EnvSource, LlmConfig};
use service_core::error::AppError;
use std::env;

pub const DEFAULT_PORT: u16 = 7071;
pub const DEFAULT_EXTRACTOR_URL: &str = "http://localhost:8000/extract";
/// 20 MiB
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;
/// Set by the Azure Functions host when it runs us as a custom handler.
pub const FUNCTIONS_PORT_VAR: &str = "FUNCTIONS_CUSTOMHANDLER_PORT";

/// Which transport adapter fronts the validation core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adapter {
    /// Plain HTTP service: `{"detail": msg}` errors.
    Service,
    /// Azure Functions custom handler: `{"error": msg}` errors, pretty JSON.
    Function,
}

#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    pub common: core_config::Config,
    pub llm: LlmConfig,
    pub extractor_url: String,
    pub max_upload_bytes: usize,
    pub adapter: Adapter,
}

impl ValidatorConfig {
    pub fn load() -> Result<Self, AppError> {
        let mut common = core_config::Config::load(DEFAULT_PORT)?;
        let llm = LlmConfig::load()?;

        // The functions host decides the port; it always wins over APP__PORT.
        let adapter = match env::var(FUNCTIONS_PORT_VAR) {
            Ok(port) => {
                common.port = port.parse().map_err(|_| {
                    AppError::ConfigError(anyhow::anyhow!(
                        "{} is not a valid port: {}",
                        FUNCTIONS_PORT_VAR,
                        port
                    ))
                })?;
                Adapter::Function
            }
            Err(_) => Adapter::Service,
        };

        let env = EnvSource::new(|key| env::var(key).ok());

        Ok(ValidatorConfig {
            common,
            llm,
            extractor_url: env.get("INVOICE_EXTRACTOR_URL", Some(DEFAULT_EXTRACTOR_URL))?,
            max_upload_bytes: env.parsed("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            adapter,
        })
    }
}
