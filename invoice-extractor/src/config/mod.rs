use service_core::config::{self as core_config, EnvSource, LlmConfig};
use service_core::error::AppError;
use std::env;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_UPLOAD_DIR: &str = "resource/uploaded-invoices";
/// 20 MiB
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub common: core_config::Config,
    pub llm: LlmConfig,
    pub upload: UploadConfig,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Directory where every uploaded PDF is archived.
    pub dir: String,
    pub max_bytes: usize,
}

impl ExtractorConfig {
    pub fn load() -> Result<Self, AppError> {
        // Load common config (handles .env and APP__ prefix)
        let common = core_config::Config::load(DEFAULT_PORT)?;
        let llm = LlmConfig::load()?;
        let env = EnvSource::new(|key| env::var(key).ok());

        Ok(ExtractorConfig {
            common,
            llm,
            upload: UploadConfig {
                dir: env.get("UPLOAD_DIR", Some(DEFAULT_UPLOAD_DIR))?,
                max_bytes: env.parsed("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            },
        })
    }
}
