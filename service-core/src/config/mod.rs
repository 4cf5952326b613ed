use crate::error::AppError;
use config::{Config as Cfg, File};
use secrecy::Secret;
use serde::Deserialize;
use std::env;
use std::str::FromStr;

pub const DEFAULT_DEPLOYMENT: &str = "gpt-4.1-mini";
pub const DEFAULT_API_VERSION: &str = "2025-01-01-preview";
pub const DEFAULT_MAX_TOKENS: u32 = 1000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub port: u16,
}

impl Config {
    /// Load the common settings (`configuration.*` file, then `APP__*` env vars).
    pub fn load(default_port: u16) -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let config = Cfg::builder()
            .set_default("port", i64::from(default_port))?
            .add_source(File::with_name("configuration").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

/// Connection settings for the Azure OpenAI chat-completion backend.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub endpoint: String,
    pub api_key: Secret<String>,
    pub deployment: String,
    pub api_version: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl LlmConfig {
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup. `load` uses the process
    /// environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvSource::new(lookup);

        Ok(LlmConfig {
            endpoint: env.required("AZURE_OPENAI_ENDPOINT")?,
            api_key: Secret::new(env.required("AZURE_OPENAI_API_KEY")?),
            deployment: env.get("AZURE_OPENAI_DEPLOYMENT", Some(DEFAULT_DEPLOYMENT))?,
            api_version: env.get("AZURE_OPENAI_API_VERSION", Some(DEFAULT_API_VERSION))?,
            max_tokens: env.parsed("LLM_MAX_TOKENS", DEFAULT_MAX_TOKENS)?,
            temperature: env.parsed("LLM_TEMPERATURE", 0.0)?,
            timeout_secs: env.parsed("LLM_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?,
        })
    }
}

/// Environment reader shared by the service configs.
///
/// Defaults apply in every environment; only keys read through
/// [`EnvSource::required`] or without a default must be set.
pub struct EnvSource<F> {
    lookup: F,
}

impl<F> EnvSource<F>
where
    F: Fn(&str) -> Option<String>,
{
    pub fn new(lookup: F) -> Self {
        Self { lookup }
    }

    pub fn get(&self, key: &str, default: Option<&str>) -> Result<String, AppError> {
        match ((self.lookup)(key), default) {
            (Some(val), _) => Ok(val),
            (None, Some(def)) => Ok(def.to_string()),
            (None, None) => Err(AppError::ConfigError(anyhow::anyhow!(
                "{} is required but not set",
                key
            ))),
        }
    }

    /// Like `get` without a default, but an empty value also counts as missing.
    pub fn required(&self, key: &str) -> Result<String, AppError> {
        let value = self.get(key, None)?;
        if value.trim().is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "{} is required but empty",
                key
            )));
        }
        Ok(value)
    }

    pub fn parsed<T>(&self, key: &str, default: T) -> Result<T, AppError>
    where
        T: FromStr + ToString,
        T::Err: std::fmt::Display,
    {
        self.get(key, Some(&default.to_string()))?
            .trim()
            .parse()
            .map_err(|e: T::Err| {
                AppError::ConfigError(anyhow::anyhow!("{} has an invalid value: {}", key, e))
            })
    }
}
