//! Configuration management for sitesmith
//!
//! Configuration is layered: built-in defaults, then an optional YAML or TOML
//! file (chosen by extension), then `SITESMITH_*` environment variables.
//!
//! # Environment Variables
//!
//! - `SITESMITH_PROVIDER`: genai provider (openai|anthropic|ollama|gemini|groq|xai|...) - default: "openai"
//! - `SITESMITH_MODEL`: model name - default: "gpt-4o"
//! - `SITESMITH_REQUEST_TIMEOUT`: completion timeout in seconds - default: "120"
//! - `SITESMITH_TEMPERATURE`: sampling temperature - default: "0.3"
//! - `SITESMITH_MAX_TOKENS`: output-size cap - default: "4096"
//! - `SITESMITH_RETRY_BACKOFF_MS`: wait before the single retry - default: "2000"
//! - `SITESMITH_WORKSPACE_DIR`: parent of per-project workspaces - default: cache dir + "sitesmith/workspaces"
//! - `SITESMITH_STORE_DIR`: project store directory - default: cache dir + "sitesmith/projects"
//! - `SITESMITH_MAX_CONTEXT_SIZE`: refinement excerpt cap in bytes - default: "512000"
//! - `SITESMITH_LOG_LEVEL`: logging level - default: "info"
//! - `SITESMITH_DEPLOY_PROFILE`: site-builder|content-publish|custom - default: "site-builder"
//! - `SITESMITH_STAGE_TIMEOUT`: per-stage timeout in seconds - default: "600"
//! - `SITESMITH_ASSET_TYPE`: asset type required to own before generating
//! - `SITE_BUILDER_PATH`: site-builder executable - default: "site-builder"
//! - `WALRUS_CLI_PATH`: storage CLI executable - default: "walrus"
//!
//! Provider credentials (`OPENAI_API_KEY`, `ANTHROPIC_API_KEY`, ...) are read
//! directly by the genai library. `SITESMITH_API_BASE_URL` overrides the
//! provider endpoint.

use crate::completion::RetryPolicy;
use crate::deploy::{DeployProfileKind, PipelineStage, ScrapeStrategy};
use crate::generation::GenerationParams;
use crate::llm::{GenAIClient, LLMClient};
use genai::adapter::AdapterKind;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_PROVIDER: &str = "openai";
const DEFAULT_MODEL: &str = "gpt-4o";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
const DEFAULT_TEMPERATURE: f32 = 0.3;
const DEFAULT_MAX_TOKENS: u32 = 4096;
const DEFAULT_RETRY_BACKOFF_MS: u64 = 2000;
const DEFAULT_MAX_CONTEXT_SIZE: usize = 500 * 1024;
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_SITE_BUILDER_PATH: &str = "site-builder";
const DEFAULT_PUBLISH_CLI_PATH: &str = "walrus";
const DEFAULT_SITES_CONFIG: &str = "sites-config.yaml";
const DEFAULT_EPOCHS: u32 = 2;
const DEFAULT_STAGE_TIMEOUT_SECS: u64 = 600;

const MAX_REQUEST_TIMEOUT_SECS: u64 = 600;
const MIN_CONTEXT_SIZE: u64 = 1024;
const MAX_CONTEXT_SIZE: u64 = 10 * 1024 * 1024;

fn in_range(field: &str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else if max == u64::MAX {
        Err(ConfigError::ValidationFailed(format!(
            "{} must be at least {}, got {}",
            field, min, value
        )))
    } else {
        Err(ConfigError::ValidationFailed(format!(
            "{} must be within {}..={}, got {}",
            field, min, max, value
        )))
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown provider '{0}' (expected openai, anthropic, ollama, gemini, groq, xai, deepseek or cohere)")]
    InvalidProvider(String),

    #[error("Invalid configuration: {0}")]
    ValidationFailed(String),

    /// A file or environment value did not parse; `field` names its source
    #[error("Cannot parse {field}: {error}")]
    ParseError { field: String, error: String },

    #[error("Failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported config file format: {} (expected .yaml, .yml or .toml)", .0.display())]
    UnsupportedFormat(PathBuf),
}

/// Deployment settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    pub profile: DeployProfileKind,
    pub site_builder_path: String,
    pub publish_cli_path: String,
    pub sites_config: String,
    pub epochs: u32,
    pub stage_timeout_secs: u64,
    /// Stages for the custom profile
    pub stages: Vec<PipelineStage>,
    /// Replaces the profile's default identifier conventions when non-empty
    pub scrape: Vec<ScrapeStrategy>,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            profile: DeployProfileKind::default(),
            site_builder_path: DEFAULT_SITE_BUILDER_PATH.to_string(),
            publish_cli_path: DEFAULT_PUBLISH_CLI_PATH.to_string(),
            sites_config: DEFAULT_SITES_CONFIG.to_string(),
            epochs: DEFAULT_EPOCHS,
            stage_timeout_secs: DEFAULT_STAGE_TIMEOUT_SECS,
            stages: Vec::new(),
            scrape: Vec::new(),
        }
    }
}

/// Access-control settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Asset type a wallet must own before a site is generated for it
    pub asset_type: Option<String>,
}

/// Main configuration structure for sitesmith
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SitesmithConfig {
    /// genai provider name, lower case
    pub provider: String,
    pub model: String,
    pub request_timeout_secs: u64,
    pub temperature: f32,
    pub max_tokens: u32,
    pub retry_backoff_ms: u64,
    pub workspace_dir: PathBuf,
    pub store_dir: PathBuf,
    pub max_context_size: usize,
    pub log_level: String,
    pub deploy: DeployConfig,
    pub access: AccessConfig,
}

fn data_root() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(env::temp_dir)
        .join("sitesmith")
}

impl Default for SitesmithConfig {
    /// Built-in defaults only; see [`SitesmithConfig::load`] for layering.
    fn default() -> Self {
        let root = data_root();
        Self {
            provider: DEFAULT_PROVIDER.to_string(),
            model: DEFAULT_MODEL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
            workspace_dir: root.join("workspaces"),
            store_dir: root.join("projects"),
            max_context_size: DEFAULT_MAX_CONTEXT_SIZE,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            deploy: DeployConfig::default(),
            access: AccessConfig::default(),
        }
    }
}

fn env_parse<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::ParseError {
                field: key.to_string(),
                error: e.to_string(),
            }),
        _ => Ok(None),
    }
}

impl SitesmithConfig {
    /// Defaults, then `path` if given, then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Defaults overlaid with the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Reads a YAML or TOML file; missing fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some("yaml") | Some("yml") => {
                serde_yaml::from_str(&contents).map_err(|e| ConfigError::ParseError {
                    field: path.display().to_string(),
                    error: e.to_string(),
                })
            }
            Some("toml") => toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
                field: path.display().to_string(),
                error: e.to_string(),
            }),
            _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    /// Applies `SITESMITH_*` and tool-path environment variables.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(provider) = env_parse::<String>("SITESMITH_PROVIDER")? {
            self.provider = provider.to_lowercase();
        }
        if let Some(model) = env_parse::<String>("SITESMITH_MODEL")? {
            self.model = model;
        }
        if let Some(timeout) = env_parse("SITESMITH_REQUEST_TIMEOUT")? {
            self.request_timeout_secs = timeout;
        }
        if let Some(temperature) = env_parse("SITESMITH_TEMPERATURE")? {
            self.temperature = temperature;
        }
        if let Some(max_tokens) = env_parse("SITESMITH_MAX_TOKENS")? {
            self.max_tokens = max_tokens;
        }
        if let Some(backoff) = env_parse("SITESMITH_RETRY_BACKOFF_MS")? {
            self.retry_backoff_ms = backoff;
        }
        if let Some(dir) = env_parse::<PathBuf>("SITESMITH_WORKSPACE_DIR")? {
            self.workspace_dir = dir;
        }
        if let Some(dir) = env_parse::<PathBuf>("SITESMITH_STORE_DIR")? {
            self.store_dir = dir;
        }
        if let Some(size) = env_parse("SITESMITH_MAX_CONTEXT_SIZE")? {
            self.max_context_size = size;
        }
        if let Some(level) = env_parse::<String>("SITESMITH_LOG_LEVEL")? {
            self.log_level = level.to_lowercase();
        }
        if let Some(profile) = env_parse("SITESMITH_DEPLOY_PROFILE")? {
            self.deploy.profile = profile;
        }
        if let Some(timeout) = env_parse("SITESMITH_STAGE_TIMEOUT")? {
            self.deploy.stage_timeout_secs = timeout;
        }
        if let Some(path) = env_parse::<String>("SITE_BUILDER_PATH")? {
            self.deploy.site_builder_path = path;
        }
        if let Some(path) = env_parse::<String>("WALRUS_CLI_PATH")? {
            self.deploy.publish_cli_path = path;
        }
        if let Some(asset_type) = env_parse::<String>("SITESMITH_ASSET_TYPE")? {
            self.access.asset_type = Some(asset_type);
        }
        Ok(())
    }

    /// Rejects values the rest of the crate cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.provider_kind()?;

        in_range("request_timeout_secs", self.request_timeout_secs, 1, MAX_REQUEST_TIMEOUT_SECS)?;
        in_range("max_tokens", u64::from(self.max_tokens), 1, u64::from(u32::MAX))?;
        in_range("max_context_size", self.max_context_size as u64, MIN_CONTEXT_SIZE, MAX_CONTEXT_SIZE)?;
        in_range("deploy.stage_timeout_secs", self.deploy.stage_timeout_secs, 1, u64::MAX)?;

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationFailed(format!(
                "temperature must be within 0.0..=2.0, got {}",
                self.temperature
            )));
        }

        if crate::util::logging::parse_level(&self.log_level).is_none() {
            return Err(ConfigError::ValidationFailed(format!(
                "log_level '{}' is not one of trace, debug, info, warn, error",
                self.log_level
            )));
        }

        Ok(())
    }

    pub fn provider_kind(&self) -> Result<AdapterKind, ConfigError> {
        AdapterKind::from_lower_str(&self.provider.to_lowercase())
            .ok_or_else(|| ConfigError::InvalidProvider(self.provider.clone()))
    }

    /// Creates the genai-backed completion backend for the configured provider.
    pub fn create_llm_client(&self) -> Result<Arc<dyn LLMClient>, ConfigError> {
        let provider = self.provider_kind()?;
        let client = GenAIClient::new(
            provider,
            self.model.clone(),
            Duration::from_secs(self.request_timeout_secs),
        );
        Ok(Arc::new(client))
    }

    pub fn generation_params(&self) -> GenerationParams {
        GenerationParams {
            temperature: self.temperature,
            max_tokens: Some(self.max_tokens),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(Duration::from_millis(self.retry_backoff_ms))
    }
}

impl fmt::Display for SitesmithConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "config: {}/{} (timeout {}s, temperature {}, max_tokens {}), \
             workspaces={} store={} context<={}B, log={}, deploy={}",
            self.provider,
            self.model,
            self.request_timeout_secs,
            self.temperature,
            self.max_tokens,
            self.workspace_dir.display(),
            self.store_dir.display(),
            self.max_context_size,
            self.log_level,
            self.deploy.profile
        )
    }
}
