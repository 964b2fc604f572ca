//! Configuration management for theo.
//!
//! Loads settings from a TOML file (explicit path, then
//! `$XDG_CONFIG_HOME/theo/config.toml`) or uses defaults. Credentials and
//! model names can be overridden from the environment.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use theo_shared::masking::REVIEW_THRESHOLD_CHARS;
use theo_shared::Mode;
use tracing::{info, warn};

use crate::error::ConfigError;

pub const ENV_API_KEY: &str = "OPENROUTER_API_KEY";
pub const ENV_BASE_URL: &str = "OPENROUTER_BASE_URL";
pub const ENV_DETECTION_MODEL: &str = "GPT_MODEL";
pub const ENV_RESEARCH_MODEL: &str = "PERPLEXITY_MODEL";

/// Model provider connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Usually supplied through OPENROUTER_API_KEY instead
    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Accept invalid TLS certificates (inspection proxies on corporate networks)
    #[serde(default)]
    pub accept_invalid_certs: bool,

    /// Sent as HTTP-Referer for provider attribution
    #[serde(default = "default_referer")]
    pub referer: String,

    /// Sent as X-Title for provider attribution
    #[serde(default = "default_title")]
    pub title: String,
}

fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_timeout() -> u64 {
    180 // masking of long documents with 16k output tokens is slow
}

fn default_referer() -> String {
    "https://theo-demo.local".to_string()
}

fn default_title() -> String {
    "theo Research Assistant".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            timeout_secs: default_timeout(),
            accept_invalid_certs: false,
            referer: default_referer(),
            title: default_title(),
        }
    }
}

/// Model selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Detection, synthesis and internal answers
    #[serde(default = "default_detection_model")]
    pub detection: String,

    /// Web-grounded research
    #[serde(default = "default_research_model")]
    pub research: String,

    /// Research models a session may switch between
    #[serde(default = "default_research_choices")]
    pub research_choices: Vec<String>,
}

fn default_detection_model() -> String {
    "openai/gpt-5.2".to_string()
}

fn default_research_model() -> String {
    "perplexity/sonar-pro-search".to_string()
}

fn default_research_choices() -> Vec<String> {
    vec![
        "perplexity/sonar-pro".to_string(),
        "perplexity/sonar-reasoning-pro".to_string(),
    ]
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            detection: default_detection_model(),
            research: default_research_model(),
            research_choices: default_research_choices(),
        }
    }
}

/// Workflow behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    #[serde(default)]
    pub default_mode: Mode,

    /// Research answer language ("de" asks for German explicitly)
    #[serde(default = "default_language")]
    pub language: String,

    /// Inputs longer than this with no detections trigger a review warning
    #[serde(default = "default_review_threshold")]
    pub review_threshold_chars: usize,

    /// Raw research shown before synthesis is cut to this length
    #[serde(default = "default_research_preview")]
    pub raw_research_preview_chars: usize,

    /// Text attachments are cut to this length
    #[serde(default = "default_attachment_max")]
    pub attachment_max_chars: usize,
}

fn default_language() -> String {
    "de".to_string()
}

fn default_review_threshold() -> usize {
    REVIEW_THRESHOLD_CHARS
}

fn default_research_preview() -> usize {
    2000
}

fn default_attachment_max() -> usize {
    5000
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            default_mode: Mode::default(),
            language: default_language(),
            review_threshold_chars: default_review_threshold(),
            raw_research_preview_chars: default_research_preview(),
            attachment_max_chars: default_attachment_max(),
        }
    }
}

/// Full configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub models: ModelConfig,

    #[serde(default)]
    pub workflow: WorkflowConfig,
}

impl Config {
    /// Load config from `path`, the user config dir, or defaults.
    ///
    /// An explicit path must exist and parse. The implicit location falls
    /// back to defaults when absent. Environment overrides apply last.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::load_from_path(p)?,
            None => match default_config_path() {
                Some(p) if p.exists() => Self::load_from_path(&p)?,
                _ => {
                    warn!("Config not found, using defaults");
                    Config::default()
                }
            },
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Apply environment-style overrides; empty values are ignored
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get(ENV_API_KEY) {
            self.provider.api_key = Some(key);
        }
        if let Some(url) = get(ENV_BASE_URL) {
            self.provider.base_url = url;
        }
        if let Some(model) = get(ENV_DETECTION_MODEL) {
            self.models.detection = model;
        }
        if let Some(model) = get(ENV_RESEARCH_MODEL) {
            self.models.research = model;
        }
    }

    /// Check the settings a running service depends on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
            return Err(ConfigError::MissingApiKey);
        }
        if self.models.detection.trim().is_empty() || self.models.research.trim().is_empty() {
            return Err(ConfigError::Invalid("model names must not be empty".to_string()));
        }
        if self.provider.timeout_secs == 0 {
            return Err(ConfigError::Invalid("provider.timeout_secs must be > 0".to_string()));
        }
        Ok(())
    }
}

/// `$XDG_CONFIG_HOME/theo/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("theo").join("config.toml"))
}
