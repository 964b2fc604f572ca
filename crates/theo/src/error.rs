//! Error types for theo services.

use std::path::PathBuf;
use thiserror::Error;

use crate::llm::LlmError;

/// A delegate call that could not be completed.
///
/// Tagged with the stage that failed so the workflow can tell the user where
/// to retry. Malformed model output is not an error: the masking engine
/// degrades instead.
#[derive(Error, Debug, Clone)]
pub enum ServiceError {
    #[error("Masking failed: {0}")]
    Masking(LlmError),

    #[error("Research failed: {0}")]
    Research(LlmError),

    #[error("Follow-up research failed: {0}")]
    FollowUp(LlmError),

    #[error("Reasoning failed: {0}")]
    Synthesis(LlmError),

    #[error("Requirements generation failed: {0}")]
    Requirements(LlmError),

    #[error("Internal response failed: {0}")]
    Internal(LlmError),
}

impl ServiceError {
    pub fn stage(&self) -> &'static str {
        match self {
            ServiceError::Masking(_) => "masking",
            ServiceError::Research(_) => "research",
            ServiceError::FollowUp(_) => "follow_up",
            ServiceError::Synthesis(_) => "synthesis",
            ServiceError::Requirements(_) => "requirements",
            ServiceError::Internal(_) => "internal",
        }
    }

    pub fn llm_error(&self) -> &LlmError {
        match self {
            ServiceError::Masking(e)
            | ServiceError::Research(e)
            | ServiceError::FollowUp(e)
            | ServiceError::Synthesis(e)
            | ServiceError::Requirements(e)
            | ServiceError::Internal(e) => e,
        }
    }
}

/// Configuration problems, fatal at service construction
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("OPENROUTER_API_KEY not set and no api_key in config")]
    MissingApiKey,

    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
