//! Delegate services bundle.

use std::sync::Arc;

use crate::config::{Config, ModelConfig};
use crate::error::ConfigError;
use crate::internal::InternalAgent;
use crate::llm::{HttpLlmClient, LlmClient};
use crate::masking::MaskingEngine;
use crate::reasoning::ReasoningAgent;
use crate::research::ResearchAgent;

/// The four delegates the workflow talks to
pub struct Services {
    pub masking: MaskingEngine,
    pub research: ResearchAgent,
    pub reasoning: ReasoningAgent,
    pub internal: InternalAgent,
}

impl Services {
    /// Build all delegates over one shared HTTP client
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let client: Arc<dyn LlmClient> = Arc::new(HttpLlmClient::new(&config.provider)?);
        Ok(Self::with_client(client, &config.models))
    }

    pub fn with_client(client: Arc<dyn LlmClient>, models: &ModelConfig) -> Self {
        Self {
            masking: MaskingEngine::new(Arc::clone(&client), &models.detection),
            research: ResearchAgent::new(Arc::clone(&client), &models.research),
            reasoning: ReasoningAgent::new(Arc::clone(&client), &models.detection),
            internal: InternalAgent::new(client, &models.detection),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_without_key_fails() {
        let config = Config::default();
        assert!(matches!(
            Services::from_config(&config),
            Err(ConfigError::MissingApiKey)
        ));
    }

    #[test]
    fn test_model_assignment() {
        let client: Arc<dyn LlmClient> = Arc::new(crate::llm::FakeLlmClient::always("x"));
        let services = Services::with_client(client, &ModelConfig::default());
        assert_eq!(services.masking.model(), "openai/gpt-5.2");
        assert_eq!(services.research.default_model(), "perplexity/sonar-pro-search");
    }
}
