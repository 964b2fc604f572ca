//! Internal mode: direct answers with no masking and no research.

use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::error::ServiceError;
use crate::llm::{ChatRequest, LlmClient};
use crate::prompts::{build_internal_message, INTERNAL_SYSTEM_PROMPT};

const INTERNAL_TEMPERATURE: f32 = 0.4;
const INTERNAL_MAX_TOKENS: u32 = 4096;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InternalResult {
    pub query: String,
    pub response: String,
    pub model_used: String,
}

pub struct InternalAgent {
    client: Arc<dyn LlmClient>,
    model: String,
}

impl InternalAgent {
    pub fn new(client: Arc<dyn LlmClient>, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
        }
    }

    pub async fn respond(
        &self,
        query: &str,
        context: Option<&str>,
    ) -> Result<InternalResult, ServiceError> {
        let request = ChatRequest::new(&self.model)
            .system(INTERNAL_SYSTEM_PROMPT)
            .user(&build_internal_message(query, context))
            .temperature(INTERNAL_TEMPERATURE)
            .max_tokens(INTERNAL_MAX_TOKENS);

        info!("Internal: {} chars via {}", query.chars().count(), self.model);

        let response = self
            .client
            .complete(&request)
            .await
            .map_err(ServiceError::Internal)?;

        Ok(InternalResult {
            query: query.to_string(),
            response,
            model_used: self.model.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::FakeLlmClient;

    #[tokio::test]
    async fn test_respond_sends_query_verbatim() {
        let client = Arc::new(FakeLlmClient::always("Direkte Antwort"));
        let agent = InternalAgent::new(client.clone(), "openai/gpt-5.2");

        let result = agent.respond("Was ist Hans Müllers Rolle?", None).await.unwrap();

        assert_eq!(result.response, "Direkte Antwort");
        assert_eq!(result.model_used, "openai/gpt-5.2");
        assert_eq!(
            client.requests()[0].last_user_message(),
            Some("Was ist Hans Müllers Rolle?")
        );
    }
}
