//! Synthesis of the final answer and requirements derivation.
//!
//! Both run on masked research text. The synthesis output is unmasked
//! before it is returned; requirements are unmasked by the caller, which
//! owns the mapping.

use serde::Serialize;
use std::sync::Arc;
use theo_shared::{unmask, MaskMapping};
use tracing::info;

use crate::error::ServiceError;
use crate::llm::{ChatRequest, LlmClient};
use crate::prompts::{
    build_requirements_message, build_synthesis_message, REASONING_SYSTEM_PROMPT,
    REQUIREMENTS_SYSTEM_PROMPT,
};

const SYNTHESIS_TEMPERATURE: f32 = 0.4;
const SYNTHESIS_MAX_TOKENS: u32 = 4096;
const REQUIREMENTS_TEMPERATURE: f32 = 0.3;
const REQUIREMENTS_MAX_TOKENS: u32 = 2048;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReasoningResult {
    pub original_query: String,
    pub research_response: String,
    /// Unmasked answer for the user
    pub final_response: String,
}

pub struct ReasoningAgent {
    client: Arc<dyn LlmClient>,
    model: String,
}

impl ReasoningAgent {
    pub fn new(client: Arc<dyn LlmClient>, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
        }
    }

    /// Turn a research answer into the final response.
    ///
    /// `original_query` is the masked query as sent to research. With a
    /// mapping, placeholders in the model output are restored.
    pub async fn synthesize(
        &self,
        original_query: &str,
        research_response: &str,
        mapping: Option<&MaskMapping>,
        context: Option<&str>,
    ) -> Result<ReasoningResult, ServiceError> {
        let request = ChatRequest::new(&self.model)
            .system(REASONING_SYSTEM_PROMPT)
            .user(&build_synthesis_message(original_query, research_response, context))
            .temperature(SYNTHESIS_TEMPERATURE)
            .max_tokens(SYNTHESIS_MAX_TOKENS);

        info!("Synthesis: {} chars of research", research_response.len());

        let response = self
            .client
            .complete(&request)
            .await
            .map_err(ServiceError::Synthesis)?;

        let final_response = match mapping {
            Some(m) => unmask(&response, m),
            None => response,
        };

        Ok(ReasoningResult {
            original_query: original_query.to_string(),
            research_response: research_response.to_string(),
            final_response,
        })
    }

    /// Prioritized requirements (Must/Should/Nice-to-Have) from research.
    ///
    /// The returned text is still masked.
    pub async fn generate_requirements(
        &self,
        research_response: &str,
        context: &str,
    ) -> Result<String, ServiceError> {
        let request = ChatRequest::new(&self.model)
            .system(REQUIREMENTS_SYSTEM_PROMPT)
            .user(&build_requirements_message(research_response, context))
            .temperature(REQUIREMENTS_TEMPERATURE)
            .max_tokens(REQUIREMENTS_MAX_TOKENS);

        info!("Requirements: {} chars of research", research_response.len());

        self.client
            .complete(&request)
            .await
            .map_err(ServiceError::Requirements)
    }
}
