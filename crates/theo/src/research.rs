//! Web-grounded research on sanitized queries.

use regex::Regex;
use serde::Serialize;
use std::sync::{Arc, LazyLock};
use tracing::info;

use crate::error::ServiceError;
use crate::llm::{ChatRequest, LlmClient};
use crate::prompts::{build_research_message, RESEARCH_SYSTEM_PROMPT};

const RESEARCH_TEMPERATURE: f32 = 0.3;
const RESEARCH_MAX_TOKENS: u32 = 4096;

static URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://[^\s\)\]>]+").unwrap());

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResearchResult {
    pub query: String,
    pub response: String,
    pub sources: Vec<String>,
    pub model_used: String,
}

/// Per-call research settings
#[derive(Debug, Clone, Default)]
pub struct ResearchOptions {
    /// Answer language; "de" adds an explicit instruction
    pub language: String,
    /// Overrides the agent's default model
    pub model: Option<String>,
}

impl ResearchOptions {
    pub fn new(language: &str) -> Self {
        Self {
            language: language.to_string(),
            model: None,
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = Some(model.to_string());
        self
    }
}

pub struct ResearchAgent {
    client: Arc<dyn LlmClient>,
    default_model: String,
}

impl ResearchAgent {
    pub fn new(client: Arc<dyn LlmClient>, default_model: &str) -> Self {
        Self {
            client,
            default_model: default_model.to_string(),
        }
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    fn model_for<'a>(&'a self, options: &'a ResearchOptions) -> &'a str {
        options
            .model
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(&self.default_model)
    }

    /// Research an already sanitized query
    pub async fn research(
        &self,
        sanitized_query: &str,
        context: Option<&str>,
        options: &ResearchOptions,
    ) -> Result<ResearchResult, ServiceError> {
        let model = self.model_for(options);
        let request = ChatRequest::new(model)
            .system(RESEARCH_SYSTEM_PROMPT)
            .user(&build_research_message(sanitized_query, context, &options.language))
            .temperature(RESEARCH_TEMPERATURE)
            .max_tokens(RESEARCH_MAX_TOKENS);

        info!("Research: {} chars via {}", sanitized_query.chars().count(), model);

        let response = self
            .client
            .complete(&request)
            .await
            .map_err(ServiceError::Research)?;

        let sources = extract_sources(&response);
        info!("Research: {} chars, {} sources", response.len(), sources.len());

        Ok(ResearchResult {
            query: sanitized_query.to_string(),
            response,
            sources,
            model_used: model.to_string(),
        })
    }

    /// Ask a follow-up question in the context of an earlier answer.
    ///
    /// Callers must sanitize `followup_question` the same way as the
    /// original query.
    pub async fn research_with_followup(
        &self,
        original_query: &str,
        previous_response: &str,
        followup_question: &str,
        options: &ResearchOptions,
    ) -> Result<ResearchResult, ServiceError> {
        let model = self.model_for(options);
        let request = ChatRequest::new(model)
            .system(RESEARCH_SYSTEM_PROMPT)
            .user(original_query)
            .assistant(previous_response)
            .user(followup_question)
            .temperature(RESEARCH_TEMPERATURE)
            .max_tokens(RESEARCH_MAX_TOKENS);

        info!("Follow-up research via {}", model);

        let response = self
            .client
            .complete(&request)
            .await
            .map_err(ServiceError::FollowUp)?;

        Ok(ResearchResult {
            query: followup_question.to_string(),
            sources: extract_sources(&response),
            response,
            model_used: model.to_string(),
        })
    }
}

/// Distinct URLs cited in a research answer, sorted
pub fn extract_sources(text: &str) -> Vec<String> {
    let mut sources: Vec<String> = URL_PATTERN
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches(['.', ',', ';', ':']).to_string())
        .collect();
    sources.sort();
    sources.dedup();
    sources
}
