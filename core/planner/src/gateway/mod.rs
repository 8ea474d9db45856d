//! Usage-metered access to the two text-generation backends.
//!
//! The planner talks to a cheap general-purpose model and a more expensive
//! reasoning model through [`ModelGateway`]. Every call, successful or not,
//! attempts to append a usage record; metering failures are logged and never
//! reach the caller.

pub mod pricing;
pub mod providers;

use async_trait::async_trait;
use ryan_schemas::UsageRecord;
use ryan_store::Store;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

pub use providers::{ClaudeProvider, OpenAIProvider, ProviderConfig};

pub const DEFAULT_MAX_TOKENS: u32 = 2000;

/// Usage rows keep at most this many characters of the prompt
pub const PROMPT_PREVIEW_CHARS: usize = 255;

pub const ASSISTANT_NAME: &str = "ryan";

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} API error ({status}): {body}")]
    Api {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("Empty response from {0}")]
    EmptyResponse(&'static str),

    #[error("{0} API key is not configured")]
    MissingApiKey(&'static str),
}

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub system: Option<String>,
    pub max_tokens: u32,
    /// Ask the backend for a single machine-parseable JSON document
    pub json_mode: bool,
    pub task_type: Option<String>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            json_mode: false,
            task_type: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn json(mut self) -> Self {
        self.json_mode = true;
        self
    }

    pub fn with_task_type(mut self, task_type: impl Into<String>) -> Self {
        self.task_type = Some(task_type.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct Generation {
    pub content: String,
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// A text-generation backend
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Model id used for pricing and usage rows
    fn model_id(&self) -> &str;

    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, ModelError>;
}

pub struct ModelGateway {
    general: Arc<dyn TextGenerator>,
    reasoning: Arc<dyn TextGenerator>,
    store: Arc<dyn Store>,
}

impl ModelGateway {
    pub fn new(
        general: Arc<dyn TextGenerator>,
        reasoning: Arc<dyn TextGenerator>,
        store: Arc<dyn Store>,
    ) -> Self {
        Self {
            general,
            reasoning,
            store,
        }
    }

    /// Low-cost general-purpose generation
    pub async fn generate_general(
        &self,
        request: &GenerationRequest,
    ) -> Result<Generation, ModelError> {
        self.generate_with(self.general.as_ref(), request).await
    }

    /// Higher-cost reasoning generation
    pub async fn generate_reasoning(
        &self,
        request: &GenerationRequest,
    ) -> Result<Generation, ModelError> {
        self.generate_with(self.reasoning.as_ref(), request).await
    }

    async fn generate_with(
        &self,
        generator: &dyn TextGenerator,
        request: &GenerationRequest,
    ) -> Result<Generation, ModelError> {
        let result = generator.generate(request).await;

        let (input_tokens, output_tokens) = match &result {
            Ok(generation) => (generation.input_tokens, generation.output_tokens),
            Err(_) => (0, 0),
        };
        self.track_usage(generator.model_id(), input_tokens, output_tokens, request);

        result
    }

    fn track_usage(
        &self,
        model: &str,
        input_tokens: u64,
        output_tokens: u64,
        request: &GenerationRequest,
    ) {
        let cost_usd = pricing::calculate_cost(model, input_tokens, output_tokens);
        let record = UsageRecord {
            model: model.to_string(),
            input_tokens,
            output_tokens,
            cost_usd,
            task_type: request.task_type.clone(),
            assistant_name: ASSISTANT_NAME.to_string(),
            prompt_preview: Some(prompt_preview(&request.prompt)),
        };

        match self.store.insert_usage(&record) {
            Ok(_) => info!(
                "Tracked usage: {} | {}+{} tokens | ${:.6}",
                model, input_tokens, output_tokens, cost_usd
            ),
            Err(e) => error!("Failed to track usage for {}: {}", model, e),
        }
    }
}

fn prompt_preview(prompt: &str) -> String {
    prompt.chars().take(PROMPT_PREVIEW_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FlakyStore, ScriptedGenerator};
    use ryan_store::Database;

    fn gateway(store: Arc<dyn Store>, general: Arc<ScriptedGenerator>) -> ModelGateway {
        let reasoning = Arc::new(ScriptedGenerator::new("claude-sonnet-4-20250514", vec![]));
        ModelGateway::new(general, reasoning, store)
    }

    #[tokio::test]
    async fn test_successful_call_is_metered() {
        let store = Arc::new(Database::open_in_memory().unwrap());
        let general = Arc::new(ScriptedGenerator::new(
            "gpt-4o-mini",
            vec![Some("{\"ok\": true}".to_string())],
        ));
        let gateway = gateway(store.clone(), general.clone());

        let long_prompt = "x".repeat(400);
        let request = GenerationRequest::new(long_prompt)
            .json()
            .with_task_type("cross_project_prioritization");
        let generation = gateway.generate_general(&request).await.unwrap();
        assert_eq!(generation.content, "{\"ok\": true}");

        let usage = store.recent_usage(5).unwrap();
        assert_eq!(usage.len(), 1);
        assert_eq!(usage[0].model, "gpt-4o-mini");
        assert_eq!(usage[0].assistant_name, "ryan");
        assert_eq!(
            usage[0].task_type.as_deref(),
            Some("cross_project_prioritization")
        );
        assert_eq!(usage[0].prompt_preview.as_ref().unwrap().chars().count(), 255);
        assert!(usage[0].cost_usd > 0.0);
        assert!(general.requests()[0].json_mode);
    }

    #[tokio::test]
    async fn test_failed_call_is_still_metered() {
        let store = Arc::new(Database::open_in_memory().unwrap());
        let general = Arc::new(ScriptedGenerator::new("gpt-4o-mini", vec![None]));
        let gateway = gateway(store.clone(), general);

        let result = gateway
            .generate_general(&GenerationRequest::new("hello"))
            .await;
        assert!(matches!(result, Err(ModelError::EmptyResponse(_))));

        let usage = store.recent_usage(5).unwrap();
        assert_eq!(usage.len(), 1);
        assert_eq!(usage[0].input_tokens, 0);
        assert_eq!(usage[0].cost_usd, 0.0);
    }

    #[tokio::test]
    async fn test_metering_failure_is_swallowed() {
        let store = Arc::new(FlakyStore::failing_usage());
        let general = Arc::new(ScriptedGenerator::new(
            "gpt-4o-mini",
            vec![Some("fine".to_string())],
        ));
        let gateway = gateway(store, general);

        let generation = gateway
            .generate_general(&GenerationRequest::new("hello"))
            .await
            .unwrap();
        assert_eq!(generation.content, "fine");
    }

    #[tokio::test]
    async fn test_reasoning_uses_second_backend() {
        let store = Arc::new(Database::open_in_memory().unwrap());
        let general = Arc::new(ScriptedGenerator::new("gpt-4o-mini", vec![]));
        let reasoning = Arc::new(ScriptedGenerator::new(
            "claude-sonnet-4-20250514",
            vec![Some("plan".to_string())],
        ));
        let gateway = ModelGateway::new(general, reasoning, store.clone());

        let generation = gateway
            .generate_reasoning(&GenerationRequest::new("think").with_max_tokens(500))
            .await
            .unwrap();
        assert_eq!(generation.model, "claude-sonnet-4-20250514");
        assert_eq!(
            store.recent_usage(1).unwrap()[0].model,
            "claude-sonnet-4-20250514"
        );
    }

    #[test]
    fn test_request_defaults() {
        let request = GenerationRequest::new("p");
        assert_eq!(request.max_tokens, DEFAULT_MAX_TOKENS);
        assert!(!request.json_mode);
        assert!(request.system.is_none());
    }
}
