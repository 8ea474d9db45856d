/// OpenAI and Anthropic backends for the model gateway
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use super::{Generation, GenerationRequest, ModelError, TextGenerator};

const ANTHROPIC_VERSION: &str = "2023-06-01";

const JSON_ONLY_INSTRUCTION: &str =
    "Respond with a single valid JSON document and nothing else. No prose, no code fences.";

/// Connection settings for one provider
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl ProviderConfig {
    pub fn openai(api_key: Option<String>) -> Self {
        Self {
            api_key,
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 120,
        }
    }

    pub fn anthropic(api_key: Option<String>) -> Self {
        Self {
            api_key,
            base_url: "https://api.anthropic.com".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            timeout_secs: 120,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn client(&self) -> Result<Client, ModelError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()?;
        Ok(client)
    }
}

/// OpenAI chat completions backend
pub struct OpenAIProvider {
    client: Client,
    config: ProviderConfig,
}

impl OpenAIProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, ModelError> {
        Ok(Self {
            client: config.client()?,
            config,
        })
    }

    fn request_body(&self, request: &GenerationRequest) -> Value {
        let mut messages = vec![];

        if let Some(system) = &request.system {
            messages.push(json!({
                "role": "system",
                "content": system
            }));
        }

        messages.push(json!({
            "role": "user",
            "content": request.prompt
        }));

        let mut body = json!({
            "model": self.config.model,
            "messages": messages,
            "max_tokens": request.max_tokens
        });

        if request.json_mode {
            body["response_format"] = json!({ "type": "json_object" });
        }

        body
    }
}

#[async_trait]
impl TextGenerator for OpenAIProvider {
    fn model_id(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, ModelError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(ModelError::MissingApiKey("OpenAI"))?;

        debug!("Calling OpenAI model {}", self.config.model);

        let response = self
            .client
            .post(self.config.endpoint("/v1/chat/completions"))
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&self.request_body(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(ModelError::Api {
                provider: "OpenAI",
                status: status.as_u16(),
                body,
            });
        }

        let response_json: OpenAIResponse = response.json().await?;
        let usage = response_json.usage.unwrap_or_default();

        let content = response_json
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(ModelError::EmptyResponse("OpenAI"))?;

        Ok(Generation {
            content,
            model: self.config.model.clone(),
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
        })
    }
}

/// Anthropic messages backend
pub struct ClaudeProvider {
    client: Client,
    config: ProviderConfig,
}

impl ClaudeProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, ModelError> {
        Ok(Self {
            client: config.client()?,
            config,
        })
    }

    fn request_body(&self, request: &GenerationRequest) -> Value {
        let mut body = json!({
            "model": self.config.model,
            "max_tokens": request.max_tokens,
            "messages": [{
                "role": "user",
                "content": request.prompt
            }]
        });

        // The messages API has no JSON switch; ask for it in the system prompt
        let system = match (&request.system, request.json_mode) {
            (Some(system), true) => Some(format!("{}\n\n{}", system, JSON_ONLY_INSTRUCTION)),
            (None, true) => Some(JSON_ONLY_INSTRUCTION.to_string()),
            (system, false) => system.clone(),
        };

        if let Some(system) = system {
            body["system"] = json!(system);
        }

        body
    }
}

#[async_trait]
impl TextGenerator for ClaudeProvider {
    fn model_id(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, ModelError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(ModelError::MissingApiKey("Anthropic"))?;

        debug!("Calling Claude model {}", self.config.model);

        let response = self
            .client
            .post(self.config.endpoint("/v1/messages"))
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&self.request_body(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(ModelError::Api {
                provider: "Anthropic",
                status: status.as_u16(),
                body,
            });
        }

        let response_json: ClaudeResponse = response.json().await?;
        let usage = response_json.usage.unwrap_or_default();

        let content = response_json
            .content
            .into_iter()
            .find_map(|c| c.text)
            .ok_or(ModelError::EmptyResponse("Claude"))?;

        Ok(Generation {
            content,
            model: self.config.model.clone(),
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
        })
    }
}

// Response structures
#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIMessage {
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAIUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    content: Vec<ClaudeContent>,
    usage: Option<ClaudeUsage>,
}

#[derive(Debug, Deserialize)]
struct ClaudeContent {
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ClaudeUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}
