use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::Config;
use crate::types::{FetchConfig, IngestError, RelevanceLabel, Result, Summary};

/// Model identifier for the OpenAI-backed adapter.
pub const OPENAI_MODEL_ID: &str = "default-openai";
/// Model identifier for the Anthropic-backed adapter.
pub const ANTHROPIC_MODEL_ID: &str = "default-anthropic";

const SUMMARY_PROMPT: &str = "You are a news summarization assistant. Summarize the impact \
     described in the article and the main cause behind it, each in about 50 characters. \
     Answer with valid JSON of exactly this form and nothing else: \
     {\"impact\": \"...\", \"reason\": \"...\"}";

const KEYWORD_PROMPT: &str = "You are a keyword extraction assistant. The user describes the \
     news they want to see; extract the most important search keywords from the description. \
     Avoid filler terms such as \"news\" or \"information\" that would confuse a search \
     engine. Answer with the keywords only, separated by single spaces.";

fn relevance_prompt(topic: &str) -> String {
    format!(
        "You are a relevance grader. Evaluate whether the news headline is related to \
         \"{topic}\" and grade it as 'high', 'medium' or 'low'. Answer with exactly one of \
         those three words and nothing else."
    )
}

/// Capability set every language-model backend provides. The three
/// operations share one prompt set and one output contract; adapters differ
/// only in which backend they call, so each implements [`generate`] and
/// inherits the rest.
///
/// [`generate`]: LlmAdapter::generate
#[async_trait]
pub trait LlmAdapter: Send + Sync + std::fmt::Debug {
    /// Human-readable name used in logs.
    fn adapter_name(&self) -> &str;

    /// One text completion: fixed system instruction plus user content in,
    /// raw model text out.
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;

    /// Grade a headline's relevance to the topic. The raw reply must map
    /// onto one of the three labels; anything else is an evaluation error,
    /// never a guessed label.
    async fn classify_relevance(&self, title: &str, topic: &str) -> Result<RelevanceLabel> {
        let raw = self.generate(&relevance_prompt(topic), title).await?;
        parse_relevance(&raw)
    }

    /// Summarize article content into the strict `{impact, reason}` shape.
    /// A reply that does not decode is an evaluation error; a partially
    /// filled summary never reaches the caller.
    async fn summarize(&self, content: &str) -> Result<Summary> {
        let raw = self.generate(SUMMARY_PROMPT, content).await?;
        decode_summary(&raw)
    }

    /// Extract space-separated search keywords from a free-text request.
    async fn extract_keywords(&self, prompt: &str) -> Result<String> {
        let raw = self.generate(KEYWORD_PROMPT, prompt).await?;
        let keywords = raw.trim();
        if keywords.is_empty() {
            return Err(IngestError::Evaluation(
                "keyword extraction returned an empty reply".to_string(),
            ));
        }
        Ok(keywords.to_string())
    }
}

fn parse_relevance(raw: &str) -> Result<RelevanceLabel> {
    match raw.trim().to_lowercase().as_str() {
        "high" => Ok(RelevanceLabel::High),
        "medium" => Ok(RelevanceLabel::Medium),
        "low" => Ok(RelevanceLabel::Low),
        other => Err(IngestError::Evaluation(format!(
            "relevance reply {other:?} is not one of high/medium/low"
        ))),
    }
}

fn decode_summary(raw: &str) -> Result<Summary> {
    serde_json::from_str::<Summary>(raw.trim())
        .map_err(|e| IngestError::Evaluation(format!("summary reply did not decode: {e}")))
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

impl ChatMessage {
    fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionMessage {
    content: Option<String>,
}

/// Adapter for the OpenAI chat-completions endpoint.
#[derive(Debug)]
pub struct OpenAiAdapter {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiAdapter {
    pub fn new(
        fetch_config: &FetchConfig,
        base_url: String,
        api_key: String,
        model: String,
    ) -> Result<Self> {
        let http = Client::builder()
            .user_agent(&fetch_config.user_agent)
            .timeout(fetch_config.timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
        })
    }
}

#[async_trait]
impl LlmAdapter for OpenAiAdapter {
    fn adapter_name(&self) -> &str {
        "openai"
    }

    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::new("system", system_prompt),
                ChatMessage::new("user", user_prompt),
            ],
        };
        debug!(model = %self.model, "openai completion request");
        let response: ChatCompletionResponse = self
            .http
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                IngestError::Evaluation("completion response carried no content".to_string())
            })
    }
}

#[derive(Debug, Serialize)]
struct AnthropicMessagesRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct AnthropicMessagesResponse {
    content: Vec<AnthropicContentBlock>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: String,
}

/// Adapter for the Anthropic messages endpoint.
#[derive(Debug)]
pub struct AnthropicAdapter {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl AnthropicAdapter {
    const API_VERSION: &'static str = "2023-06-01";
    const MAX_TOKENS: u32 = 1024;

    pub fn new(
        fetch_config: &FetchConfig,
        base_url: String,
        api_key: String,
        model: String,
    ) -> Result<Self> {
        let http = Client::builder()
            .user_agent(&fetch_config.user_agent)
            .timeout(fetch_config.timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
        })
    }
}

#[async_trait]
impl LlmAdapter for AnthropicAdapter {
    fn adapter_name(&self) -> &str {
        "anthropic"
    }

    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let request = AnthropicMessagesRequest {
            model: self.model.clone(),
            max_tokens: Self::MAX_TOKENS,
            system: system_prompt.to_string(),
            messages: vec![ChatMessage::new("user", user_prompt)],
        };
        debug!(model = %self.model, "anthropic messages request");
        let response: AnthropicMessagesResponse = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", Self::API_VERSION)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response
            .content
            .into_iter()
            .find(|block| block.block_type == "text")
            .map(|block| block.text)
            .ok_or_else(|| {
                IngestError::Evaluation("messages response carried no text block".to_string())
            })
    }
}

/// Registry of adapters keyed by model identifier. Callers hold the registry
/// and resolve identifiers per request; an unrecognized identifier fails
/// before any network call is made.
pub struct ProviderRegistry {
    adapters: HashMap<String, Arc<dyn LlmAdapter>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    /// Build the registry with both default providers from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let fetch_config = config.fetch_config();
        let mut registry = Self::new();
        registry.register(
            OPENAI_MODEL_ID,
            Arc::new(OpenAiAdapter::new(
                &fetch_config,
                config.openai_base_url.clone(),
                config.openai_api_key.clone(),
                config.openai_model.clone(),
            )?),
        );
        registry.register(
            ANTHROPIC_MODEL_ID,
            Arc::new(AnthropicAdapter::new(
                &fetch_config,
                config.anthropic_base_url.clone(),
                config.anthropic_api_key.clone(),
                config.anthropic_model.clone(),
            )?),
        );
        Ok(registry)
    }

    pub fn register(&mut self, model_id: impl Into<String>, adapter: Arc<dyn LlmAdapter>) {
        let model_id = model_id.into();
        info!(model_id = %model_id, adapter = adapter.adapter_name(), "registered llm adapter");
        self.adapters.insert(model_id, adapter);
    }

    /// Resolve a model identifier, failing with `InvalidModel` for anything
    /// not registered.
    pub fn get(&self, model_id: &str) -> Result<Arc<dyn LlmAdapter>> {
        self.adapters
            .get(model_id)
            .cloned()
            .ok_or_else(|| IngestError::InvalidModel(model_id.to_string()))
    }

    pub fn model_ids(&self) -> Vec<String> {
        self.adapters.keys().cloned().collect()
    }

    /// Summarize arbitrary text with the named provider. `InvalidModel`
    /// surfaces to the interactive caller; everything else follows the
    /// summarization contract.
    pub async fn summarize_text(&self, model_id: &str, content: &str) -> Result<Summary> {
        let adapter = self.get(model_id)?;
        adapter.summarize(content).await
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
