//! Model Provider Abstraction
//!
//! Unified interface for the vision-capable language models that judge and
//! describe extracted frames (OpenAI, local models via Ollama, custom
//! OpenAI-compatible servers). Callers build a list of chat messages, optionally
//! embedding frame images, and receive free text back.

use crate::error::InferenceError;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub mod profile;

pub use profile::{ProviderConfig, ProviderType};

/// Model provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ModelProvider {
    OpenAI {
        model: String,
        api_key: String,
        base_url: Option<String>, // For custom endpoints (e.g., Azure OpenAI)
    },
    Ollama {
        model: String,
        base_url: Option<String>, // Default: http://localhost:11434
    },
    LocalCustom {
        model: String,
        endpoint: String, // Full endpoint URL (e.g., http://localhost:8080/v1)
        api_key: Option<String>,
    },
}

/// Chat message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// Image embedded in a chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAttachment {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ImageAttachment {
    pub fn jpeg(bytes: Vec<u8>) -> Self {
        Self {
            mime_type: "image/jpeg".to_string(),
            bytes,
        }
    }

    /// Base64 payload without any data-URL prefix
    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.bytes)
    }

    /// `data:<mime>;base64,<payload>` form used by OpenAI-compatible APIs
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }
}

/// Chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImageAttachment>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
            images: Vec::new(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            images: Vec::new(),
        }
    }

    pub fn with_image(mut self, image: ImageAttachment) -> Self {
        self.images.push(image);
        self
    }
}

/// Completion options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionOptions {
    pub temperature: Option<f32>, // 0.0-2.0
    pub max_tokens: Option<u32>,  // Maximum tokens to generate
    pub top_p: Option<f32>,       // Nucleus sampling
    pub stop: Option<Vec<String>>,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: Some(0.0),
            max_tokens: None,
            top_p: None,
            stop: None,
        }
    }
}

impl CompletionOptions {
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Token usage information
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Completion response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub content: String,
    pub model: String,
    pub usage: TokenUsage,
    pub finish_reason: Option<String>,
}

/// Model provider client trait
#[async_trait]
pub trait ModelProviderClient: Send + Sync {
    /// Generate a completion from a list of messages
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<CompletionResponse, InferenceError>;

    /// Get the provider name
    fn provider_name(&self) -> &str;

    /// Get the model name
    fn model_name(&self) -> &str;
}

// OpenAI-compatible API request/response structures
#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
    stream: bool,
}

#[derive(Serialize)]
struct OpenAIMessage {
    role: &'static str,
    content: OpenAIContent,
}

#[derive(Serialize)]
#[serde(untagged)]
enum OpenAIContent {
    Text(String),
    Parts(Vec<OpenAIContentPart>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OpenAIContentPart {
    Text { text: String },
    ImageUrl { image_url: OpenAIImageUrl },
}

#[derive(Serialize)]
struct OpenAIImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    model: String,
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

// Helper function to convert MessageRole to string
fn role_to_string(role: MessageRole) -> &'static str {
    match role {
        MessageRole::System => "system",
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
    }
}

fn to_openai_message(message: ChatMessage) -> OpenAIMessage {
    let role = role_to_string(message.role);
    if message.images.is_empty() {
        return OpenAIMessage {
            role,
            content: OpenAIContent::Text(message.content),
        };
    }

    let mut parts = vec![OpenAIContentPart::Text {
        text: message.content,
    }];
    parts.extend(message.images.iter().map(|image| OpenAIContentPart::ImageUrl {
        image_url: OpenAIImageUrl {
            url: image.to_data_url(),
        },
    }));
    OpenAIMessage {
        role,
        content: OpenAIContent::Parts(parts),
    }
}

// Helper function to map HTTP errors to InferenceError
fn map_http_error(error: reqwest::Error) -> InferenceError {
    if error.is_timeout() {
        InferenceError::Timeout(error.to_string())
    } else if let Some(status) = error.status() {
        map_status_error(status.as_u16(), error.to_string())
    } else if error.is_connect() {
        InferenceError::RequestFailed(format!("Connection error: {}", error))
    } else {
        InferenceError::RequestFailed(format!("HTTP error: {}", error))
    }
}

fn map_status_error(status: u16, body: String) -> InferenceError {
    match status {
        401 | 403 => InferenceError::AuthFailed(body),
        429 => InferenceError::RateLimit(body),
        404 => InferenceError::ModelNotFound(body),
        408 | 504 => InferenceError::Timeout(body),
        _ => InferenceError::RequestFailed(format!("status {}: {}", status, body)),
    }
}

async fn error_for_response(response: reqwest::Response) -> InferenceError {
    let status = response.status().as_u16();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    map_status_error(status, error_text)
}

/// HTTP timeouts applied to every provider request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderTimeouts {
    pub connect: Duration,
    pub request: Duration,
}

impl Default for ProviderTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            request: Duration::from_secs(120),
        }
    }
}

fn build_provider_http_client(timeouts: ProviderTimeouts) -> Result<Client, InferenceError> {
    Client::builder()
        .no_proxy()
        .connect_timeout(timeouts.connect)
        .timeout(timeouts.request)
        .build()
        .map_err(|e| InferenceError::RequestFailed(format!("Failed to create HTTP client: {}", e)))
}

/// OpenAI provider client, also used for OpenAI-compatible local servers
pub struct OpenAIClient {
    client: Client,
    model: String,
    api_key: Option<String>,
    base_url: String,
    provider_name: &'static str,
}

impl OpenAIClient {
    pub fn new(
        model: String,
        api_key: String,
        base_url: Option<String>,
        timeouts: ProviderTimeouts,
    ) -> Result<Self, InferenceError> {
        let client = build_provider_http_client(timeouts)?;
        let base_url = base_url.unwrap_or_else(|| "https://api.openai.com/v1".to_string());

        Ok(Self {
            client,
            model,
            api_key: Some(api_key),
            base_url,
            provider_name: "openai",
        })
    }

    /// Client for a custom server that speaks the OpenAI chat completions API
    pub fn custom_local(
        model: String,
        endpoint: String,
        api_key: Option<String>,
        timeouts: ProviderTimeouts,
    ) -> Result<Self, InferenceError> {
        let client = build_provider_http_client(timeouts)?;
        Ok(Self {
            client,
            model,
            api_key,
            base_url: endpoint.trim_end_matches('/').to_string(),
            provider_name: "local",
        })
    }
}

#[async_trait]
impl ModelProviderClient for OpenAIClient {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<CompletionResponse, InferenceError> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: messages.into_iter().map(to_openai_message).collect(),
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            top_p: options.top_p,
            stop: options.stop,
            stream: false,
        };

        let url = format!("{}/chat/completions", self.base_url);
        let mut builder = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request);
        if let Some(api_key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = builder.send().await.map_err(map_http_error)?;
        if !response.status().is_success() {
            return Err(error_for_response(response).await);
        }

        let completion: ChatCompletionResponse = response.json().await.map_err(|e| {
            InferenceError::MalformedResponse(format!("Failed to parse response: {}", e))
        })?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| InferenceError::MalformedResponse("No choices in response".to_string()))?;
        let content = choice.message.content.ok_or_else(|| {
            InferenceError::MalformedResponse("Response message has no content".to_string())
        })?;

        let usage = completion.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(CompletionResponse {
            content,
            model: completion.model,
            usage: usage.unwrap_or_default(),
            finish_reason: choice.finish_reason,
        })
    }

    fn provider_name(&self) -> &str {
        self.provider_name
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// Ollama native chat API structures (the native API accepts base64 images)
#[derive(Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaMessage {
    role: &'static str,
    content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    images: Vec<String>,
}

#[derive(Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    model: String,
    message: OllamaResponseMessage,
    #[serde(default)]
    prompt_eval_count: u32,
    #[serde(default)]
    eval_count: u32,
    done_reason: Option<String>,
}

#[derive(Deserialize)]
struct OllamaResponseMessage {
    content: String,
}

/// Ollama provider client (local models)
pub struct OllamaClient {
    client: Client,
    model: String,
    base_url: String,
}

impl OllamaClient {
    pub fn new(
        model: String,
        base_url: Option<String>,
        timeouts: ProviderTimeouts,
    ) -> Result<Self, InferenceError> {
        let base_url = base_url.unwrap_or_else(|| "http://localhost:11434".to_string());
        let client = build_provider_http_client(timeouts)?;

        Ok(Self {
            client,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ModelProviderClient for OllamaClient {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<CompletionResponse, InferenceError> {
        let request = OllamaChatRequest {
            model: self.model.clone(),
            messages: messages
                .into_iter()
                .map(|msg| OllamaMessage {
                    role: role_to_string(msg.role),
                    images: msg.images.iter().map(ImageAttachment::to_base64).collect(),
                    content: msg.content,
                })
                .collect(),
            stream: false,
            options: OllamaOptions {
                temperature: options.temperature,
                num_predict: options.max_tokens,
                top_p: options.top_p,
                stop: options.stop,
            },
        };

        let url = format!("{}/api/chat", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(map_http_error)?;

        if !response.status().is_success() {
            return Err(error_for_response(response).await);
        }

        let completion: OllamaChatResponse = response.json().await.map_err(|e| {
            InferenceError::MalformedResponse(format!("Failed to parse response: {}", e))
        })?;

        Ok(CompletionResponse {
            content: completion.message.content,
            model: completion.model,
            usage: TokenUsage {
                prompt_tokens: completion.prompt_eval_count,
                completion_tokens: completion.eval_count,
                total_tokens: completion.prompt_eval_count + completion.eval_count,
            },
            finish_reason: completion.done_reason,
        })
    }

    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Provider factory for creating provider clients
pub struct ProviderFactory;

impl ProviderFactory {
    pub fn create_client(
        provider: &ModelProvider,
        timeouts: ProviderTimeouts,
    ) -> Result<Arc<dyn ModelProviderClient>, InferenceError> {
        match provider {
            ModelProvider::OpenAI {
                model,
                api_key,
                base_url,
            } => Ok(Arc::new(OpenAIClient::new(
                model.clone(),
                api_key.clone(),
                base_url.clone(),
                timeouts,
            )?)),
            ModelProvider::Ollama { model, base_url } => Ok(Arc::new(OllamaClient::new(
                model.clone(),
                base_url.clone(),
                timeouts,
            )?)),
            ModelProvider::LocalCustom {
                model,
                endpoint,
                api_key,
            } => Ok(Arc::new(OpenAIClient::custom_local(
                model.clone(),
                endpoint.clone(),
                api_key.clone(),
                timeouts,
            )?)),
        }
    }
}

/// Stands in when no provider can be built from configuration. Every request
/// fails with the configuration problem.
pub struct UnconfiguredProvider {
    reason: String,
    model: String,
}

impl UnconfiguredProvider {
    pub fn new(reason: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl ModelProviderClient for UnconfiguredProvider {
    async fn complete(
        &self,
        _messages: Vec<ChatMessage>,
        _options: CompletionOptions,
    ) -> Result<CompletionResponse, InferenceError> {
        Err(InferenceError::NotConfigured(self.reason.clone()))
    }

    fn provider_name(&self) -> &str {
        "unconfigured"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// Mock provider for testing
#[cfg(test)]
pub type MockResponder =
    dyn Fn(&[ChatMessage]) -> Result<String, InferenceError> + Send + Sync;

#[cfg(test)]
pub struct MockProvider {
    responder: Box<MockResponder>,
    calls: parking_lot::Mutex<Vec<Vec<ChatMessage>>>,
}

#[cfg(test)]
impl MockProvider {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&[ChatMessage]) -> Result<String, InferenceError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: parking_lot::Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[cfg(test)]
#[async_trait]
impl ModelProviderClient for MockProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        _options: CompletionOptions,
    ) -> Result<CompletionResponse, InferenceError> {
        let result = (self.responder)(&messages);
        self.calls.lock().push(messages);
        Ok(CompletionResponse {
            content: result?,
            model: "mock-model".to_string(),
            usage: TokenUsage::default(),
            finish_reason: Some("stop".to_string()),
        })
    }

    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}
