//! Provider configuration schema: which backend to call, with which model, and
//! how long to wait for it.

use crate::error::{InferenceError, ValidationError};
use crate::provider::{CompletionOptions, ModelProvider, ProviderTimeouts};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Environment variable consulted when no OpenAI key is configured
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Provider backend kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderType {
    #[serde(rename = "openai")]
    OpenAI,
    #[serde(rename = "ollama")]
    Ollama,
    #[serde(rename = "local")]
    LocalCustom,
}

impl ProviderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderType::OpenAI => "openai",
            ProviderType::Ollama => "ollama",
            ProviderType::LocalCustom => "local",
        }
    }

    pub fn default_endpoint(&self) -> Option<&'static str> {
        match self {
            ProviderType::OpenAI => Some("https://api.openai.com/v1"),
            ProviderType::Ollama => Some("http://localhost:11434"),
            ProviderType::LocalCustom => None,
        }
    }

    pub fn required_api_key_env_var(&self) -> Option<&'static str> {
        match self {
            ProviderType::OpenAI => Some(OPENAI_API_KEY_ENV),
            ProviderType::Ollama | ProviderType::LocalCustom => None,
        }
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderType::OpenAI),
            "ollama" => Ok(ProviderType::Ollama),
            "local" => Ok(ProviderType::LocalCustom),
            other => Err(ValidationError::Config(format!(
                "Invalid provider type: {}. Must be openai, ollama, or local",
                other
            ))),
        }
    }
}

/// Provider section of the configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub provider_type: ProviderType,

    /// Model name (e.g., "gpt-4o", "llava")
    pub model: String,

    /// API key; falls back to the provider's environment variable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL override. Required for `local`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,

    /// Sampling temperature applied to every call
    pub temperature: f32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_type: ProviderType::OpenAI,
            model: "gpt-4o".to_string(),
            api_key: None,
            endpoint: None,
            request_timeout_secs: 120,
            connect_timeout_secs: 10,
            temperature: 0.0,
        }
    }
}

impl ProviderConfig {
    /// Collect every problem with this section instead of stopping at the first
    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.model.trim().is_empty() {
            errors.push("provider.model cannot be empty".to_string());
        }
        if self.request_timeout_secs == 0 {
            errors.push("provider.request_timeout_secs must be greater than 0".to_string());
        }
        if self.connect_timeout_secs == 0 {
            errors.push("provider.connect_timeout_secs must be greater than 0".to_string());
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            errors.push(format!(
                "provider.temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            ));
        }
        if self.provider_type == ProviderType::LocalCustom
            && self.endpoint.as_deref().map_or(true, |e| e.trim().is_empty())
        {
            errors.push("provider.endpoint is required for local providers".to_string());
        }
        errors
    }

    pub fn timeouts(&self) -> ProviderTimeouts {
        ProviderTimeouts {
            connect: Duration::from_secs(self.connect_timeout_secs),
            request: Duration::from_secs(self.request_timeout_secs),
        }
    }

    /// Completion options shared by every call; callers add `max_tokens`
    pub fn completion_options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            ..CompletionOptions::default()
        }
    }

    /// Configured key, or the provider's environment variable
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| {
                self.provider_type
                    .required_api_key_env_var()
                    .and_then(|var| std::env::var(var).ok())
                    .filter(|key| !key.trim().is_empty())
            })
    }

    /// Turn configuration into a concrete provider description
    pub fn to_model_provider(&self) -> Result<ModelProvider, InferenceError> {
        match self.provider_type {
            ProviderType::OpenAI => {
                let api_key = self.resolve_api_key().ok_or_else(|| {
                    InferenceError::NotConfigured(format!(
                        "no API key configured; set provider.api_key or {}",
                        OPENAI_API_KEY_ENV
                    ))
                })?;
                Ok(ModelProvider::OpenAI {
                    model: self.model.clone(),
                    api_key,
                    base_url: self.endpoint.clone(),
                })
            }
            ProviderType::Ollama => Ok(ModelProvider::Ollama {
                model: self.model.clone(),
                base_url: self.endpoint.clone(),
            }),
            ProviderType::LocalCustom => {
                let endpoint = self.endpoint.clone().ok_or_else(|| {
                    InferenceError::NotConfigured(
                        "provider.endpoint is required for local providers".to_string(),
                    )
                })?;
                Ok(ModelProvider::LocalCustom {
                    model: self.model.clone(),
                    endpoint,
                    api_key: self.api_key.clone(),
                })
            }
        }
    }
}
