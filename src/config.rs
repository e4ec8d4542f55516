//! Configuration System
//!
//! Layered configuration: built-in defaults, the global user file, workspace
//! files, then `MINEWATCH__` environment variables. Validation reports every
//! problem at once.

use crate::analysis::PromptSet;
use crate::extraction::{DEFAULT_FRAME_INTERVAL, DEFAULT_JPEG_QUALITY};
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use crate::provider::{ProviderConfig, ProviderType};

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;
pub use sources::global_file::global_config_path;

/// Default textual site context for analysis prompts
pub const DEFAULT_CONTEXT: &str =
    "Site type: open pit; Mineral: Gold; tropical climate, rainfall patterns, tailings overflow.";

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MinewatchConfig {
    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub extraction: ExtractionConfig,

    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Frame extraction settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Directory holding the frames of the active video
    pub frames_dir: PathBuf,

    /// Stride used when a request gives none or an unusable one
    pub default_interval: u64,

    /// JPEG quality, 1-100
    pub jpeg_quality: u8,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            frames_dir: PathBuf::from("data/frames"),
            default_interval: DEFAULT_FRAME_INTERVAL,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

/// Analysis settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Context used when a request supplies none
    pub default_context: String,

    pub relevance_max_tokens: u32,
    pub category_max_tokens: u32,
    pub summary_max_tokens: u32,

    pub prompts: PromptSet,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            default_context: DEFAULT_CONTEXT.to_string(),
            relevance_max_tokens: crate::analysis::relevance::RELEVANCE_MAX_TOKENS,
            category_max_tokens: crate::analysis::category::CATEGORY_MAX_TOKENS,
            summary_max_tokens: crate::analysis::summary::SUMMARY_MAX_TOKENS,
            prompts: PromptSet::default(),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigIssue {
    Provider(String),
    Extraction(String),
    Analysis(String),
    Logging(String),
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigIssue::Provider(msg) => write!(f, "Provider: {}", msg),
            ConfigIssue::Extraction(msg) => write!(f, "Extraction: {}", msg),
            ConfigIssue::Analysis(msg) => write!(f, "Analysis: {}", msg),
            ConfigIssue::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ConfigIssue {}

impl ExtractionConfig {
    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.frames_dir.as_os_str().is_empty() {
            errors.push("frames_dir cannot be empty".to_string());
        }
        if self.default_interval == 0 {
            errors.push("default_interval must be at least 1".to_string());
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            errors.push(format!(
                "jpeg_quality must be between 1 and 100, got {}",
                self.jpeg_quality
            ));
        }
        errors
    }
}

impl AnalysisConfig {
    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = self.prompts.validation_errors();
        for (name, value) in [
            ("relevance_max_tokens", self.relevance_max_tokens),
            ("category_max_tokens", self.category_max_tokens),
            ("summary_max_tokens", self.summary_max_tokens),
        ] {
            if value == 0 {
                errors.push(format!("{} must be greater than 0", name));
            }
        }
        errors
    }
}

impl MinewatchConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ConfigIssue>> {
        let mut errors = Vec::new();
        errors.extend(
            self.provider
                .validation_errors()
                .into_iter()
                .map(ConfigIssue::Provider),
        );
        errors.extend(
            self.extraction
                .validation_errors()
                .into_iter()
                .map(ConfigIssue::Extraction),
        );
        errors.extend(
            self.analysis
                .validation_errors()
                .into_iter()
                .map(ConfigIssue::Analysis),
        );
        errors.extend(
            self.logging
                .validation_errors()
                .into_iter()
                .map(ConfigIssue::Logging),
        );

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Effective configuration as TOML, with secrets masked
    pub fn to_toml_redacted(&self) -> Result<String, toml::ser::Error> {
        let mut redacted = self.clone();
        if redacted.provider.api_key.is_some() {
            redacted.provider.api_key = Some("********".to_string());
        }
        toml::to_string_pretty(&redacted)
    }
}
