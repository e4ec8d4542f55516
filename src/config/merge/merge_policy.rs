//! Merge rules: defaults, override order, conflict handling.

use config::builder::DefaultState;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
///
/// Only keys other layers commonly override are seeded here; every other field
/// falls back to its serde default.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("provider.provider_type", "openai")?
        .set_default("provider.model", "gpt-4o")?
        .set_default("extraction.frames_dir", "data/frames")?
        .set_default("extraction.default_interval", 30)?
        .set_default("extraction.jpeg_quality", 85)
}
