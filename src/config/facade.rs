//! Entry point for loading configuration.

use crate::config::merge::merge_policy;
use crate::config::sources::{environment, global_file, workspace_file};
use crate::config::MinewatchConfig;
use config::{ConfigError, File};
use std::path::Path;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for `workspace_root`.
    ///
    /// Precedence (lowest to highest): defaults, global file, workspace
    /// `config/config.toml`, `config/{MINEWATCH_ENV}.toml`, environment.
    pub fn load(workspace_root: &Path) -> Result<MinewatchConfig, ConfigError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = environment::add_to_builder(builder);
        builder.build()?.try_deserialize()
    }

    /// Load from a single explicit file, still honouring defaults and
    /// environment overrides
    pub fn load_from_file(path: &Path) -> Result<MinewatchConfig, ConfigError> {
        let builder = merge_policy::builder_with_defaults()?
            .add_source(File::from(path).required(true));
        environment::add_to_builder(builder)
            .build()?
            .try_deserialize()
    }
}
