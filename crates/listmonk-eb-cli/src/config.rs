//! CLI configuration

use crate::error::{CliError, CliResult};
use listmonk_eb_types::StackParameters;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// CLI configuration file (`config.toml`)
///
/// ```toml
/// [stack]
/// account = "123456789012"
/// certificate_arn = "arn:aws:acm:us-east-1:123456789012:certificate/..."
/// image_tag = "v5.0.3"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct CliConfig {
    /// Plan parameters; flags and environment variables override them
    #[serde(default)]
    pub stack: StackParameters,
}

impl CliConfig {
    /// Load configuration from file
    pub fn load(path: Option<&Path>) -> CliResult<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_config_path()?,
        };

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            let config: CliConfig = toml::from_str(&contents)
                .map_err(|e| CliError::Config(format!("{}: {e}", config_path.display())))?;
            Ok(config)
        } else {
            Ok(CliConfig::default())
        }
    }

    /// Get the default configuration file path
    fn default_config_path() -> CliResult<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| CliError::Config("Cannot find config directory".into()))?;
        Ok(config_dir.join("listmonk-eb").join("config.toml"))
    }
}
