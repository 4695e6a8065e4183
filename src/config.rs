//! Configuration for the schema graph engine
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (anchor-schemas.toml)
//! - Environment variables (ANCHOR_SCHEMAS__*)
//!
//! ## Example config file (anchor-schemas.toml):
//! ```toml
//! [export]
//! output_format = "pretty"
//! include_checksum = true
//!
//! [ingest]
//! assign_missing_uids = true
//! trim_ids = true
//!
//! [deploy]
//! dedupe_items = false
//! ```

use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

/// Main engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Export document settings
    #[serde(default)]
    pub export: ExportConfig,

    /// Payload ingest settings
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Deployment placement settings
    #[serde(default)]
    pub deploy: DeployConfig,
}

/// Export configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Output format (pretty or compact)
    #[serde(default = "default_output_format")]
    pub output_format: OutputFormat,

    /// Stamp a SHA-256 checksum of the root on every export document
    #[serde(default = "default_true")]
    pub include_checksum: bool,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

/// Ingest configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Assign identities to inserted or replaced nodes that lack one
    #[serde(default = "default_true")]
    pub assign_missing_uids: bool,

    /// Trim whitespace around comma-separated ids in delete calls
    #[serde(default = "default_true")]
    pub trim_ids: bool,
}

/// Deployment configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeployConfig {
    /// Skip placing an fqn already present in the target bucket
    #[serde(default)]
    pub dedupe_items: bool,
}

fn default_true() -> bool {
    true
}

fn default_output_format() -> OutputFormat {
    OutputFormat::Pretty
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_format: default_output_format(),
            include_checksum: true,
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            assign_missing_uids: true,
            trim_ids: true,
        }
    }
}

impl EngineConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration, layering an explicit file over the default locations
    pub fn load_from(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_locations = [
            "anchor-schemas.toml",
            ".anchor-schemas.toml",
            "config/anchor-schemas.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(dirs) = directories::ProjectDirs::from("dev", "anchor", "anchor-schemas") {
            let xdg_config = dirs.config_dir().join("anchor-schemas.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        // ANCHOR_SCHEMAS__INGEST__TRIM_IDS=false
        builder = builder.add_source(
            Environment::with_prefix("ANCHOR_SCHEMAS")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize::<Self>()?)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
