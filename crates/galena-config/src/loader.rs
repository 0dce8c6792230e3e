//! Configuration loader with multi-source merging.

use crate::GalenaConfig;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Configuration loader with builder pattern.
pub struct ConfigLoader {
    file: Option<PathBuf>,
    env_prefix: String,
}

impl ConfigLoader {
    /// Creates a loader with no config file (defaults + environment only).
    pub fn new() -> Self {
        Self {
            file: None,
            env_prefix: "GALENA".to_string(),
        }
    }

    /// Adds a TOML config file as a source.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the environment variable prefix (default: "GALENA").
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Loads configuration from all sources with proper precedence.
    pub fn load(self) -> Result<GalenaConfig> {
        let mut builder = config::Config::builder();

        // 1. Start with built-in defaults
        let defaults = GalenaConfig::default();
        builder = builder.add_source(config::Config::try_from(&defaults)?);

        // 2. The config file, when one was given
        if let Some(file) = &self.file {
            builder = builder.add_source(
                config::File::from(file.clone())
                    .required(true)
                    .format(config::FileFormat::Toml),
            );
        }

        // 3. Environment variables (GALENA_NODE__BIND etc.)
        builder = builder.add_source(
            config::Environment::with_prefix(&self.env_prefix)
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("failed to build configuration")?;

        let galena_config: GalenaConfig = config
            .try_deserialize()
            .context("failed to deserialize configuration")?;

        galena_config
            .validate()
            .context("invalid configuration")?;

        Ok(galena_config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
