// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Package engine configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Package engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding package files
    pub root_dir: PathBuf,

    /// Package file extension, without the dot
    pub extension: String,

    /// Write to a temporary sibling and rename over the target
    pub atomic_writes: bool,

    /// Reload dependencies that are already resident instead of reusing them
    pub reload_resident_dependencies: bool,

    /// Reject a save whose written payload differs from the dry-run size
    pub verify_sizes: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("."),
            extension: "gdpk".to_string(),
            atomic_writes: true,
            reload_resident_dependencies: false,
            verify_sizes: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Parse a JSON document; missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }
}

/// Config builder for fluent API
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    root_dir: Option<PathBuf>,
    extension: Option<String>,
    atomic_writes: Option<bool>,
    reload_resident_dependencies: Option<bool>,
    verify_sizes: Option<bool>,
}

impl ConfigBuilder {
    pub fn root_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.root_dir = Some(dir.into());
        self
    }

    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }

    pub fn atomic_writes(mut self, enabled: bool) -> Self {
        self.atomic_writes = Some(enabled);
        self
    }

    pub fn reload_resident_dependencies(mut self, enabled: bool) -> Self {
        self.reload_resident_dependencies = Some(enabled);
        self
    }

    pub fn verify_sizes(mut self, enabled: bool) -> Self {
        self.verify_sizes = Some(enabled);
        self
    }

    /// Build the config, using defaults for unset fields
    pub fn build(self) -> Config {
        let defaults = Config::default();
        Config {
            root_dir: self.root_dir.unwrap_or(defaults.root_dir),
            extension: self.extension.unwrap_or(defaults.extension),
            atomic_writes: self.atomic_writes.unwrap_or(defaults.atomic_writes),
            reload_resident_dependencies: self
                .reload_resident_dependencies
                .unwrap_or(defaults.reload_resident_dependencies),
            verify_sizes: self.verify_sizes.unwrap_or(defaults.verify_sizes),
        }
    }
}
