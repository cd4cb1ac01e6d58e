// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors for loading runner configuration.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The YAML configuration could not be parsed.
    #[error("invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The TOML configuration could not be parsed.
    #[error("invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    /// An external module source listed in the config could not be read.
    #[error("failed to read source of external module '{module_id}' at '{path}': {source}")]
    ModuleSource {
        module_id: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An external module id collides with a built-in module id.
    #[error("external module '{0}' shadows a built-in module")]
    ShadowsBuiltin(String),
}
