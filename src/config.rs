// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! CLI configuration.
//!
//! ```toml
//! [generator]
//! lines = false
//! max_recursion_depth = 1024
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ember_engine::GeneratorOptions;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Settings read from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bytecode generation options
    pub generator: GeneratorOptions,
}

impl Config {
    /// Loads `path`, or the user config file when none is given.
    ///
    /// A missing user config file yields the defaults; a missing explicit
    /// file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match user_config_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading config");

        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;

        Self::parse(&content).with_context(|| format!("invalid config file {}", path.display()))
    }

    fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// `<config dir>/ember/config.toml`.
fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("ember").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_partial() {
        let config = Config::parse("[generator]\nlines = false\n").unwrap();
        assert!(!config.generator.lines);
        assert_eq!(config.generator.max_function_depth, 128);
        assert_eq!(config.generator.file, "main");
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn test_parse_invalid() {
        assert!(Config::parse("[generator]\nlines = 3\n").is_err());
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = Config::load(Some(Path::new("/nonexistent/ember.toml"))).unwrap_err();
        assert!(err.to_string().contains("failed to read config file"));
    }
}
