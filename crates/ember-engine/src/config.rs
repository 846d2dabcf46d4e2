// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Generator configuration.

use serde::{Deserialize, Serialize};

/// Nesting ceiling for function scopes.
pub const FUNCTION_MAX_DEPTH: u32 = 128;

/// Options controlling bytecode generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorOptions {
    /// Compile unit name used in diagnostics
    pub file: String,

    /// Build a bytecode offset to source line map
    pub lines: bool,

    /// Maximum nesting of function scopes
    pub max_function_depth: u32,

    /// Maximum recursion depth while walking statements and expressions
    pub max_recursion_depth: u32,

    /// Initial code buffer capacity in bytes
    pub initial_code_size: usize,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            file: "main".to_string(),
            lines: true,
            max_function_depth: FUNCTION_MAX_DEPTH,
            max_recursion_depth: 512,
            initial_code_size: 128,
        }
    }
}

impl GeneratorOptions {
    /// Returns options with the given unit name.
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = file.into();
        self
    }

    /// Returns options with the line map switched on or off.
    pub fn with_lines(mut self, lines: bool) -> Self {
        self.lines = lines;
        self
    }

    /// Returns options with a different recursion ceiling.
    pub fn with_max_recursion_depth(mut self, depth: u32) -> Self {
        self.max_recursion_depth = depth;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = GeneratorOptions::default();
        assert_eq!(options.max_function_depth, 128);
        assert!(options.lines);
        assert_eq!(options.initial_code_size, 128);
    }

    #[test]
    fn test_partial_deserialize() {
        let options: GeneratorOptions =
            serde_json::from_str(r#"{"lines": false, "file": "a.js"}"#).unwrap();
        assert!(!options.lines);
        assert_eq!(options.file, "a.js");
        assert_eq!(options.max_recursion_depth, 512);
    }
}
