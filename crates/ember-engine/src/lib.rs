// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # ember-engine
//!
//! The compile-time core of the ember JavaScript engine.
//!
//! ## Overview
//!
//! This crate provides the two performance-critical pieces of the engine:
//! - A bytecode generator that lowers a resolved AST into a flat stream of
//!   fixed-size instruction records, with slot allocation, block tracking
//!   and forward-jump patching
//! - A string layer with short/long storage, lazy UTF-8 length, a sparse
//!   character offset map and the bit-exact encoders used by built-ins
//!
//! ## Quick Start
//!
//! ```rust
//! use ember_engine::ast::{Expr, Program, Stmt};
//! use ember_engine::{GeneratorOptions, generate};
//!
//! let mut program = Program::new(vec![
//!     Stmt::var("x", Some(Expr::number(1.0))),
//!     Stmt::expression(Expr::add(Expr::name("x"), Expr::number(2.0))),
//! ]);
//! let mut scopes = ember_engine::ast::resolve(&mut program)?;
//! let bytecode = generate(&program, &mut scopes, &GeneratorOptions::default())?;
//! assert!(!bytecode.main.bytes.is_empty());
//! # Ok::<(), ember_engine::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ast;
pub mod compiler;
pub mod config;
pub mod string;

// Re-exports for convenience
pub use compiler::{Bytecode, Code, generate};
pub use config::GeneratorOptions;
pub use string::JsString;

use thiserror::Error;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while generating code or operating on strings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Compile-time diagnostic tied to a source line
    #[error("SyntaxError: {message} in {file}:{line}")]
    Syntax {
        /// Diagnostic text
        message: String,
        /// Compile unit name
        file: String,
        /// Source line of the offending node
        line: u32,
    },

    /// Generator limitation or broken invariant
    #[error("InternalError: {0}")]
    Internal(String),

    /// Value or depth out of range
    #[error("RangeError: {0}")]
    Range(String),

    /// Operand of the wrong kind
    #[error("TypeError: {0}")]
    Type(String),

    /// Malformed percent-encoding
    #[error("URIError: {0}")]
    Uri(String),

    /// Bytes that are not a valid encoding
    #[error("Error: {0}")]
    Decode(String),

    /// Allocation failure
    #[error("MemoryError")]
    OutOfMemory,
}

impl Error {
    /// Creates a syntax error.
    pub fn syntax(message: impl Into<String>, file: impl Into<String>, line: u32) -> Self {
        Self::Syntax {
            message: message.into(),
            file: file.into(),
            line,
        }
    }

    /// Creates an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Creates a range error.
    pub fn range(msg: impl Into<String>) -> Self {
        Self::Range(msg.into())
    }

    /// Creates a type error.
    pub fn type_error(msg: impl Into<String>) -> Self {
        Self::Type(msg.into())
    }

    /// Creates a URI error.
    pub fn uri(msg: impl Into<String>) -> Self {
        Self::Uri(msg.into())
    }
}

impl From<std::collections::TryReserveError> for Error {
    fn from(_: std::collections::TryReserveError) -> Self {
        Self::OutOfMemory
    }
}
