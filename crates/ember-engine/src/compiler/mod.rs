// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Bytecode generator for JavaScript.
//!
//! Lowers a resolved AST into fixed-size instruction records.
//!
//! # Module Structure
//!
//! - `bytecode`: Record layouts, opcodes, constants and the decoder
//! - `index`: Packed slot references and the temporary allocator
//! - `buffer`: Growable code buffer with in-place patching
//! - `block`: Block stack and pending jump patches
//! - `lines`: Offset to source line map
//! - `generator`: Code generation from the AST
//!   - `generator::statements`: Statements and control flow
//!   - `generator::expressions`: Expressions and calls
//!   - `generator::exceptions`: Exception regions
//! - `disasm`: Text listing of generated code

pub mod block;
pub mod buffer;
pub mod bytecode;
pub mod disasm;
pub mod index;
pub mod lines;

mod generator;

pub use bytecode::{Bytecode, Code, Constant, Instruction, Lambda, OpCode};
pub use disasm::disassemble;
pub use generator::generate;
pub use index::{Index, Level};
