// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Slot indexes and the temporary slot allocator.
//!
//! An [`Index`] packs a slot number together with the storage level it lives
//! in and the class of variable it holds:
//!
//! ```text
//!  31                      8 7     4 3     0
//! +-------------------------+-------+-------+
//! |          value          | level | class |
//! +-------------------------+-------+-------+
//! ```

use std::fmt;

use smallvec::SmallVec;
use tracing::trace;

use crate::{Error, Result};

const VALUE_SHIFT: u32 = 8;
const LEVEL_SHIFT: u32 = 4;
const MAX_VALUE: u32 = (1 << 24) - 1;

/// Storage level of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Level {
    /// Function frame
    Local = 0,
    /// Captured cell of an enclosing function
    Closure = 1,
    /// Global scope frame
    Global = 2,
    /// Constant pool
    Static = 3,
}

impl Level {
    fn from_bits(bits: u32) -> Level {
        match bits & 0x0F {
            0 => Level::Local,
            1 => Level::Closure,
            2 => Level::Global,
            _ => Level::Static,
        }
    }

    fn prefix(self) -> char {
        match self {
            Level::Local => 'L',
            Level::Closure => 'C',
            Level::Global => 'G',
            Level::Static => 'S',
        }
    }
}

/// Class of the variable held in a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum VarClass {
    /// `const` binding
    Const = 0,
    /// `let` binding
    Let = 1,
    /// `catch` parameter
    Catch = 2,
    /// `var` binding, argument or temporary
    Var = 4,
    /// Function declaration
    Function = 5,
}

impl VarClass {
    fn from_bits(bits: u32) -> VarClass {
        match bits & 0x0F {
            0 => VarClass::Const,
            1 => VarClass::Let,
            2 => VarClass::Catch,
            5 => VarClass::Function,
            _ => VarClass::Var,
        }
    }
}

/// A packed slot reference.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Index(u32);

impl Index {
    /// Constant pool slot 0, always `undefined`.
    pub const UNDEFINED: Index = Index((Level::Static as u32) << LEVEL_SHIFT);

    /// Packs a slot reference.
    pub fn new(value: u32, level: Level, class: VarClass) -> Result<Index> {
        if value > MAX_VALUE {
            return Err(Error::internal("too many values in scope"));
        }

        Ok(Index(
            (value << VALUE_SHIFT) | ((level as u32) << LEVEL_SHIFT) | class as u32,
        ))
    }

    /// The reserved `this` slot of a frame at `level`.
    pub const fn this(level: Level) -> Index {
        Index(((level as u32) << LEVEL_SHIFT) | VarClass::Var as u32)
    }

    /// Rebuilds an index from raw instruction bits.
    pub const fn from_bits(bits: u32) -> Index {
        Index(bits)
    }

    /// Raw bits as stored in instruction fields.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Slot number within its level.
    pub const fn value(self) -> u32 {
        self.0 >> VALUE_SHIFT
    }

    /// Storage level.
    pub fn level(self) -> Level {
        Level::from_bits(self.0 >> LEVEL_SHIFT)
    }

    /// Variable class.
    pub fn class(self) -> VarClass {
        VarClass::from_bits(self.0)
    }
}

impl fmt::Debug for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Index({self})")
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.level().prefix(), self.value())
    }
}

/// Hands out temporary slots for one function frame.
///
/// Released slots are reused last-in first-out so that hot temporaries keep
/// low slot numbers.
#[derive(Debug)]
pub struct IndexAllocator {
    items: u32,
    level: Level,
    cache: SmallVec<[Index; 16]>,
}

impl IndexAllocator {
    /// Creates an allocator continuing after `items` already assigned slots.
    pub fn new(items: u32, level: Level) -> Self {
        Self {
            items,
            level,
            cache: SmallVec::new(),
        }
    }

    /// Returns a free temporary slot.
    pub fn get(&mut self) -> Result<Index> {
        if let Some(index) = self.cache.pop() {
            trace!(%index, "reuse temp");
            return Ok(index);
        }

        let index = Index::new(self.items, self.level, VarClass::Var)?;
        self.items += 1;

        Ok(index)
    }

    /// Returns a slot to the cache.
    pub fn release(&mut self, index: Index) {
        trace!(%index, "release temp");
        self.cache.push(index);
    }

    /// Total slots used by the frame so far.
    pub fn items(&self) -> u32 {
        self.items
    }

    /// Level of slots minted by this allocator.
    pub fn level(&self) -> Level {
        self.level
    }
}
