// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Control-flow blocks and pending jump patches.
//!
//! Every loop, switch, labelled block and try region pushes a [`Block`].
//! Forward jumps out of a block (`break`, `continue`, `return` through a
//! try) are recorded as [`Patch`]es on the block they must leave and are
//! resolved when the target position becomes known.

use std::fmt;
use std::ops::BitOr;

use tracing::debug;

use super::index::Index;
use crate::{Error, Result};

/// Kind of control-flow block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// `while`, `do`, `for`, `for-in`
    Loop,
    /// `switch`
    Switch,
    /// Plain or labelled statement block
    Block,
    /// Protected region of `try` or `catch`
    Try,
}

impl BlockKind {
    const fn bit(self) -> u8 {
        match self {
            BlockKind::Loop => 1,
            BlockKind::Switch => 2,
            BlockKind::Block => 4,
            BlockKind::Try => 8,
        }
    }
}

/// Set of block kinds a jump may target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockMask(u8);

impl BlockMask {
    /// Loops only.
    pub const LOOP: BlockMask = BlockMask(BlockKind::Loop.bit());
    /// Switches only.
    pub const SWITCH: BlockMask = BlockMask(BlockKind::Switch.bit());
    /// Plain blocks only.
    pub const BLOCK: BlockMask = BlockMask(BlockKind::Block.bit());
    /// Try regions only.
    pub const TRY: BlockMask = BlockMask(BlockKind::Try.bit());
    /// Targets of an unlabelled `break`.
    pub const ALL: BlockMask = BlockMask(BlockKind::Loop.bit() | BlockKind::Switch.bit());

    /// Returns true if `kind` is in the set.
    pub fn contains(self, kind: BlockKind) -> bool {
        self.0 & kind.bit() != 0
    }

    fn includes(self, other: BlockMask) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for BlockMask {
    type Output = BlockMask;

    fn bitor(self, rhs: BlockMask) -> BlockMask {
        BlockMask(self.0 | rhs.0)
    }
}

/// Jump label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Label {
    /// No label; matches the innermost block of the requested kind
    None,
    /// User label
    Named(String),
    /// Pending `return` routed through `finally`
    Return,
}

impl Label {
    /// Wraps an optional user label.
    pub fn from_name(name: Option<&str>) -> Label {
        match name {
            Some(name) if !name.is_empty() => Label::Named(name.to_string()),
            _ => Label::None,
        }
    }

    /// Returns true for [`Label::None`].
    pub fn is_none(&self) -> bool {
        matches!(self, Label::None)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::None => Ok(()),
            Label::Named(name) => f.write_str(name),
            Label::Return => f.write_str("@return"),
        }
    }
}

/// Jump field awaiting its target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    /// Absolute byte offset of the `i32` jump field
    pub jump_offset: usize,
    /// Label the jump was issued with
    pub label: Label,
}

/// An open control-flow block.
#[derive(Debug)]
pub struct Block {
    /// Block kind
    pub kind: BlockKind,
    /// Block label
    pub label: Label,
    /// Pending `continue` jumps
    pub continuation: Vec<Patch>,
    /// Pending exits
    pub exit: Vec<Patch>,
    /// Exit discriminant slot of a try region
    pub index: Option<Index>,
}

/// Stack of open blocks, innermost last.
#[derive(Debug, Default)]
pub struct BlockStack {
    blocks: Vec<Block>,
}

impl BlockStack {
    /// Creates an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a block. Returns its depth.
    pub fn start(&mut self, kind: BlockKind, label: Label) -> usize {
        debug!(?kind, %label, "block start");

        self.blocks.push(Block {
            kind,
            label,
            continuation: Vec::new(),
            exit: Vec::new(),
            index: None,
        });

        self.blocks.len() - 1
    }

    /// Closes the innermost block.
    pub fn pop(&mut self) -> Option<Block> {
        let block = self.blocks.pop();

        if let Some(block) = &block {
            debug!(kind = ?block.kind, "block exit");
        }

        block
    }

    /// Number of open blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Returns true when no block is open.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Block at `depth`.
    pub fn get(&self, depth: usize) -> &Block {
        &self.blocks[depth]
    }

    /// Mutable block at `depth`.
    pub fn get_mut(&mut self, depth: usize) -> &mut Block {
        &mut self.blocks[depth]
    }

    /// Innermost block matching `mask` and `label` among the outermost
    /// `limit` blocks.
    pub fn lookup(&self, limit: usize, mask: BlockMask, label: &Label) -> Option<usize> {
        let (mask, label) = match label {
            Label::Return => (BlockMask::TRY, &Label::None),
            _ => (mask, label),
        };

        self.blocks[..limit].iter().rposition(|block| {
            mask.contains(block.kind) && (label.is_none() || block.label == *label)
        })
    }

    /// Resolves the block a jump must be recorded on.
    ///
    /// A try region between the jump and its destination is returned in
    /// place of the destination, since its `finally` has to run first.
    pub fn find(&self, mask: BlockMask, label: &Label) -> Option<usize> {
        let mut mask = mask;

        if mask.includes(BlockMask::ALL) && matches!(label, Label::Named(_)) {
            mask = mask | BlockMask::BLOCK;
        }

        let dest = self.lookup(self.blocks.len(), mask, label);

        let found = dest.map(|dest| {
            (dest..self.blocks.len())
                .rev()
                .find(|&depth| self.blocks[depth].kind == BlockKind::Try)
                .unwrap_or(dest)
        });

        debug!(?found, %label, "block find");

        found
    }

    /// Picks the single destination label of exits converging on one
    /// `finally`. `None` stands for "no exit of this kind".
    pub fn jump_destination(
        &self,
        limit: usize,
        kind: &str,
        mask: BlockMask,
        label1: Option<&Label>,
        label2: Option<&Label>,
    ) -> Result<Option<Label>> {
        let (label1, label2) = match (label1, label2) {
            (None, other) | (other, None) => return Ok(other.cloned()),
            (Some(a), Some(b)) => (a, b),
        };

        let block1 = self.lookup(limit, mask, label1);
        let block2 = self.lookup(limit, mask, label2);

        if block1 != block2 {
            return Err(Error::internal(format!(
                "{kind} instructions with different labels (\"{label1}\" vs \"{label2}\") \
                 from try-catch block are not supported"
            )));
        }

        Ok(Some(label1.clone()))
    }

    /// Records a pending `continue` on the block at `depth`.
    pub fn make_continuation_patch(&mut self, depth: usize, label: Label, jump_offset: usize) {
        debug!(depth, jump_offset, %label, "make continuation patch");
        self.blocks[depth].continuation.push(Patch { jump_offset, label });
    }

    /// Records a pending exit on the block at `depth`.
    pub fn make_exit_patch(&mut self, depth: usize, label: Label, jump_offset: usize) {
        debug!(depth, jump_offset, %label, "make exit patch");
        self.blocks[depth].exit.push(Patch { jump_offset, label });
    }

    /// Outermost try region, if any.
    pub fn outermost_try(&self) -> Option<usize> {
        self.blocks.iter().position(|b| b.kind == BlockKind::Try)
    }
}

impl Block {
    /// Label of the most recent pending `continue`.
    pub fn continuation_label(&self) -> Option<&Label> {
        self.continuation.last().map(|p| &p.label)
    }

    /// Label of the most recent pending exit.
    pub fn exit_label(&self) -> Option<&Label> {
        self.exit.last().map(|p| &p.label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(s: &str) -> Label {
        Label::Named(s.to_string())
    }

    #[test]
    fn test_lookup_innermost() {
        let mut stack = BlockStack::new();
        stack.start(BlockKind::Loop, Label::None);
        stack.start(BlockKind::Switch, Label::None);
        let inner = stack.start(BlockKind::Loop, Label::None);

        assert_eq!(stack.lookup(stack.len(), BlockMask::LOOP, &Label::None), Some(inner));
        assert_eq!(stack.lookup(inner, BlockMask::LOOP, &Label::None), Some(0));
        assert_eq!(stack.lookup(stack.len(), BlockMask::SWITCH, &Label::None), Some(1));
    }

    #[test]
    fn test_lookup_label() {
        let mut stack = BlockStack::new();
        stack.start(BlockKind::Loop, named("outer"));
        stack.start(BlockKind::Loop, Label::None);

        assert_eq!(stack.lookup(2, BlockMask::LOOP, &named("outer")), Some(0));
        assert_eq!(stack.lookup(2, BlockMask::LOOP, &named("missing")), None);
    }

    #[test]
    fn test_find_labelled_block() {
        let mut stack = BlockStack::new();
        stack.start(BlockKind::Block, named("b"));
        stack.start(BlockKind::Loop, Label::None);

        assert_eq!(stack.find(BlockMask::ALL, &named("b")), Some(0));
        assert_eq!(stack.find(BlockMask::LOOP, &named("b")), None);
        assert_eq!(stack.find(BlockMask::ALL, &Label::None), Some(1));
    }

    #[test]
    fn test_find_routes_through_try() {
        let mut stack = BlockStack::new();
        stack.start(BlockKind::Loop, Label::None);
        let try_depth = stack.start(BlockKind::Try, Label::None);
        stack.start(BlockKind::Block, Label::None);

        assert_eq!(stack.find(BlockMask::ALL, &Label::None), Some(try_depth));
    }

    #[test]
    fn test_find_try_outside_destination_is_ignored() {
        let mut stack = BlockStack::new();
        stack.start(BlockKind::Try, Label::None);
        let inner = stack.start(BlockKind::Loop, Label::None);

        assert_eq!(stack.find(BlockMask::LOOP, &Label::None), Some(inner));
    }

    #[test]
    fn test_return_label_matches_try() {
        let mut stack = BlockStack::new();
        stack.start(BlockKind::Try, Label::None);
        stack.start(BlockKind::Loop, Label::None);

        assert_eq!(stack.lookup(2, BlockMask::LOOP, &Label::Return), Some(0));
    }

    #[test]
    fn test_jump_destination() {
        let mut stack = BlockStack::new();
        stack.start(BlockKind::Loop, named("a"));
        stack.start(BlockKind::Loop, named("b"));

        let same = stack.jump_destination(2, "break/return", BlockMask::ALL, Some(&named("b")), Some(&Label::None));
        assert_eq!(same.unwrap(), Some(named("b")));

        let one = stack.jump_destination(2, "continue", BlockMask::LOOP, None, Some(&named("a")));
        assert_eq!(one.unwrap(), Some(named("a")));

        let err = stack
            .jump_destination(2, "continue", BlockMask::LOOP, Some(&named("a")), Some(&named("b")))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "InternalError: continue instructions with different labels (\"a\" vs \"b\") \
             from try-catch block are not supported"
        );
    }

    #[test]
    fn test_patch_lists() {
        let mut stack = BlockStack::new();
        let depth = stack.start(BlockKind::Loop, Label::None);
        stack.make_exit_patch(depth, Label::None, 8);
        stack.make_exit_patch(depth, named("x"), 20);
        stack.make_continuation_patch(depth, Label::None, 40);

        let block = stack.pop().unwrap();
        assert_eq!(block.exit.len(), 2);
        assert_eq!(block.exit_label(), Some(&named("x")));
        assert_eq!(block.continuation_label(), Some(&Label::None));
        assert!(stack.is_empty());
    }
}
