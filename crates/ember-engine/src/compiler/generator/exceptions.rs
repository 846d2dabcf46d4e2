// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Exception regions and the jumps that leave them.
//!
//! A jump out of a `try` or `catch` body is first recorded on the try block.
//! When the body ends, those pending jumps land on a `TRY_BREAK` or
//! `TRY_CONTINUE` trampoline that stores the exit kind in the region's exit
//! slot and falls into `finally`. The `FINALLY` record then carries the real
//! continue and break targets, which are patched on the enclosing blocks.

use tracing::debug;

use super::{Generator, Slot};
use crate::ast::{CatchClause, Expr, Stmt};
use crate::compiler::block::{Block, BlockKind, BlockMask, Label};
use crate::compiler::bytecode::{OpCode, field};
use crate::compiler::index::Index;
use crate::{Error, Result};

/// Labels of the jumps that left a `try` statement's bodies.
#[derive(Debug, Default)]
struct TryExits {
    try_exit: Option<Label>,
    try_continue: Option<Label>,
    catch_exit: Option<Label>,
    catch_continue: Option<Label>,
}

impl Generator<'_> {
    pub(super) fn break_statement(&mut self, label: Option<&str>) -> Result<()> {
        let label = Label::from_name(label);

        let Some(depth) = self.blocks.find(BlockMask::ALL, &label) else {
            return Err(self.syntax_error("Illegal break statement"));
        };

        let block = self.blocks.get(depth);
        if block.kind == BlockKind::Try && !block.exit.is_empty() {
            self.blocks
                .jump_destination(depth, "break/return", BlockMask::ALL, block.exit_label(), Some(&label))?;
        }

        let jump = self.emit(OpCode::Jump, &[field(0) as u32])?;
        self.blocks.make_exit_patch(depth, label, jump + field(0));

        Ok(())
    }

    pub(super) fn continue_statement(&mut self, label: Option<&str>) -> Result<()> {
        let label = Label::from_name(label);

        let Some(depth) = self.blocks.find(BlockMask::LOOP, &label) else {
            return Err(self.syntax_error("Illegal continue statement"));
        };

        let block = self.blocks.get(depth);
        if block.kind == BlockKind::Try && !block.continuation.is_empty() {
            self.blocks.jump_destination(
                depth,
                "continue",
                BlockMask::LOOP,
                block.continuation_label(),
                Some(&label),
            )?;
        }

        let jump = self.emit(OpCode::Jump, &[field(0) as u32])?;
        self.blocks.make_continuation_patch(depth, label, jump + field(0));

        Ok(())
    }

    pub(super) fn return_statement(&mut self, value: Option<&Expr>) -> Result<()> {
        let value = match value {
            Some(value) => self.expression(value, None)?,
            None => Slot::named(Index::UNDEFINED),
        };

        let Some(immediate) = self.blocks.lookup(self.blocks.len(), BlockMask::TRY, &Label::None) else {
            self.emit(OpCode::Return, &[value.bits()])?;
            self.release(value);
            return Ok(());
        };

        let block = self.blocks.get(immediate);
        if !block.exit.is_empty() {
            self.blocks.jump_destination(
                immediate,
                "break/return",
                BlockMask::ALL,
                block.exit_label(),
                Some(&Label::Return),
            )?;
        }

        // The value is stashed in the exit slot of the outermost region so
        // every enclosing `finally` runs before the function returns.
        let outermost = self.blocks.outermost_try().unwrap_or(immediate);
        let save = self
            .blocks
            .get(outermost)
            .index
            .ok_or_else(|| Error::internal("try block without exit slot"))?;

        let record = self.emit(OpCode::TryReturn, &[save.bits(), value.bits(), field(2) as u32])?;
        self.blocks.make_exit_patch(immediate, Label::Return, record + field(2));

        self.release(value);

        Ok(())
    }

    // ========================================================================
    // try / catch / finally
    // ========================================================================

    pub(super) fn try_statement(
        &mut self,
        body: &[Stmt],
        handler: Option<&CatchClause>,
        finalizer: Option<&[Stmt]>,
    ) -> Result<()> {
        let exception = self.indexes.get()?;
        let exit = self.indexes.get()?;

        let try_start = self.emit(OpCode::TryStart, &[0, exception.bits(), exit.bits()])?;

        self.start_try_block(exit);
        self.statements(body)?;

        let try_end = self.emit(OpCode::TryEnd, &[0])?;
        let block = self.pop_block()?;

        let mut exits = TryExits::default();
        (exits.try_exit, exits.try_continue) = self.trampolines(block, exit)?;

        self.set_jump_offset(try_start, OpCode::TryStart)?;

        let catch_size = OpCode::Catch.size() as u32;

        match (handler, finalizer) {
            (Some(handler), None) => {
                let param = self.catch_param(handler, exception);
                self.emit(OpCode::Catch, &[catch_size, param.bits()])?;
                self.statements(&handler.body)?;

                self.set_jump_offset(try_end, OpCode::TryEnd)?;

                if exits.try_continue.is_some() || exits.try_exit.is_some() {
                    let finally = self.emit(
                        OpCode::Finally,
                        &[exception.bits(), exit.bits(), field(2) as u32, field(3) as u32],
                    )?;

                    if let Some(label) = exits.try_continue.take() {
                        let depth = self
                            .blocks
                            .find(BlockMask::LOOP, &label)
                            .ok_or_else(|| Error::internal("continue target of try block is gone"))?;
                        self.blocks.make_continuation_patch(depth, label, finally + field(2));
                    }

                    if let Some(label) = exits.try_exit.take() {
                        self.finally_exit(label, finally);
                    }
                }

                self.indexes.release(exception);
            }

            (Some(handler), Some(finalizer)) => {
                let param = self.catch_param(handler, exception);
                let catch = self.emit(OpCode::Catch, &[0, param.bits()])?;

                self.start_try_block(exit);
                self.statements(&handler.body)?;

                let catch_end = self.emit(OpCode::TryEnd, &[0])?;
                let block = self.pop_block()?;
                (exits.catch_exit, exits.catch_continue) = self.trampolines(block, exit)?;

                self.set_jump_offset(catch, OpCode::Catch)?;
                self.emit(OpCode::Catch, &[catch_size, exception.bits()])?;

                self.set_jump_offset(catch_end, OpCode::TryEnd)?;
                self.set_jump_offset(try_end, OpCode::TryEnd)?;

                self.statements(finalizer)?;
                self.try_end(exits, exception, exit)?;
            }

            (None, Some(finalizer)) => {
                self.emit(OpCode::Catch, &[catch_size, exception.bits()])?;
                self.set_jump_offset(try_end, OpCode::TryEnd)?;

                self.statements(finalizer)?;
                self.try_end(exits, exception, exit)?;
            }

            (None, None) => return Err(self.syntax_error("Missing catch or finally after try")),
        }

        Ok(())
    }

    fn start_try_block(&mut self, exit: Index) {
        let depth = self.blocks.start(BlockKind::Try, Label::None);
        self.blocks.get_mut(depth).index = Some(exit);
    }

    fn pop_block(&mut self) -> Result<Block> {
        self.blocks
            .pop()
            .ok_or_else(|| Error::internal("block stack underflow"))
    }

    fn catch_param(&self, handler: &CatchClause, exception: Index) -> Index {
        handler
            .param
            .as_ref()
            .and_then(|param| param.binding)
            .map_or(exception, |binding| binding.index)
    }

    /// Lands the pending jumps of a closed try region on `TRY_BREAK` and
    /// `TRY_CONTINUE` records, which jump back onto the region's
    /// `TRY_END`. Returns the labels of the last exit and continuation.
    fn trampolines(&mut self, block: Block, exit: Index) -> Result<(Option<Label>, Option<Label>)> {
        let exit_label = block.exit_label().cloned();
        let continue_label = block.continuation_label().cloned();

        let try_end = OpCode::TryEnd.size() as i32;
        let mut offset = -try_end;

        if !block.exit.is_empty() {
            self.patch(block.exit)?;
            self.emit(OpCode::TryBreak, &[exit.bits(), offset as u32])?;
            offset -= OpCode::TryBreak.size() as i32;
        }

        if !block.continuation.is_empty() {
            self.patch(block.continuation)?;
            self.emit(OpCode::TryContinue, &[exit.bits(), offset as u32])?;
        }

        debug!(exit = ?exit_label, continuation = ?continue_label, "try trampolines");

        Ok((exit_label, continue_label))
    }

    /// Emits `FINALLY` after a `finally` body and hands its continue and
    /// break targets to the enclosing blocks.
    fn try_end(&mut self, exits: TryExits, exception: Index, exit: Index) -> Result<()> {
        let finally = self.emit(
            OpCode::Finally,
            &[exception.bits(), exit.bits(), field(2) as u32, field(3) as u32],
        )?;

        if exits.try_continue.is_some() || exits.catch_continue.is_some() {
            let label = self
                .blocks
                .jump_destination(
                    self.blocks.len(),
                    "try continue",
                    BlockMask::LOOP,
                    exits.try_continue.as_ref(),
                    exits.catch_continue.as_ref(),
                )?
                .unwrap_or(Label::None);

            let depth = self
                .blocks
                .find(BlockMask::LOOP, &label)
                .ok_or_else(|| Error::internal("continue target of try block is gone"))?;
            self.blocks.make_continuation_patch(depth, label, finally + field(2));
        }

        if exits.try_exit.is_some() || exits.catch_exit.is_some() {
            let label = self
                .blocks
                .jump_destination(
                    self.blocks.len(),
                    "try break/return",
                    BlockMask::ALL | BlockMask::TRY,
                    exits.try_exit.as_ref(),
                    exits.catch_exit.as_ref(),
                )?
                .unwrap_or(Label::None);

            self.finally_exit(label, finally);
        }

        self.indexes.release(exception);

        Ok(())
    }

    /// Records the break target of a `FINALLY` record. An exit with no
    /// enclosing destination is a `return` from the outermost region and
    /// stays unresolved.
    fn finally_exit(&mut self, label: Label, finally: usize) {
        let target = field(3);

        if let Some(depth) = self.blocks.find(BlockMask::ALL, &label) {
            self.blocks.make_exit_patch(depth, label, finally + target);
        } else if let Some(depth) = self.blocks.find(BlockMask::ALL, &Label::None) {
            self.blocks.make_exit_patch(depth, Label::None, finally + target);
        }
    }
}
