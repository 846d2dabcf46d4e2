// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Statement generation.
//!
//! | Statement | Layout |
//! |-----------|--------|
//! | `if` | `IF_FALSE_JUMP` over the consequent, `JUMP` over the alternate |
//! | `while` | `JUMP` to the condition, body, condition, `IF_TRUE_JUMP` back |
//! | `do-while` | body, condition, `IF_TRUE_JUMP` back |
//! | `for` | init, `JUMP` to the condition, body, update, condition, `IF_TRUE_JUMP` back |
//! | `for-in` | `PROPERTY_FOREACH`, body, `PROPERTY_NEXT` back |
//! | `switch` | `IF_EQUAL_JUMP` per case, `JUMP` to default or end, bodies |

use tracing::trace;

use super::{Access, Generator};
use crate::Result;
use crate::ast::{
    Expr, ExprKind, ForInLeft, ForInit, Stmt, StmtKind, SwitchCase, VarKind, VariableDeclaration,
};
use crate::compiler::block::{BlockKind, Label};
use crate::compiler::bytecode::{OpCode, field};
use crate::compiler::index::{Index, Level};

impl Generator<'_> {
    /// Generates a statement. Expression statements return the slot holding
    /// their value.
    pub(super) fn statement(&mut self, stmt: &Stmt) -> Result<Option<Index>> {
        self.labelled_statement(stmt, Label::None)
    }

    fn labelled_statement(&mut self, stmt: &Stmt, label: Label) -> Result<Option<Index>> {
        let saved = self.enter(stmt.line)?;
        let result = self.statement_kind(stmt, label);
        self.leave(saved);
        result
    }

    fn statement_kind(&mut self, stmt: &Stmt, label: Label) -> Result<Option<Index>> {
        match &stmt.kind {
            StmtKind::Expression(expr) => return self.expression_statement(expr).map(Some),
            StmtKind::Var(decl) => return self.var_statement(decl),
            // Hoisted with the enclosing function body.
            StmtKind::FunctionDeclaration(_) | StmtKind::Empty => {}
            StmtKind::If {
                test,
                consequent,
                alternate,
            } => self.if_statement(test, consequent, alternate.as_deref())?,
            StmtKind::Switch {
                discriminant,
                cases,
            } => self.switch_statement(discriminant, cases, label)?,
            StmtKind::While { test, body } => self.while_statement(test, body, label)?,
            StmtKind::DoWhile { body, test } => self.do_while_statement(body, test, label)?,
            StmtKind::For {
                init,
                test,
                update,
                body,
            } => self.for_statement(init.as_ref(), test.as_ref(), update.as_ref(), body, label)?,
            StmtKind::ForIn { left, right, body } => self.for_in_statement(left, right, body, label)?,
            StmtKind::Block(body) => self.block_statement(body, label)?,
            StmtKind::Labeled { label, body } => {
                let label = Label::from_name(Some(label.as_str()));

                match body.kind {
                    StmtKind::While { .. }
                    | StmtKind::DoWhile { .. }
                    | StmtKind::For { .. }
                    | StmtKind::ForIn { .. }
                    | StmtKind::Switch { .. }
                    | StmtKind::Block(_) => {
                        self.labelled_statement(body, label)?;
                    }
                    _ => self.block_statement(std::slice::from_ref(&**body), label)?,
                }
            }
            StmtKind::Break(label) => self.break_statement(label.as_deref())?,
            StmtKind::Continue(label) => self.continue_statement(label.as_deref())?,
            StmtKind::Return(value) => self.return_statement(value.as_ref())?,
            StmtKind::Throw(value) => return self.throw_statement(value).map(Some),
            StmtKind::Try {
                block,
                handler,
                finalizer,
            } => self.try_statement(block, handler.as_ref(), finalizer.as_deref())?,
        }

        Ok(None)
    }

    fn expression_statement(&mut self, expr: &Expr) -> Result<Index> {
        // A bare lexical name still has to raise before its declaration.
        if let ExprKind::Name(id) = &expr.kind {
            if let Some(binding) = id.binding {
                let var = self.scopes.var(binding.var);
                if !var.init && var.kind.is_lexical() {
                    self.emit(OpCode::InitializationTest, &[binding.index.bits()])?;
                }
                return Ok(binding.index);
            }
        }

        let slot = self.expression(expr, None)?;
        self.release(slot);

        Ok(slot.index)
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    /// Returns the index holding the initializer's value, if any.
    pub(super) fn var_statement(&mut self, decl: &VariableDeclaration) -> Result<Option<Index>> {
        let (lvalue, var) = self.variable_wo_dest(&decl.id, Access::Declaration)?;
        let Some(var) = var else {
            return Ok(None);
        };

        let kind = self.scopes.var(var).kind;

        let Some(init) = &decl.init else {
            match kind {
                VarKind::Const => {
                    return Err(self.syntax_error("missing initializer in const declaration"));
                }
                VarKind::Let => {
                    self.emit(OpCode::Let, &[lvalue.bits()])?;
                }
                _ => {}
            }

            self.scopes.var_mut(var).init = true;
            return Ok(None);
        };

        let value = if kind.is_lexical() {
            let saved = std::mem::replace(&mut self.dest_disable, true);
            let value = self.expression(init, None);
            self.dest_disable = saved;
            value?
        } else {
            self.expression(init, Some(lvalue.index))?
        };

        if kind.is_lexical() {
            self.emit(OpCode::Let, &[lvalue.bits()])?;
        }

        self.scopes.var_mut(var).init = true;

        if lvalue.index != value.index {
            self.emit(OpCode::Move, &[lvalue.bits(), value.bits()])?;
        }

        self.release(value);

        Ok(Some(value.index))
    }

    /// Emits `LET_UPDATE` for captured loop bindings so every iteration
    /// closes over a fresh copy.
    fn let_update(&mut self, decls: &[VariableDeclaration]) -> Result<()> {
        for decl in decls {
            let Some(binding) = decl.id.binding else {
                continue;
            };

            let var = self.scopes.var(binding.var);
            if !var.kind.is_lexical() {
                break;
            }

            if var.closure {
                let index = var.index;
                self.emit(OpCode::LetUpdate, &[index.bits()])?;
            }
        }

        Ok(())
    }

    /// Marks variables reached from nested functions in `expr` as captured.
    fn resolve_closure(&mut self, expr: &Expr) {
        let scopes = &mut *self.scopes;

        expr.for_each_name(&mut |id| {
            if let Some(binding) = id.binding {
                if binding.index.level() == Level::Closure {
                    trace!(name = %id.name, "captured in loop");
                    scopes.var_mut(binding.var).closure = true;
                }
            }
        });
    }

    // ========================================================================
    // Branches
    // ========================================================================

    fn if_statement(&mut self, test: &Expr, consequent: &Stmt, alternate: Option<&Stmt>) -> Result<()> {
        let cond = self.expression(test, None)?;
        let jump = self.emit(OpCode::IfFalseJump, &[0, cond.bits()])?;
        self.release(cond);

        self.statement(consequent)?;

        match alternate {
            Some(alternate) => {
                let over = self.emit(OpCode::Jump, &[0])?;
                self.set_jump_offset(jump, OpCode::IfFalseJump)?;

                self.statement(alternate)?;
                self.set_jump_offset(over, OpCode::Jump)?;
            }
            None => self.set_jump_offset(jump, OpCode::IfFalseJump)?,
        }

        Ok(())
    }

    fn switch_statement(&mut self, discriminant: &Expr, cases: &[SwitchCase], label: Label) -> Result<()> {
        let value = self.expression(discriminant, None)?;

        // Case tests may reassign a variable discriminant.
        let value = if value.temporary {
            value
        } else {
            self.snapshot(value)?
        };

        let depth = self.blocks.start(BlockKind::Switch, label);

        let mut case_jumps = Vec::with_capacity(cases.len());

        for case in cases {
            let Some(test) = &case.test else {
                continue;
            };

            let test = self.expression(test, None)?;
            let record = self.emit(
                OpCode::IfEqualJump,
                &[field(0) as u32, value.bits(), test.bits()],
            )?;
            self.release(test);

            case_jumps.push(record + field(0));
        }

        self.release(value);

        let default = self.emit(OpCode::Jump, &[0])?;
        let mut default_found = false;
        let mut case_jumps = case_jumps.into_iter();

        for case in cases {
            if case.test.is_some() {
                if let Some(jump) = case_jumps.next() {
                    let distance = self.distance(jump)?;
                    self.code.add_i32(jump, distance);
                }
            } else {
                self.set_jump_offset(default, OpCode::Jump)?;
                default_found = true;
            }

            self.statements(&case.body)?;
        }

        if !default_found {
            self.set_jump_offset(default, OpCode::Jump)?;
        }

        debug_assert_eq!(depth + 1, self.blocks.len());
        self.end_block()
    }

    // ========================================================================
    // Loops
    // ========================================================================

    fn while_statement(&mut self, test: &Expr, body: &Stmt, label: Label) -> Result<()> {
        let jump = self.emit(OpCode::Jump, &[0])?;

        let depth = self.blocks.start(BlockKind::Loop, label);
        let loop_offset = self.code.end();

        self.statement(body)?;
        self.patch_continuations(depth)?;
        self.set_jump_offset(jump, OpCode::Jump)?;

        let cond = self.expression(test, None)?;
        let offset = self.backward(loop_offset)?;
        self.emit(OpCode::IfTrueJump, &[offset, cond.bits()])?;

        self.end_block()?;
        self.release(cond);

        Ok(())
    }

    fn do_while_statement(&mut self, body: &Stmt, test: &Expr, label: Label) -> Result<()> {
        let depth = self.blocks.start(BlockKind::Loop, label);
        let loop_offset = self.code.end();

        self.statement(body)?;
        self.patch_continuations(depth)?;

        let cond = self.expression(test, None)?;
        let offset = self.backward(loop_offset)?;
        self.emit(OpCode::IfTrueJump, &[offset, cond.bits()])?;

        self.end_block()?;
        self.release(cond);

        Ok(())
    }

    fn for_statement(
        &mut self,
        init: Option<&ForInit>,
        test: Option<&Expr>,
        update: Option<&Expr>,
        body: &Stmt,
        label: Label,
    ) -> Result<()> {
        let depth = self.blocks.start(BlockKind::Loop, label);

        let decls: &[VariableDeclaration] = match init {
            Some(ForInit::Var(decls)) => {
                for decl in decls {
                    self.var_statement(decl)?;
                }
                decls.as_slice()
            }
            Some(ForInit::Expression(expr)) => {
                let slot = self.expression(expr, None)?;
                self.release(slot);
                &[]
            }
            None => &[],
        };

        if let Some(test) = test {
            self.resolve_closure(test);
        }

        let jump = match test {
            Some(_) => Some(self.emit(OpCode::Jump, &[0])?),
            None => None,
        };

        let loop_offset = self.code.end();
        self.statement(body)?;

        if let Some(update) = update {
            self.resolve_closure(update);
        }

        self.let_update(decls)?;
        self.patch_continuations(depth)?;

        if let Some(update) = update {
            let slot = self.expression(update, None)?;
            self.release(slot);
        }

        match (test, jump) {
            (Some(test), Some(jump)) => {
                self.set_jump_offset(jump, OpCode::Jump)?;

                let cond = self.expression(test, None)?;
                let offset = self.backward(loop_offset)?;
                self.emit(OpCode::IfTrueJump, &[offset, cond.bits()])?;

                self.end_block()?;
                self.release(cond);
            }
            _ => {
                let offset = self.backward(loop_offset)?;
                self.emit(OpCode::Jump, &[offset])?;

                self.end_block()?;
            }
        }

        Ok(())
    }

    fn for_in_statement(&mut self, left: &ForInLeft, right: &Expr, body: &Stmt, label: Label) -> Result<()> {
        let depth = self.blocks.start(BlockKind::Loop, label);

        let (target, object) = match left {
            ForInLeft::Var(decl) => {
                let (target, var) = self.variable_wo_dest(&decl.id, Access::Declaration)?;
                let object = self.expression(right, None)?;

                if let Some(var) = var {
                    self.scopes.var_mut(var).init = true;
                }

                (target, object)
            }
            ForInLeft::Name(id) => {
                let target = self.name(id)?;
                (target, self.expression(right, None)?)
            }
        };

        let next = self.temp()?;
        let foreach = self.emit(OpCode::PropertyForeach, &[object.bits(), next.bits(), 0])?;

        let loop_offset = self.code.end();
        self.statement(body)?;

        if let ForInLeft::Var(decl) = left {
            self.let_update(std::slice::from_ref(decl))?;
        }

        self.patch_continuations(depth)?;
        self.set_jump_offset(foreach, OpCode::PropertyForeach)?;

        let offset = self.backward(loop_offset)?;
        self.emit(
            OpCode::PropertyNext,
            &[target.bits(), object.bits(), next.bits(), offset],
        )?;

        self.end_block()?;

        self.release(target);
        self.release(object);
        self.release(next);

        Ok(())
    }

    // ========================================================================
    // Blocks
    // ========================================================================

    fn block_statement(&mut self, body: &[Stmt], label: Label) -> Result<()> {
        self.blocks.start(BlockKind::Block, label);
        self.statements(body)?;
        self.end_block()
    }

    /// Closes the innermost block and resolves its exits here.
    pub(super) fn end_block(&mut self) -> Result<()> {
        if let Some(block) = self.blocks.pop() {
            self.patch(block.exit)?;
        }
        Ok(())
    }

    /// Resolves the pending `continue` jumps of the block at `depth` here.
    fn patch_continuations(&mut self, depth: usize) -> Result<()> {
        let patches = std::mem::take(&mut self.blocks.get_mut(depth).continuation);
        self.patch(patches)
    }

    fn throw_statement(&mut self, value: &Expr) -> Result<Index> {
        let slot = self.expression(value, None)?;
        self.emit(OpCode::Throw, &[slot.bits()])?;
        self.release(slot);
        Ok(slot.index)
    }
}
