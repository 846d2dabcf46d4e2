// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Reference resolver.
//!
//! Builds the [`ScopeTable`] for a program and binds every name reference
//! to its variable:
//!
//! - `var` and function declarations are hoisted to the function scope
//! - `let` and `const` are hoisted to the start of their block
//! - parameters become argument variables in slots `1..=n`
//! - a reference from a nested function gets a `Closure`-level slot, with a
//!   closure entry added to every function between the two frames
//! - names that are not declared anywhere stay unbound

use tracing::trace;

use super::scope::{Binding, ScopeId, ScopeKind, ScopeTable, VarId, VarKind};
use super::{
    Expr, ExprKind, ForInLeft, ForInit, Function, Identifier, Program, Stmt, StmtKind,
    VariableDeclaration, VariableKind,
};
use crate::compiler::index::{Index, Level};
use crate::{Error, Result};

/// Resolves all declarations and references of `program`.
pub fn resolve(program: &mut Program) -> Result<ScopeTable> {
    let mut resolver = Resolver {
        table: ScopeTable::new(),
    };

    let global = resolver.table.global();
    resolver.body(global, &mut program.body)?;

    Ok(resolver.table)
}

fn var_kind(kind: VariableKind) -> VarKind {
    match kind {
        VariableKind::Var => VarKind::Var,
        VariableKind::Let => VarKind::Let,
        VariableKind::Const => VarKind::Const,
    }
}

struct Resolver {
    table: ScopeTable,
}

impl Resolver {
    // ========================================================================
    // Hoisting
    // ========================================================================

    fn body(&mut self, function: ScopeId, body: &mut [Stmt]) -> Result<()> {
        for stmt in body.iter() {
            self.hoist(function, stmt)?;
        }

        self.declare_lexical(function, body.iter())?;

        for stmt in body {
            self.statement(function, stmt)?;
        }

        Ok(())
    }

    /// Declares `var` and function names found anywhere in `stmt`, without
    /// entering nested functions.
    fn hoist(&mut self, function: ScopeId, stmt: &Stmt) -> Result<()> {
        match &stmt.kind {
            StmtKind::Var(decl) => self.hoist_var(function, decl),
            StmtKind::FunctionDeclaration(f) => {
                let id = self.table.declare(function, f.name(), VarKind::Function)?;
                self.table.var_mut(id).init = true;
                Ok(())
            }
            StmtKind::If {
                consequent,
                alternate,
                ..
            } => {
                self.hoist(function, consequent)?;
                if let Some(alt) = alternate {
                    self.hoist(function, alt)?;
                }
                Ok(())
            }
            StmtKind::While { body, .. }
            | StmtKind::DoWhile { body, .. }
            | StmtKind::Labeled { body, .. } => self.hoist(function, body),
            StmtKind::For { init, body, .. } => {
                if let Some(ForInit::Var(decls)) = init {
                    for decl in decls {
                        self.hoist_var(function, decl)?;
                    }
                }
                self.hoist(function, body)
            }
            StmtKind::ForIn { left, body, .. } => {
                if let ForInLeft::Var(decl) = left {
                    self.hoist_var(function, decl)?;
                }
                self.hoist(function, body)
            }
            StmtKind::Switch { cases, .. } => cases
                .iter()
                .flat_map(|case| case.body.iter())
                .try_for_each(|s| self.hoist(function, s)),
            StmtKind::Block(body) => body.iter().try_for_each(|s| self.hoist(function, s)),
            StmtKind::Try {
                block,
                handler,
                finalizer,
            } => {
                let handler = handler.iter().flat_map(|h| h.body.iter());
                let finalizer = finalizer.iter().flatten();

                block
                    .iter()
                    .chain(handler)
                    .chain(finalizer)
                    .try_for_each(|s| self.hoist(function, s))
            }
            StmtKind::Expression(_)
            | StmtKind::Break(_)
            | StmtKind::Continue(_)
            | StmtKind::Return(_)
            | StmtKind::Throw(_)
            | StmtKind::Empty => Ok(()),
        }
    }

    fn hoist_var(&mut self, function: ScopeId, decl: &VariableDeclaration) -> Result<()> {
        if decl.kind == VariableKind::Var {
            self.table.declare(function, &decl.id.name, VarKind::Var)?;
        }
        Ok(())
    }

    /// Declares the `let`/`const` names of a block's direct statements.
    fn declare_lexical<'a>(
        &mut self,
        scope: ScopeId,
        stmts: impl IntoIterator<Item = &'a Stmt>,
    ) -> Result<()> {
        for stmt in stmts {
            if let StmtKind::Var(decl) = &stmt.kind {
                self.declare_lexical_var(scope, decl)?;
            }
        }
        Ok(())
    }

    fn declare_lexical_var(&mut self, scope: ScopeId, decl: &VariableDeclaration) -> Result<()> {
        if decl.kind != VariableKind::Var {
            self.table.declare(scope, &decl.id.name, var_kind(decl.kind))?;
        }
        Ok(())
    }

    fn block(&mut self, scope: ScopeId, body: &mut [Stmt]) -> Result<()> {
        let block = self.table.push_scope(ScopeKind::Block, scope);
        self.declare_lexical(block, body.iter())?;

        for stmt in body {
            self.statement(block, stmt)?;
        }

        Ok(())
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn statement(&mut self, scope: ScopeId, stmt: &mut Stmt) -> Result<()> {
        match &mut stmt.kind {
            StmtKind::Expression(expr) | StmtKind::Throw(expr) => self.expression(scope, expr),
            StmtKind::Var(decl) => self.declaration(scope, decl),
            StmtKind::FunctionDeclaration(f) => {
                if let Some(id) = &mut f.id {
                    self.bind(scope, id)?;
                }
                self.function(scope, f)
            }
            StmtKind::If {
                test,
                consequent,
                alternate,
            } => {
                self.expression(scope, test)?;
                self.statement(scope, consequent)?;
                if let Some(alt) = alternate {
                    self.statement(scope, alt)?;
                }
                Ok(())
            }
            StmtKind::Switch {
                discriminant,
                cases,
            } => {
                self.expression(scope, discriminant)?;

                let block = self.table.push_scope(ScopeKind::Block, scope);
                self.declare_lexical(block, cases.iter().flat_map(|c| c.body.iter()))?;

                for case in cases {
                    if let Some(test) = &mut case.test {
                        self.expression(block, test)?;
                    }
                    for stmt in &mut case.body {
                        self.statement(block, stmt)?;
                    }
                }
                Ok(())
            }
            StmtKind::While { test, body } | StmtKind::DoWhile { body, test } => {
                self.expression(scope, test)?;
                self.statement(scope, body)
            }
            StmtKind::For {
                init,
                test,
                update,
                body,
            } => {
                let scope = self.table.push_scope(ScopeKind::Block, scope);

                match init {
                    Some(ForInit::Var(decls)) => {
                        for decl in decls.iter() {
                            self.declare_lexical_var(scope, decl)?;
                        }
                        for decl in decls {
                            self.declaration(scope, decl)?;
                        }
                    }
                    Some(ForInit::Expression(expr)) => self.expression(scope, expr)?,
                    None => {}
                }

                if let Some(test) = test {
                    self.expression(scope, test)?;
                }
                if let Some(update) = update {
                    self.expression(scope, update)?;
                }

                self.statement(scope, body)
            }
            StmtKind::ForIn { left, right, body } => {
                let scope = self.table.push_scope(ScopeKind::Block, scope);

                match left {
                    ForInLeft::Var(decl) => {
                        self.declare_lexical_var(scope, decl)?;
                        self.declaration(scope, decl)?;
                    }
                    ForInLeft::Name(id) => self.bind(scope, id)?,
                }

                self.expression(scope, right)?;
                self.statement(scope, body)
            }
            StmtKind::Block(body) => self.block(scope, body),
            StmtKind::Labeled { body, .. } => self.statement(scope, body),
            StmtKind::Return(expr) => match expr {
                Some(expr) => self.expression(scope, expr),
                None => Ok(()),
            },
            StmtKind::Try {
                block,
                handler,
                finalizer,
            } => {
                self.block(scope, block)?;

                if let Some(handler) = handler {
                    let catch = self.table.push_scope(ScopeKind::Block, scope);

                    if let Some(param) = &mut handler.param {
                        let id = self.table.declare(catch, &param.name, VarKind::Catch)?;
                        self.table.var_mut(id).init = true;
                        self.bind(catch, param)?;
                    }

                    self.declare_lexical(catch, handler.body.iter())?;
                    for stmt in &mut handler.body {
                        self.statement(catch, stmt)?;
                    }
                }

                if let Some(finalizer) = finalizer {
                    self.block(scope, finalizer)?;
                }

                Ok(())
            }
            StmtKind::Break(_) | StmtKind::Continue(_) | StmtKind::Empty => Ok(()),
        }
    }

    fn declaration(&mut self, scope: ScopeId, decl: &mut VariableDeclaration) -> Result<()> {
        self.bind(scope, &mut decl.id)?;

        if let Some(init) = &mut decl.init {
            self.expression(scope, init)?;
        }

        Ok(())
    }

    fn function(&mut self, scope: ScopeId, f: &mut Function) -> Result<()> {
        let function = self.table.push_scope(ScopeKind::Function, scope);
        f.scope = Some(function);

        trace!(name = f.name(), ?function, "resolve function");

        for param in &mut f.params {
            let id = self.table.declare(function, &param.name, VarKind::Var)?;
            let var = self.table.var_mut(id);
            var.argument = true;
            var.init = true;

            param.binding = Some(Binding {
                var: id,
                index: var.index,
            });
        }

        self.body(function, &mut f.body)
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn expression(&mut self, scope: ScopeId, expr: &mut Expr) -> Result<()> {
        match &mut expr.kind {
            ExprKind::Number(_)
            | ExprKind::String(_)
            | ExprKind::Boolean(_)
            | ExprKind::Null
            | ExprKind::Undefined
            | ExprKind::This => Ok(()),
            ExprKind::Name(id) => self.bind(scope, id),
            ExprKind::Object(properties) => {
                for property in properties {
                    self.expression(scope, &mut property.key)?;
                    self.expression(scope, &mut property.value)?;
                }
                Ok(())
            }
            ExprKind::Array(elements) => {
                for element in elements.iter_mut().flatten() {
                    self.expression(scope, element)?;
                }
                Ok(())
            }
            ExprKind::Function(f) => self.function(scope, f),
            ExprKind::Assign { target, value, .. } => {
                self.expression(scope, target)?;
                self.expression(scope, value)
            }
            ExprKind::Binary { left, right, .. }
            | ExprKind::Logical { left, right, .. }
            | ExprKind::Comma { left, right } => {
                self.expression(scope, left)?;
                self.expression(scope, right)
            }
            ExprKind::Unary { argument, .. } | ExprKind::Update { argument, .. } => {
                self.expression(scope, argument)
            }
            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                self.expression(scope, test)?;
                self.expression(scope, consequent)?;
                self.expression(scope, alternate)
            }
            ExprKind::Member { object, property } => {
                self.expression(scope, object)?;
                self.expression(scope, property)
            }
            ExprKind::Call { callee, arguments } | ExprKind::New { callee, arguments } => {
                self.expression(scope, callee)?;
                for argument in arguments {
                    self.expression(scope, argument)?;
                }
                Ok(())
            }
        }
    }

    // ========================================================================
    // References
    // ========================================================================

    fn bind(&mut self, scope: ScopeId, id: &mut Identifier) -> Result<()> {
        let var = if id.name == "arguments" {
            self.arguments(scope)?
        } else {
            self.table.lookup(scope, &id.name)
        };

        let Some(var) = var else {
            trace!(name = %id.name, "unresolved reference");
            id.binding = None;
            return Ok(());
        };

        let index = self.reference_index(scope, var)?;
        id.binding = Some(Binding { var, index });

        Ok(())
    }

    /// Resolves `arguments`, creating the implicit object variable of the
    /// nearest function when it is not declared there.
    fn arguments(&mut self, scope: ScopeId) -> Result<Option<VarId>> {
        let function = self.table.scope(scope).function;

        if self.table.scope(function).kind == ScopeKind::Global {
            return Ok(self.table.lookup(scope, "arguments"));
        }

        let mut current = scope;
        loop {
            if let Some(&var) = self.table.scope(current).names.get("arguments") {
                return Ok(Some(var));
            }

            if current == function {
                break;
            }

            match self.table.scope(current).parent {
                Some(parent) => current = parent,
                None => break,
            }
        }

        let id = self.table.declare(function, "arguments", VarKind::Var)?;
        let var = self.table.var_mut(id);
        var.arguments_object = true;
        var.init = true;

        Ok(Some(id))
    }

    /// Slot of `var` as seen from code in `scope`.
    fn reference_index(&mut self, scope: ScopeId, var: VarId) -> Result<Index> {
        let from = self.table.scope(scope).function;
        let owner = self.table.scope(self.table.var(var).scope).function;
        let index = self.table.var(var).index;

        if from == owner || index.level() == Level::Global {
            return Ok(index);
        }

        self.table.var_mut(var).closure = true;

        let mut chain = Vec::new();
        let mut function = from;

        while function != owner {
            chain.push(function);

            let parent = self
                .table
                .scope(function)
                .parent
                .ok_or_else(|| Error::internal("closure outside of its declaring scope"))?;
            function = self.table.scope(parent).function;
        }

        let mut index = index;
        for &function in chain.iter().rev() {
            index = self.table.add_closure(function, index)?;
        }

        Ok(index)
    }
}
