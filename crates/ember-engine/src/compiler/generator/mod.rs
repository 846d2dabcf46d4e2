// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Bytecode generation from a resolved AST.
//!
//! One [`Generator`] runs per function scope. Nested functions get their own
//! generator sharing the scope table, the constant pool and the lambda table
//! of the compile unit.
//!
//! # Module Structure
//!
//! - `statements`: Declarations, branches, loops and blocks
//! - `expressions`: Operators, assignments, literals and calls
//! - `exceptions`: `try`/`catch`/`finally` and the jumps routed through them

mod exceptions;
mod expressions;
mod statements;


use tracing::{debug, trace};

use crate::ast::{Function, Identifier, Program, ScopeId, ScopeTable, Stmt, StmtKind, VarId};
use crate::compiler::block::{BlockStack, Patch};
use crate::compiler::buffer::CodeBuffer;
use crate::compiler::bytecode::{
    Bytecode, Code, Constant, ConstantPool, Declaration, ErrorKind, Lambda, OpCode, field,
};
use crate::compiler::index::{Index, IndexAllocator, Level};
use crate::compiler::lines::LineMap;
use crate::config::GeneratorOptions;
use crate::string::JsString;
use crate::{Error, Result};

/// Generates bytecode for a resolved program.
///
/// `scopes` must be the table returned by [`crate::ast::resolve`] for the
/// same program. Frame sizes are written back into it.
pub fn generate(
    program: &Program,
    scopes: &mut ScopeTable,
    options: &GeneratorOptions,
) -> Result<Bytecode> {
    debug!(file = %options.file, statements = program.body.len(), "generate");

    let mut unit = Unit::default();
    let global = scopes.global();

    let main = Generator::new(options, scopes, &mut unit, global, 0, 0, "main")?.program(&program.body)?;

    Ok(Bytecode {
        main,
        lambdas: unit.lambdas,
        constants: unit.constants.into_vec(),
    })
}

/// Tables shared by all generators of a compile unit.
#[derive(Debug, Default)]
pub(crate) struct Unit {
    pub(crate) constants: ConstantPool,
    pub(crate) lambdas: Vec<Lambda>,
}

/// Where an expression left its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Slot {
    pub(crate) index: Index,
    /// Owned by the expression and returned to the allocator after use
    pub(crate) temporary: bool,
}

impl Slot {
    fn named(index: Index) -> Self {
        Self {
            index,
            temporary: false,
        }
    }

    fn temporary(index: Index) -> Self {
        Self {
            index,
            temporary: true,
        }
    }

    fn bits(self) -> u32 {
        self.index.bits()
    }
}

/// How a name is being accessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    /// Declaration target
    Declaration,
    /// Read or write
    Reference,
    /// `typeof` operand, which must not raise for undeclared names
    Typeof,
}

/// Code generator for one function scope.
pub(crate) struct Generator<'a> {
    options: &'a GeneratorOptions,
    scopes: &'a mut ScopeTable,
    unit: &'a mut Unit,
    /// Function (or global) scope being generated
    function: ScopeId,
    code: CodeBuffer,
    lines: Option<LineMap>,
    indexes: IndexAllocator,
    blocks: BlockStack,
    declarations: Vec<Declaration>,
    name: String,
    depth: u32,
    recursion: u32,
    /// Results must not be written straight into a variable slot
    dest_disable: bool,
    line: u32,
}

impl<'a> Generator<'a> {
    fn new(
        options: &'a GeneratorOptions,
        scopes: &'a mut ScopeTable,
        unit: &'a mut Unit,
        function: ScopeId,
        depth: u32,
        recursion: u32,
        name: &str,
    ) -> Result<Self> {
        let items = scopes.scope(function).items;
        let level = scopes.level(function);

        Ok(Self {
            options,
            scopes,
            unit,
            function,
            code: CodeBuffer::with_capacity(options.initial_code_size)?,
            lines: options.lines.then(LineMap::new),
            indexes: IndexAllocator::new(items, level),
            blocks: BlockStack::new(),
            declarations: Vec::new(),
            name: name.to_string(),
            depth,
            recursion,
            dest_disable: false,
            line: 0,
        })
    }

    /// Top-level code. The value of the last expression statement becomes
    /// the operand of `STOP`.
    fn program(mut self, body: &[Stmt]) -> Result<Code> {
        self.hoist_functions(body)?;

        let mut retval = Index::UNDEFINED;
        for stmt in body {
            retval = self.statement(stmt)?.unwrap_or(Index::UNDEFINED);
        }

        self.emit(OpCode::Stop, &[retval.bits()])?;
        self.scopes.scope_mut(self.function).items = self.indexes.items();

        Ok(self.finish())
    }

    fn function_body(mut self, function: &Function) -> Result<Lambda> {
        let mut nargs = 0;
        let mut arguments = Vec::new();

        for var in self.scopes.variables(self.function) {
            if var.argument {
                nargs += 1;
            }
            if var.arguments_object {
                arguments.push(var.index);
            }
        }

        for index in arguments {
            self.emit(OpCode::Arguments, &[index.bits()])?;
        }

        self.hoist_functions(&function.body)?;
        self.statements(&function.body)?;
        self.emit(OpCode::Return, &[Index::UNDEFINED.bits()])?;

        let nlocal = self.indexes.items();
        let scope = self.scopes.scope_mut(self.function);
        scope.items = nlocal;
        let closures = scope.closures.clone();

        Ok(Lambda {
            code: self.finish(),
            nargs,
            nlocal,
            closures,
        })
    }

    fn finish(self) -> Code {
        Code {
            name: self.name,
            bytes: self.code.into_bytes(),
            lines: self.lines,
            declarations: self.declarations,
        }
    }

    fn statements(&mut self, body: &[Stmt]) -> Result<()> {
        for stmt in body {
            self.statement(stmt)?;
        }
        Ok(())
    }

    // ========================================================================
    // Functions
    // ========================================================================

    /// Reserves lambdas for the function declarations of a body, binds them
    /// to their variables, then generates them.
    fn hoist_functions(&mut self, body: &[Stmt]) -> Result<()> {
        let mut functions = Vec::new();
        for stmt in body {
            collect_functions(stmt, &mut functions);
        }

        let mut reserved = Vec::with_capacity(functions.len());

        for function in functions {
            let Some(binding) = function.id.as_ref().and_then(|id| id.binding) else {
                continue;
            };

            let lambda = self.reserve_lambda()?;
            let var = self.scopes.var_mut(binding.var);
            var.lambda = Some(lambda);

            self.declarations.push(Declaration {
                index: var.index,
                lambda,
            });
            reserved.push((lambda, function));
        }

        for (lambda, function) in reserved {
            let code = self.lambda(function)?;
            self.unit.lambdas[lambda as usize] = code;
        }

        Ok(())
    }

    fn reserve_lambda(&mut self) -> Result<u32> {
        let lambda = u32::try_from(self.unit.lambdas.len())
            .map_err(|_| Error::internal("too many functions in compile unit"))?;

        self.unit.lambdas.try_reserve(1)?;
        self.unit.lambdas.push(Lambda::default());

        Ok(lambda)
    }

    fn lambda(&mut self, function: &Function) -> Result<Lambda> {
        let depth = self.depth + 1;
        if depth >= self.options.max_function_depth {
            return Err(Error::range("Maximum function nesting depth exceeded"));
        }

        let scope = function
            .scope
            .ok_or_else(|| Error::internal("function scope is not resolved"))?;

        let name = match function.name() {
            "" => "anonymous",
            name => name,
        };

        debug!(function = name, depth, "enter function scope");

        let generator = Generator::new(
            self.options,
            &mut *self.scopes,
            &mut *self.unit,
            scope,
            depth,
            self.recursion,
            name,
        )?;
        let lambda = generator.function_body(function)?;

        debug!(function = name, nlocal = lambda.nlocal, "leave function scope");

        Ok(lambda)
    }

    // ========================================================================
    // Emission
    // ========================================================================

    /// Appends a record. Returns its offset.
    fn emit(&mut self, op: OpCode, operands: &[u32]) -> Result<usize> {
        debug_assert_eq!(operands.len(), op.fields().len(), "{}", op.mnemonic());

        let start = self.code.reserve(op.size())?;

        if let Some(lines) = &mut self.lines {
            let offset = u32::try_from(start).map_err(|_| Error::internal("code unit too large"))?;
            lines.push(self.line, offset);
        }

        self.code.write_u8(start, op as u8);
        self.code.write_u8(start + 1, 3 - op.nargs());

        for (i, &value) in operands.iter().enumerate() {
            self.code.write_u32(start + field(i), value);
        }

        trace!(offset = start, op = op.mnemonic(), "emit");

        Ok(start)
    }

    /// Distance from `from` to the current end of code.
    fn distance(&self, from: usize) -> Result<i32> {
        i32::try_from(self.code.end() - from).map_err(|_| Error::internal("jump offset out of range"))
    }

    /// Operand for a backward jump to `target` from the next record.
    fn backward(&self, target: usize) -> Result<u32> {
        let distance = self.distance(target)?;
        Ok((-distance) as u32)
    }

    /// Points the `offset` field of the record at `record` to the current
    /// end of code.
    fn set_jump_offset(&mut self, record: usize, op: OpCode) -> Result<()> {
        let field = op
            .field_offset("offset")
            .ok_or_else(|| Error::internal(format!("{} has no jump offset", op.mnemonic())))?;

        let distance = self.distance(record)?;
        self.code.write_i32(record + field, distance);

        Ok(())
    }

    /// Resolves pending jumps to the current end of code.
    fn patch(&mut self, patches: Vec<Patch>) -> Result<()> {
        for patch in patches {
            let distance = self.distance(patch.jump_offset)?;
            trace!(jump_offset = patch.jump_offset, distance, label = %patch.label, "apply patch");
            self.code.add_i32(patch.jump_offset, distance);
        }
        Ok(())
    }

    fn syntax_error(&self, message: &str) -> Error {
        Error::syntax(message, self.options.file.as_str(), self.line)
    }

    // ========================================================================
    // Recursion and lines
    // ========================================================================

    fn enter(&mut self, line: u32) -> Result<u32> {
        self.recursion += 1;
        if self.recursion > self.options.max_recursion_depth {
            return Err(Error::range("Maximum call stack size exceeded"));
        }

        let saved = self.line;
        if line != 0 {
            self.line = line;
        }
        Ok(saved)
    }

    fn leave(&mut self, saved: u32) {
        self.recursion -= 1;
        self.line = saved;
    }

    // ========================================================================
    // Slots
    // ========================================================================

    fn temp(&mut self) -> Result<Slot> {
        Ok(Slot::temporary(self.indexes.get()?))
    }

    fn release(&mut self, slot: Slot) {
        if slot.temporary {
            self.indexes.release(slot.index);
        }
    }

    /// Result slot of a node: the destination hint when allowed, otherwise a
    /// temporary. The children's temporaries are released first so the
    /// result may reuse one of them.
    fn dest_index(&mut self, dest: Option<Index>, children: &[Slot]) -> Result<Slot> {
        for &child in children {
            self.release(child);
        }

        match dest {
            Some(dest) if !self.dest_disable => Ok(Slot::named(dest)),
            _ => self.temp(),
        }
    }

    /// Result slot of an object, array or function literal. Only an empty
    /// literal may be built straight into the destination.
    fn object_dest_index(&mut self, dest: Option<Index>, empty: bool) -> Result<Slot> {
        match dest {
            Some(dest) if empty => Ok(Slot::named(dest)),
            _ => self.temp(),
        }
    }

    /// Copies a slot into a fresh temporary.
    fn snapshot(&mut self, slot: Slot) -> Result<Slot> {
        let temp = self.temp()?;
        self.emit(OpCode::Move, &[temp.bits(), slot.bits()])?;
        self.release(slot);
        Ok(temp)
    }

    fn constant(&mut self, value: Constant) -> Result<Slot> {
        Ok(Slot::named(self.unit.constants.add(value)?))
    }

    fn string_constant(&mut self, s: &str) -> Result<Index> {
        self.unit.constants.add(Constant::String(JsString::text(s)?))
    }

    // ========================================================================
    // Names
    // ========================================================================

    /// Emits `FUNCTION_COPY` for a declared function read through `index`.
    fn function_copy(&mut self, var: VarId, index: Index) -> Result<()> {
        if let Some(lambda) = self.scopes.var(var).lambda {
            self.emit(OpCode::FunctionCopy, &[index.bits(), lambda])?;
        }
        Ok(())
    }

    /// Reads a name as a value.
    fn name(&mut self, id: &Identifier) -> Result<Slot> {
        let Some(binding) = id.binding else {
            return self.global_reference(&id.name, true);
        };

        self.function_copy(binding.var, binding.index)?;

        let var = self.scopes.var(binding.var);
        if !var.init && var.kind.is_lexical() && self.dest_disable {
            self.emit(OpCode::NotInitialized, &[binding.index.bits()])?;
        }

        Ok(Slot::named(binding.index))
    }

    /// Resolves a name used as a declaration or assignment target.
    fn variable(&mut self, id: &Identifier, access: Access) -> Result<(Slot, Option<VarId>)> {
        let Some(binding) = id.binding else {
            let slot = match access {
                Access::Declaration => {
                    self.reference_error(&id.name)?;
                    Slot::named(Index::UNDEFINED)
                }
                Access::Reference => self.global_reference(&id.name, true)?,
                Access::Typeof => self.global_reference(&id.name, false)?,
            };
            return Ok((slot, None));
        };

        self.function_copy(binding.var, binding.index)?;

        let var = self.scopes.var(binding.var);
        let owner = self.scopes.scope(var.scope).function;

        if !var.init && var.kind.is_lexical() && !self.dest_disable && owner == self.function {
            self.emit(OpCode::NotInitialized, &[binding.index.bits()])?;
        }

        Ok((Slot::named(binding.index), Some(binding.var)))
    }

    /// Resolves a name with destination writes disabled.
    fn variable_wo_dest(&mut self, id: &Identifier, access: Access) -> Result<(Slot, Option<VarId>)> {
        let saved = std::mem::replace(&mut self.dest_disable, true);
        let result = self.variable(id, access);
        self.dest_disable = saved;
        result
    }

    /// Loads an undeclared name from the global object.
    fn global_reference(&mut self, name: &str, exception: bool) -> Result<Slot> {
        let slot = self.temp()?;
        let property = self.string_constant(name)?;

        let op = if exception {
            OpCode::GlobalGet
        } else {
            OpCode::PropertyGet
        };

        self.emit(
            op,
            &[slot.bits(), Index::this(Level::Global).bits(), property.bits()],
        )?;

        if exception {
            self.reference_error(name)?;
        }

        Ok(slot)
    }

    /// Stores back into the global object after assigning to an
    /// undeclared name.
    fn global_property_set(&mut self, id: &Identifier, value: Index) -> Result<()> {
        if id.binding.is_some() {
            return Ok(());
        }

        let property = self.string_constant(&id.name)?;
        self.emit(
            OpCode::PropertySet,
            &[value.bits(), Index::this(Level::Global).bits(), property.bits()],
        )?;

        Ok(())
    }

    fn reference_error(&mut self, name: &str) -> Result<()> {
        let name = self.string_constant(name)?;
        self.emit(OpCode::Error, &[ErrorKind::Reference as u32, name.bits()])?;
        Ok(())
    }
}

/// Function declarations of a body, nested statements included, nested
/// functions excluded.
fn collect_functions<'s>(stmt: &'s Stmt, out: &mut Vec<&'s Function>) {
    match &stmt.kind {
        StmtKind::FunctionDeclaration(f) => out.push(f),
        StmtKind::If {
            consequent,
            alternate,
            ..
        } => {
            collect_functions(consequent, out);
            if let Some(alt) = alternate {
                collect_functions(alt, out);
            }
        }
        StmtKind::While { body, .. }
        | StmtKind::DoWhile { body, .. }
        | StmtKind::For { body, .. }
        | StmtKind::ForIn { body, .. }
        | StmtKind::Labeled { body, .. } => collect_functions(body, out),
        StmtKind::Switch { cases, .. } => {
            for stmt in cases.iter().flat_map(|c| c.body.iter()) {
                collect_functions(stmt, out);
            }
        }
        StmtKind::Block(body) => body.iter().for_each(|s| collect_functions(s, out)),
        StmtKind::Try {
            block,
            handler,
            finalizer,
        } => {
            let handler = handler.iter().flat_map(|h| h.body.iter());
            for stmt in block.iter().chain(handler).chain(finalizer.iter().flatten()) {
                collect_functions(stmt, out);
            }
        }
        StmtKind::Expression(_)
        | StmtKind::Var(_)
        | StmtKind::Break(_)
        | StmtKind::Continue(_)
        | StmtKind::Return(_)
        | StmtKind::Throw(_)
        | StmtKind::Empty => {}
    }
}
