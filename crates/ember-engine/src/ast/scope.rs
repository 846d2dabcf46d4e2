// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Scope table for variable resolution.

use rustc_hash::FxHashMap;

use crate::Result;
use crate::compiler::index::{Index, Level, VarClass};

/// Position of a scope in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub(crate) u32);

/// Position of a variable in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarId(pub(crate) u32);

/// Result of binding a name reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    /// The referenced variable
    pub var: VarId,
    /// Slot as seen from the referencing function
    pub index: Index,
}

/// Kind of scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// Top level of the compile unit
    Global,
    /// Function body
    Function,
    /// Block holding `let`/`const`
    Block,
}

/// How a variable was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    /// `var` or parameter
    Var,
    /// `let`
    Let,
    /// `const`
    Const,
    /// Function declaration
    Function,
    /// `catch` parameter
    Catch,
}

impl VarKind {
    /// Slot class for variables of this kind.
    pub fn class(self) -> VarClass {
        match self {
            VarKind::Var => VarClass::Var,
            VarKind::Let => VarClass::Let,
            VarKind::Const => VarClass::Const,
            VarKind::Function => VarClass::Function,
            VarKind::Catch => VarClass::Catch,
        }
    }

    /// Returns true for `let` and `const`.
    pub fn is_lexical(self) -> bool {
        matches!(self, VarKind::Let | VarKind::Const)
    }
}

/// A declared variable.
#[derive(Debug, Clone)]
pub struct Variable {
    /// Declared name
    pub name: String,
    /// Declaration kind
    pub kind: VarKind,
    /// Slot in the declaring frame
    pub index: Index,
    /// Declaring scope
    pub scope: ScopeId,
    /// Referenced from a nested function
    pub closure: bool,
    /// Initialisation already generated
    pub init: bool,
    /// Declared as a parameter
    pub argument: bool,
    /// Implicit `arguments` object
    pub arguments_object: bool,
    /// Lambda bound to a function declaration
    pub lambda: Option<u32>,
}

/// A lexical scope.
#[derive(Debug, Clone)]
pub struct Scope {
    /// Scope kind
    pub kind: ScopeKind,
    /// Enclosing scope
    pub parent: Option<ScopeId>,
    /// Function (or global) scope owning the frame
    pub function: ScopeId,
    /// Variables declared directly in this scope
    pub names: FxHashMap<String, VarId>,
    /// Declaration order of `names`
    pub vars: Vec<VarId>,
    /// Slots used by the frame; temporaries continue from here
    pub items: u32,
    /// Captured slots of the enclosing frame
    pub closures: Vec<Index>,
}

/// All scopes and variables of a compile unit.
#[derive(Debug, Clone)]
pub struct ScopeTable {
    scopes: Vec<Scope>,
    vars: Vec<Variable>,
}

impl Default for ScopeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTable {
    /// Creates a table holding only the global scope.
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope {
                kind: ScopeKind::Global,
                parent: None,
                function: ScopeId(0),
                names: FxHashMap::default(),
                vars: Vec::new(),
                items: 1,
                closures: Vec::new(),
            }],
            vars: Vec::new(),
        }
    }

    /// The global scope.
    pub fn global(&self) -> ScopeId {
        ScopeId(0)
    }

    /// Opens a scope nested in `parent`.
    pub fn push_scope(&mut self, kind: ScopeKind, parent: ScopeId) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        let function = match kind {
            ScopeKind::Block => self.scope(parent).function,
            _ => id,
        };

        self.scopes.push(Scope {
            kind,
            parent: Some(parent),
            function,
            names: FxHashMap::default(),
            vars: Vec::new(),
            // Slot 0 holds `this`.
            items: 1,
            closures: Vec::new(),
        });

        id
    }

    /// Scope by id.
    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    /// Mutable scope by id.
    pub fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.0 as usize]
    }

    /// Variable by id.
    pub fn var(&self, id: VarId) -> &Variable {
        &self.vars[id.0 as usize]
    }

    /// Mutable variable by id.
    pub fn var_mut(&mut self, id: VarId) -> &mut Variable {
        &mut self.vars[id.0 as usize]
    }

    /// Slot level of frames owned by `function`.
    pub fn level(&self, function: ScopeId) -> Level {
        match self.scope(function).kind {
            ScopeKind::Global => Level::Global,
            _ => Level::Local,
        }
    }

    /// Declares `name` in `scope`, or returns the existing variable.
    ///
    /// The slot is taken from the frame of the owning function.
    pub fn declare(&mut self, scope: ScopeId, name: &str, kind: VarKind) -> Result<VarId> {
        if let Some(&id) = self.scope(scope).names.get(name) {
            if kind == VarKind::Function {
                let var = self.var_mut(id);
                var.kind = VarKind::Function;
                var.index = Index::new(var.index.value(), var.index.level(), VarClass::Function)?;
            }
            return Ok(id);
        }

        let function = self.scope(scope).function;
        let level = self.level(function);
        let value = self.scope(function).items;
        let index = Index::new(value, level, kind.class())?;
        self.scope_mut(function).items += 1;

        let id = VarId(self.vars.len() as u32);
        self.vars.push(Variable {
            name: name.to_string(),
            kind,
            index,
            scope,
            closure: false,
            init: false,
            argument: false,
            arguments_object: false,
            lambda: None,
        });

        let scope = self.scope_mut(scope);
        scope.names.insert(name.to_string(), id);
        scope.vars.push(id);

        Ok(id)
    }

    /// Finds `name` starting at `scope` and walking outwards.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<VarId> {
        let mut current = Some(scope);

        while let Some(id) = current {
            let scope = self.scope(id);

            if let Some(&var) = scope.names.get(name) {
                return Some(var);
            }

            current = scope.parent;
        }

        None
    }

    /// Variables declared directly in `scope`, in declaration order.
    pub fn variables(&self, scope: ScopeId) -> impl Iterator<Item = &Variable> {
        self.scope(scope).vars.iter().map(|&id| self.var(id))
    }

    /// Variables declared in `function` and its block scopes.
    pub fn frame_variables(&self, function: ScopeId) -> impl Iterator<Item = &Variable> {
        self.vars
            .iter()
            .filter(move |v| self.scope(v.scope).function == function)
    }

    /// Adds `source` to the closure list of `function`, returning the
    /// `Closure`-level slot it is reachable through.
    pub fn add_closure(&mut self, function: ScopeId, source: Index) -> Result<Index> {
        let closures = &mut self.scope_mut(function).closures;

        let pos = match closures.iter().position(|&c| c == source) {
            Some(pos) => pos,
            None => {
                closures.push(source);
                closures.len() - 1
            }
        };

        Index::new(pos as u32, Level::Closure, source.class())
    }

    /// Number of scopes.
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    /// Always false; the global scope exists from creation.
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}
