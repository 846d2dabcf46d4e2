// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Abstract Syntax Tree (AST) consumed by the bytecode generator.
//!
//! Nodes carry a source line and are (de)serialisable so that trees can be
//! produced by an external parser and loaded from JSON. Name references are
//! bound to variables by [`resolve`], which fills the scope table the
//! generator reads.
//!
//! # Module Structure
//!
//! - `scope`: Scope table and variable records
//! - `resolve`: Declaration hoisting and reference binding

mod resolve;
mod scope;

pub use resolve::resolve;
pub use scope::{Binding, Scope, ScopeId, ScopeKind, ScopeTable, VarId, VarKind, Variable};

use serde::{Deserialize, Serialize};

/// A complete compile unit.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Program {
    /// Top-level statements
    pub body: Vec<Stmt>,
}

impl Program {
    /// Creates a program from its statements.
    pub fn new(body: Vec<Stmt>) -> Self {
        Self { body }
    }
}

/// An identifier, bound to a variable once resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identifier {
    /// The name of the identifier
    pub name: String,
    /// Variable and slot the name refers to
    #[serde(skip)]
    pub binding: Option<Binding>,
}

impl Identifier {
    /// Creates an unbound identifier.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            binding: None,
        }
    }
}

/// A statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    /// Statement kind and payload
    pub kind: StmtKind,
    /// Source line
    #[serde(default)]
    pub line: u32,
}

/// Statement kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StmtKind {
    /// Expression statement
    Expression(Expr),
    /// Variable declaration (var, let, const)
    Var(VariableDeclaration),
    /// Function declaration
    FunctionDeclaration(Box<Function>),
    /// If statement
    If {
        /// The condition
        test: Expr,
        /// The then branch
        consequent: Box<Stmt>,
        /// The optional else branch
        alternate: Option<Box<Stmt>>,
    },
    /// Switch statement
    Switch {
        /// The discriminant expression
        discriminant: Expr,
        /// The case clauses
        cases: Vec<SwitchCase>,
    },
    /// While statement
    While {
        /// The condition
        test: Expr,
        /// The loop body
        body: Box<Stmt>,
    },
    /// Do-while statement
    DoWhile {
        /// The loop body
        body: Box<Stmt>,
        /// The condition
        test: Expr,
    },
    /// For statement
    For {
        /// The initializer
        init: Option<ForInit>,
        /// The condition
        test: Option<Expr>,
        /// The update expression
        update: Option<Expr>,
        /// The loop body
        body: Box<Stmt>,
    },
    /// For-in statement
    ForIn {
        /// The left-hand side
        left: ForInLeft,
        /// The object to iterate over
        right: Expr,
        /// The loop body
        body: Box<Stmt>,
    },
    /// Block statement { ... }
    Block(Vec<Stmt>),
    /// Labeled statement
    Labeled {
        /// The label
        label: String,
        /// The labeled body
        body: Box<Stmt>,
    },
    /// Break statement with optional label
    Break(Option<String>),
    /// Continue statement with optional label
    Continue(Option<String>),
    /// Return statement
    Return(Option<Expr>),
    /// Throw statement
    Throw(Expr),
    /// Try statement
    Try {
        /// The protected block
        block: Vec<Stmt>,
        /// The catch clause
        handler: Option<CatchClause>,
        /// The finally block
        finalizer: Option<Vec<Stmt>>,
    },
    /// Empty statement (;)
    Empty,
}

/// Variable declaration kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    /// var declaration
    Var,
    /// let declaration
    Let,
    /// const declaration
    Const,
}

/// A single variable declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDeclaration {
    /// The kind of declaration
    pub kind: VariableKind,
    /// The identifier being declared
    pub id: Identifier,
    /// Optional initializer expression
    pub init: Option<Expr>,
}

/// A switch case clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchCase {
    /// The test expression (None for default)
    pub test: Option<Expr>,
    /// The consequent statements
    pub body: Vec<Stmt>,
}

/// For loop initializer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForInit {
    /// Variable declarations
    Var(Vec<VariableDeclaration>),
    /// Expression
    Expression(Expr),
}

/// Left-hand side of for-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForInLeft {
    /// Variable declaration without initializer
    Var(VariableDeclaration),
    /// Existing variable
    Name(Identifier),
}

/// A catch clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchClause {
    /// The error parameter
    pub param: Option<Identifier>,
    /// The catch body
    pub body: Vec<Stmt>,
}

/// A function declaration or expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    /// The function name
    pub id: Option<Identifier>,
    /// The parameters
    pub params: Vec<Identifier>,
    /// The function body
    pub body: Vec<Stmt>,
    /// Function scope, set by the resolver
    #[serde(skip)]
    pub scope: Option<ScopeId>,
}

/// An expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    /// Expression kind and payload
    pub kind: ExprKind,
    /// Source line
    #[serde(default)]
    pub line: u32,
}

/// Expression kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExprKind {
    /// Numeric literal
    Number(f64),
    /// String literal
    String(String),
    /// Boolean literal
    Boolean(bool),
    /// null literal
    Null,
    /// undefined literal
    Undefined,
    /// this keyword
    This,
    /// Identifier reference
    Name(Identifier),
    /// Object literal
    Object(Vec<Property>),
    /// Array literal; `None` is a hole
    Array(Vec<Option<Expr>>),
    /// Function expression
    Function(Box<Function>),
    /// Assignment, plain or compound
    Assign {
        /// Operator of a compound assignment
        op: Option<BinaryOp>,
        /// Name or member target
        target: Box<Expr>,
        /// Assigned value
        value: Box<Expr>,
    },
    /// Binary expression
    Binary {
        /// The operator
        op: BinaryOp,
        /// Left operand
        left: Box<Expr>,
        /// Right operand
        right: Box<Expr>,
    },
    /// Short-circuit expression
    Logical {
        /// The operator
        op: LogicalOp,
        /// Left operand
        left: Box<Expr>,
        /// Right operand
        right: Box<Expr>,
    },
    /// Unary expression
    Unary {
        /// The operator
        op: UnaryOp,
        /// The operand
        argument: Box<Expr>,
    },
    /// Update expression (++/--)
    Update {
        /// The operator
        op: UpdateOp,
        /// Prefix or postfix form
        prefix: bool,
        /// Name or member operand
        argument: Box<Expr>,
    },
    /// Conditional (ternary) expression
    Conditional {
        /// The condition
        test: Box<Expr>,
        /// Value if truthy
        consequent: Box<Expr>,
        /// Value if falsy
        alternate: Box<Expr>,
    },
    /// Comma expression
    Comma {
        /// Evaluated and discarded
        left: Box<Expr>,
        /// Result
        right: Box<Expr>,
    },
    /// Member access expression
    Member {
        /// The object
        object: Box<Expr>,
        /// The property key
        property: Box<Expr>,
    },
    /// Call expression
    Call {
        /// The callee
        callee: Box<Expr>,
        /// The arguments
        arguments: Vec<Expr>,
    },
    /// new expression
    New {
        /// The constructor
        callee: Box<Expr>,
        /// The arguments
        arguments: Vec<Expr>,
    },
}

/// An object literal property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    /// Property key
    pub key: Expr,
    /// Property value
    pub value: Expr,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    /// +
    Add,
    /// -
    Sub,
    /// *
    Mul,
    /// /
    Div,
    /// %
    Mod,
    /// **
    Pow,
    /// ==
    Eq,
    /// !=
    Ne,
    /// ===
    StrictEq,
    /// !==
    StrictNe,
    /// <
    Lt,
    /// <=
    Le,
    /// >
    Gt,
    /// >=
    Ge,
    /// &
    BitAnd,
    /// |
    BitOr,
    /// ^
    BitXor,
    /// <<
    Shl,
    /// >>
    Shr,
    /// >>>
    UShr,
    /// in
    In,
    /// instanceof
    InstanceOf,
}

/// Short-circuit operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalOp {
    /// &&
    And,
    /// ||
    Or,
    /// ??
    Coalesce,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    /// -
    Minus,
    /// +
    Plus,
    /// !
    Not,
    /// ~
    BitNot,
    /// typeof
    Typeof,
    /// void
    Void,
    /// delete
    Delete,
}

/// Update operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateOp {
    /// ++
    Increment,
    /// --
    Decrement,
}

// ============================================================================
// Builders
// ============================================================================

impl Stmt {
    /// Creates a statement on line 1.
    pub fn new(kind: StmtKind) -> Self {
        Self { kind, line: 1 }
    }

    /// Returns the statement moved to `line`.
    pub fn at(mut self, line: u32) -> Self {
        self.line = line;
        self
    }

    /// `e;`
    pub fn expression(expr: Expr) -> Self {
        Self::new(StmtKind::Expression(expr))
    }

    fn declare(kind: VariableKind, name: &str, init: Option<Expr>) -> Self {
        Self::new(StmtKind::Var(VariableDeclaration {
            kind,
            id: Identifier::new(name),
            init,
        }))
    }

    /// `var name = init;`
    pub fn var(name: &str, init: Option<Expr>) -> Self {
        Self::declare(VariableKind::Var, name, init)
    }

    /// `let name = init;`
    pub fn let_(name: &str, init: Option<Expr>) -> Self {
        Self::declare(VariableKind::Let, name, init)
    }

    /// `const name = init;`
    pub fn const_(name: &str, init: Option<Expr>) -> Self {
        Self::declare(VariableKind::Const, name, init)
    }

    /// `function name(params) { body }`
    pub fn function(name: &str, params: &[&str], body: Vec<Stmt>) -> Self {
        Self::new(StmtKind::FunctionDeclaration(Box::new(Function::new(
            Some(name),
            params,
            body,
        ))))
    }

    /// `if (test) consequent else alternate`
    pub fn if_(test: Expr, consequent: Stmt, alternate: Option<Stmt>) -> Self {
        Self::new(StmtKind::If {
            test,
            consequent: Box::new(consequent),
            alternate: alternate.map(Box::new),
        })
    }

    /// `while (test) body`
    pub fn while_(test: Expr, body: Stmt) -> Self {
        Self::new(StmtKind::While {
            test,
            body: Box::new(body),
        })
    }

    /// `do body while (test)`
    pub fn do_while(body: Stmt, test: Expr) -> Self {
        Self::new(StmtKind::DoWhile {
            body: Box::new(body),
            test,
        })
    }

    /// `for (init; test; update) body`
    pub fn for_(init: Option<ForInit>, test: Option<Expr>, update: Option<Expr>, body: Stmt) -> Self {
        Self::new(StmtKind::For {
            init,
            test,
            update,
            body: Box::new(body),
        })
    }

    /// `for (left in right) body`
    pub fn for_in(left: ForInLeft, right: Expr, body: Stmt) -> Self {
        Self::new(StmtKind::ForIn {
            left,
            right,
            body: Box::new(body),
        })
    }

    /// `switch (discriminant) { cases }`
    pub fn switch(discriminant: Expr, cases: Vec<SwitchCase>) -> Self {
        Self::new(StmtKind::Switch {
            discriminant,
            cases,
        })
    }

    /// `{ body }`
    pub fn block(body: Vec<Stmt>) -> Self {
        Self::new(StmtKind::Block(body))
    }

    /// `label: body`
    pub fn labeled(label: &str, body: Stmt) -> Self {
        Self::new(StmtKind::Labeled {
            label: label.to_string(),
            body: Box::new(body),
        })
    }

    /// `break label;`
    pub fn break_(label: Option<&str>) -> Self {
        Self::new(StmtKind::Break(label.map(str::to_string)))
    }

    /// `continue label;`
    pub fn continue_(label: Option<&str>) -> Self {
        Self::new(StmtKind::Continue(label.map(str::to_string)))
    }

    /// `return value;`
    pub fn return_(value: Option<Expr>) -> Self {
        Self::new(StmtKind::Return(value))
    }

    /// `throw value;`
    pub fn throw(value: Expr) -> Self {
        Self::new(StmtKind::Throw(value))
    }

    /// `try { block } catch (param) { .. } finally { .. }`
    pub fn try_(block: Vec<Stmt>, handler: Option<CatchClause>, finalizer: Option<Vec<Stmt>>) -> Self {
        Self::new(StmtKind::Try {
            block,
            handler,
            finalizer,
        })
    }
}

impl SwitchCase {
    /// `case test: body` or `default: body`.
    pub fn new(test: Option<Expr>, body: Vec<Stmt>) -> Self {
        Self { test, body }
    }
}

impl CatchClause {
    /// `catch (param) { body }`
    pub fn new(param: Option<&str>, body: Vec<Stmt>) -> Self {
        Self {
            param: param.map(Identifier::new),
            body,
        }
    }
}

impl VariableDeclaration {
    /// Creates a declaration.
    pub fn new(kind: VariableKind, name: &str, init: Option<Expr>) -> Self {
        Self {
            kind,
            id: Identifier::new(name),
            init,
        }
    }
}

impl Function {
    /// Creates an unresolved function.
    pub fn new(name: Option<&str>, params: &[&str], body: Vec<Stmt>) -> Self {
        Self {
            id: name.map(Identifier::new),
            params: params.iter().map(|p| Identifier::new(*p)).collect(),
            body,
            scope: None,
        }
    }

    /// Function name, empty when anonymous.
    pub fn name(&self) -> &str {
        self.id.as_ref().map_or("", |id| id.name.as_str())
    }
}

impl Expr {
    /// Creates an expression on line 1.
    pub fn new(kind: ExprKind) -> Self {
        Self { kind, line: 1 }
    }

    /// Returns the expression moved to `line`.
    pub fn at(mut self, line: u32) -> Self {
        self.line = line;
        self
    }

    /// Number literal.
    pub fn number(n: f64) -> Self {
        Self::new(ExprKind::Number(n))
    }

    /// String literal.
    pub fn string(s: &str) -> Self {
        Self::new(ExprKind::String(s.to_string()))
    }

    /// Boolean literal.
    pub fn boolean(b: bool) -> Self {
        Self::new(ExprKind::Boolean(b))
    }

    /// `null`
    pub fn null() -> Self {
        Self::new(ExprKind::Null)
    }

    /// `undefined`
    pub fn undefined() -> Self {
        Self::new(ExprKind::Undefined)
    }

    /// `this`
    pub fn this() -> Self {
        Self::new(ExprKind::This)
    }

    /// Name reference.
    pub fn name(name: &str) -> Self {
        Self::new(ExprKind::Name(Identifier::new(name)))
    }

    /// Binary expression.
    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Self::new(ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    /// `left + right`
    pub fn add(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Add, left, right)
    }

    /// Short-circuit expression.
    pub fn logical(op: LogicalOp, left: Expr, right: Expr) -> Self {
        Self::new(ExprKind::Logical {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    /// Unary expression.
    pub fn unary(op: UnaryOp, argument: Expr) -> Self {
        Self::new(ExprKind::Unary {
            op,
            argument: Box::new(argument),
        })
    }

    /// Update expression.
    pub fn update(op: UpdateOp, prefix: bool, argument: Expr) -> Self {
        Self::new(ExprKind::Update {
            op,
            prefix,
            argument: Box::new(argument),
        })
    }

    /// `target = value`
    pub fn assign(target: Expr, value: Expr) -> Self {
        Self::new(ExprKind::Assign {
            op: None,
            target: Box::new(target),
            value: Box::new(value),
        })
    }

    /// `target op= value`
    pub fn compound(op: BinaryOp, target: Expr, value: Expr) -> Self {
        Self::new(ExprKind::Assign {
            op: Some(op),
            target: Box::new(target),
            value: Box::new(value),
        })
    }

    /// `test ? consequent : alternate`
    pub fn conditional(test: Expr, consequent: Expr, alternate: Expr) -> Self {
        Self::new(ExprKind::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    /// `left, right`
    pub fn comma(left: Expr, right: Expr) -> Self {
        Self::new(ExprKind::Comma {
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    /// `object[property]`
    pub fn member(object: Expr, property: Expr) -> Self {
        Self::new(ExprKind::Member {
            object: Box::new(object),
            property: Box::new(property),
        })
    }

    /// `object.name`
    pub fn dot(object: Expr, name: &str) -> Self {
        Self::member(object, Expr::string(name))
    }

    /// `callee(arguments)`
    pub fn call(callee: Expr, arguments: Vec<Expr>) -> Self {
        Self::new(ExprKind::Call {
            callee: Box::new(callee),
            arguments,
        })
    }

    /// `new callee(arguments)`
    pub fn new_(callee: Expr, arguments: Vec<Expr>) -> Self {
        Self::new(ExprKind::New {
            callee: Box::new(callee),
            arguments,
        })
    }

    /// `{ key: value, .. }`
    pub fn object(properties: Vec<(Expr, Expr)>) -> Self {
        Self::new(ExprKind::Object(
            properties
                .into_iter()
                .map(|(key, value)| Property { key, value })
                .collect(),
        ))
    }

    /// `[a, , b]`
    pub fn array(elements: Vec<Option<Expr>>) -> Self {
        Self::new(ExprKind::Array(elements))
    }

    /// `function (params) { body }`
    pub fn function(name: Option<&str>, params: &[&str], body: Vec<Stmt>) -> Self {
        Self::new(ExprKind::Function(Box::new(Function::new(name, params, body))))
    }

    /// Returns true if evaluating the expression may write to a variable or
    /// run user code.
    pub fn has_side_effect(&self) -> bool {
        match &self.kind {
            ExprKind::Assign { .. }
            | ExprKind::Update { .. }
            | ExprKind::Call { .. }
            | ExprKind::New { .. } => true,

            ExprKind::Number(_)
            | ExprKind::String(_)
            | ExprKind::Boolean(_)
            | ExprKind::Null
            | ExprKind::Undefined
            | ExprKind::This
            | ExprKind::Name(_)
            | ExprKind::Function(_) => false,

            ExprKind::Object(properties) => properties
                .iter()
                .any(|p| p.key.has_side_effect() || p.value.has_side_effect()),
            ExprKind::Array(elements) => elements.iter().flatten().any(Expr::has_side_effect),
            ExprKind::Binary { left, right, .. }
            | ExprKind::Logical { left, right, .. }
            | ExprKind::Comma { left, right } => left.has_side_effect() || right.has_side_effect(),
            ExprKind::Unary { argument, .. } => argument.has_side_effect(),
            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => test.has_side_effect() || consequent.has_side_effect() || alternate.has_side_effect(),
            ExprKind::Member { object, property } => {
                object.has_side_effect() || property.has_side_effect()
            }
        }
    }
}

// ============================================================================
// Name visitor
// ============================================================================

impl Function {
    fn for_each_name<F: FnMut(&Identifier)>(&self, f: &mut F) {
        if let Some(id) = &self.id {
            f(id);
        }
        self.params.iter().for_each(|p| f(p));
        for stmt in &self.body {
            stmt.for_each_name(f);
        }
    }
}

impl Expr {
    /// Calls `f` for every identifier in the expression, nested function
    /// bodies included.
    pub fn for_each_name<F: FnMut(&Identifier)>(&self, f: &mut F) {
        match &self.kind {
            ExprKind::Number(_)
            | ExprKind::String(_)
            | ExprKind::Boolean(_)
            | ExprKind::Null
            | ExprKind::Undefined
            | ExprKind::This => {}
            ExprKind::Name(id) => f(id),
            ExprKind::Object(properties) => {
                for p in properties {
                    p.key.for_each_name(f);
                    p.value.for_each_name(f);
                }
            }
            ExprKind::Array(elements) => {
                for e in elements.iter().flatten() {
                    e.for_each_name(f);
                }
            }
            ExprKind::Function(func) => func.for_each_name(f),
            ExprKind::Assign {
                target: left,
                value: right,
                ..
            }
            | ExprKind::Binary { left, right, .. }
            | ExprKind::Logical { left, right, .. }
            | ExprKind::Comma { left, right }
            | ExprKind::Member {
                object: left,
                property: right,
            } => {
                left.for_each_name(f);
                right.for_each_name(f);
            }
            ExprKind::Unary { argument, .. } | ExprKind::Update { argument, .. } => {
                argument.for_each_name(f)
            }
            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                test.for_each_name(f);
                consequent.for_each_name(f);
                alternate.for_each_name(f);
            }
            ExprKind::Call { callee, arguments } | ExprKind::New { callee, arguments } => {
                callee.for_each_name(f);
                for a in arguments {
                    a.for_each_name(f);
                }
            }
        }
    }
}

impl Stmt {
    /// Calls `f` for every identifier in the statement, nested function
    /// bodies included.
    pub fn for_each_name<F: FnMut(&Identifier)>(&self, f: &mut F) {
        let decl = |d: &VariableDeclaration, f: &mut F| {
            f(&d.id);
            if let Some(init) = &d.init {
                init.for_each_name(f);
            }
        };

        match &self.kind {
            StmtKind::Expression(e) | StmtKind::Throw(e) | StmtKind::Return(Some(e)) => {
                e.for_each_name(f)
            }
            StmtKind::Var(d) => decl(d, f),
            StmtKind::FunctionDeclaration(func) => func.for_each_name(f),
            StmtKind::If {
                test,
                consequent,
                alternate,
            } => {
                test.for_each_name(f);
                consequent.for_each_name(f);
                if let Some(alt) = alternate {
                    alt.for_each_name(f);
                }
            }
            StmtKind::Switch {
                discriminant,
                cases,
            } => {
                discriminant.for_each_name(f);
                for case in cases {
                    if let Some(test) = &case.test {
                        test.for_each_name(f);
                    }
                    case.body.iter().for_each(|s| s.for_each_name(f));
                }
            }
            StmtKind::While { test, body } | StmtKind::DoWhile { body, test } => {
                test.for_each_name(f);
                body.for_each_name(f);
            }
            StmtKind::For {
                init,
                test,
                update,
                body,
            } => {
                match init {
                    Some(ForInit::Var(decls)) => decls.iter().for_each(|d| decl(d, f)),
                    Some(ForInit::Expression(e)) => e.for_each_name(f),
                    None => {}
                }
                for e in test.iter().chain(update.iter()) {
                    e.for_each_name(f);
                }
                body.for_each_name(f);
            }
            StmtKind::ForIn { left, right, body } => {
                match left {
                    ForInLeft::Var(d) => decl(d, f),
                    ForInLeft::Name(id) => f(id),
                }
                right.for_each_name(f);
                body.for_each_name(f);
            }
            StmtKind::Block(body) => body.iter().for_each(|s| s.for_each_name(f)),
            StmtKind::Labeled { body, .. } => body.for_each_name(f),
            StmtKind::Try {
                block,
                handler,
                finalizer,
            } => {
                block.iter().for_each(|s| s.for_each_name(f));
                if let Some(handler) = handler {
                    if let Some(param) = &handler.param {
                        f(param);
                    }
                    handler.body.iter().for_each(|s| s.for_each_name(f));
                }
                finalizer.iter().flatten().for_each(|s| s.for_each_name(f));
            }
            StmtKind::Return(None) | StmtKind::Break(_) | StmtKind::Continue(_) | StmtKind::Empty => {}
        }
    }
}
