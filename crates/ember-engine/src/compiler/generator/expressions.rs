// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Expression generation.
//!
//! Every expression leaves its value in a [`Slot`]. A destination hint lets
//! the last instruction of an expression write straight into the slot of
//! the variable being assigned, which saves a `MOVE`.

use super::{Access, Generator, Slot};
use crate::ast::{
    BinaryOp, Expr, ExprKind, Function, Identifier, LogicalOp, Property, UnaryOp, UpdateOp, VarId,
    VarKind,
};
use crate::compiler::bytecode::{Constant, OpCode, field};
use crate::compiler::index::Index;
use crate::string::JsString;
use crate::{Error, Result};

fn binary_opcode(op: BinaryOp) -> OpCode {
    match op {
        BinaryOp::Add => OpCode::Addition,
        BinaryOp::Sub => OpCode::Subtraction,
        BinaryOp::Mul => OpCode::Multiplication,
        BinaryOp::Div => OpCode::Division,
        BinaryOp::Mod => OpCode::Remainder,
        BinaryOp::Pow => OpCode::Exponentiation,
        BinaryOp::Eq => OpCode::Equal,
        BinaryOp::Ne => OpCode::NotEqual,
        BinaryOp::StrictEq => OpCode::StrictEqual,
        BinaryOp::StrictNe => OpCode::StrictNotEqual,
        BinaryOp::Lt => OpCode::Less,
        BinaryOp::Le => OpCode::LessOrEqual,
        BinaryOp::Gt => OpCode::Greater,
        BinaryOp::Ge => OpCode::GreaterOrEqual,
        BinaryOp::BitAnd => OpCode::BitwiseAnd,
        BinaryOp::BitOr => OpCode::BitwiseOr,
        BinaryOp::BitXor => OpCode::BitwiseXor,
        BinaryOp::Shl => OpCode::LeftShift,
        BinaryOp::Shr => OpCode::RightShift,
        BinaryOp::UShr => OpCode::UnsignedRightShift,
        BinaryOp::In => OpCode::PropertyIn,
        BinaryOp::InstanceOf => OpCode::InstanceOf,
    }
}

fn is_name(expr: &Expr) -> bool {
    matches!(expr.kind, ExprKind::Name(_))
}

impl Generator<'_> {
    /// Generates an expression, optionally into `dest`.
    pub(super) fn expression(&mut self, expr: &Expr, dest: Option<Index>) -> Result<Slot> {
        let saved = self.enter(expr.line)?;
        let result = self.expression_kind(expr, dest);
        self.leave(saved);
        result
    }

    fn expression_kind(&mut self, expr: &Expr, dest: Option<Index>) -> Result<Slot> {
        match &expr.kind {
            ExprKind::Number(n) => self.constant(Constant::Number(*n)),
            ExprKind::String(s) => self.constant(Constant::String(JsString::text(s)?)),
            ExprKind::Boolean(b) => self.constant(Constant::Boolean(*b)),
            ExprKind::Null => self.constant(Constant::Null),
            ExprKind::Undefined => Ok(Slot::named(Index::UNDEFINED)),
            ExprKind::This => Ok(Slot::named(Index::this(self.indexes.level()))),
            ExprKind::Name(id) => self.name(id),

            ExprKind::Object(properties) => self.object(properties, dest),
            ExprKind::Array(elements) => self.array(elements, dest),
            ExprKind::Function(function) => self.function_expression(function, dest),

            ExprKind::Assign {
                op: None,
                target,
                value,
            } => self.assignment(target, value),
            ExprKind::Assign {
                op: Some(op),
                target,
                value,
            } => self.operation_assignment(binary_opcode(*op), target, value),

            ExprKind::Binary {
                op: BinaryOp::In,
                left,
                right,
            } => self.binary(OpCode::PropertyIn, left, right, true, dest),
            ExprKind::Binary { op, left, right } => self.binary(binary_opcode(*op), left, right, false, dest),

            ExprKind::Logical { op, left, right } => {
                let op = match op {
                    LogicalOp::And => OpCode::TestIfFalse,
                    LogicalOp::Or => OpCode::TestIfTrue,
                    LogicalOp::Coalesce => OpCode::Coalesce,
                };
                self.test_jump(op, left, right)
            }

            ExprKind::Unary { op, argument } => self.unary(*op, argument, dest),
            ExprKind::Update {
                op,
                prefix,
                argument,
            } => {
                let op = match (*op, *prefix) {
                    (UpdateOp::Increment, true) => OpCode::Increment,
                    (UpdateOp::Decrement, true) => OpCode::Decrement,
                    (UpdateOp::Increment, false) => OpCode::PostIncrement,
                    (UpdateOp::Decrement, false) => OpCode::PostDecrement,
                };
                self.inc_dec(op, !*prefix, argument, dest)
            }

            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => self.conditional(test, consequent, alternate, dest),

            ExprKind::Comma { left, right } => {
                let left = self.expression(left, None)?;
                self.release(left);
                self.expression(right, None)
            }

            ExprKind::Member { object, property } => {
                self.binary(OpCode::PropertyGet, object, property, false, dest)
            }

            ExprKind::Call { callee, arguments } => self.call(callee, arguments, false, dest),
            ExprKind::New { callee, arguments } => self.call(callee, arguments, true, dest),
        }
    }

    // ========================================================================
    // Operators
    // ========================================================================

    fn binary(&mut self, op: OpCode, left: &Expr, right: &Expr, swap: bool, dest: Option<Index>) -> Result<Slot> {
        let mut src1 = self.expression(left, None)?;

        // The right operand may reassign the variable read on the left.
        if is_name(left) && right.has_side_effect() {
            src1 = self.snapshot(src1)?;
        }

        let src2 = self.expression(right, None)?;
        let result = self.dest_index(dest, &[src1, src2])?;

        let (src1, src2) = if swap { (src2, src1) } else { (src1, src2) };
        self.emit(op, &[result.bits(), src1.bits(), src2.bits()])?;

        Ok(result)
    }

    fn unary(&mut self, op: UnaryOp, argument: &Expr, dest: Option<Index>) -> Result<Slot> {
        let op = match op {
            UnaryOp::Minus => OpCode::UnaryNegation,
            UnaryOp::Plus => OpCode::UnaryPlus,
            UnaryOp::Not => OpCode::LogicalNot,
            UnaryOp::BitNot => OpCode::BitwiseNot,
            UnaryOp::Void => OpCode::Void,
            UnaryOp::Typeof => return self.typeof_operation(argument, dest),
            UnaryOp::Delete => match &argument.kind {
                ExprKind::Member { object, property } => {
                    return self.binary(OpCode::PropertyDelete, object, property, false, dest);
                }
                _ => OpCode::Delete,
            },
        };

        let src = self.expression(argument, None)?;
        self.unary_record(op, src, dest)
    }

    fn typeof_operation(&mut self, argument: &Expr, dest: Option<Index>) -> Result<Slot> {
        let src = match &argument.kind {
            ExprKind::Name(id) => self.variable(id, Access::Typeof)?.0,
            _ => self.expression(argument, None)?,
        };

        self.unary_record(OpCode::Typeof, src, dest)
    }

    fn unary_record(&mut self, op: OpCode, src: Slot, dest: Option<Index>) -> Result<Slot> {
        let result = self.dest_index(dest, &[src])?;
        self.emit(op, &[result.bits(), src.bits()])?;
        Ok(result)
    }

    /// `&&`, `||` and `??`: the left value is kept unless the right operand
    /// has to be evaluated.
    fn test_jump(&mut self, op: OpCode, left: &Expr, right: &Expr) -> Result<Slot> {
        let value = self.expression(left, None)?;
        let result = self.temp()?;

        let jump = self.emit(op, &[result.bits(), value.bits(), 0])?;

        let other = self.expression(right, Some(result.index))?;
        if other.index != result.index {
            self.emit(OpCode::Move, &[result.bits(), other.bits()])?;
        }

        self.set_jump_offset(jump, op)?;

        self.release(value);
        self.release(other);

        Ok(result)
    }

    fn conditional(&mut self, test: &Expr, consequent: &Expr, alternate: &Expr, dest: Option<Index>) -> Result<Slot> {
        let cond = self.expression(test, None)?;
        let jump = self.emit(OpCode::IfFalseJump, &[0, cond.bits()])?;

        let result = self.dest_index(dest, &[cond])?;

        let value = self.expression(consequent, Some(result.index))?;
        if value.index != result.index {
            self.emit(OpCode::Move, &[result.bits(), value.bits()])?;
        }
        self.release(value);

        let over = self.emit(OpCode::Jump, &[0])?;
        self.set_jump_offset(jump, OpCode::IfFalseJump)?;

        let value = self.expression(alternate, Some(result.index))?;
        if value.index != result.index {
            self.emit(OpCode::Move, &[result.bits(), value.bits()])?;
        }

        self.set_jump_offset(over, OpCode::Jump)?;
        self.release(value);

        Ok(result)
    }

    fn inc_dec(&mut self, op: OpCode, post: bool, argument: &Expr, dest: Option<Index>) -> Result<Slot> {
        match &argument.kind {
            ExprKind::Name(id) => {
                let (lvalue, var) = self.variable(id, Access::Reference)?;
                if let Some(slot) = self.const_assignment(var, lvalue)? {
                    return Ok(slot);
                }

                let result = self.dest_index(dest, &[])?;
                self.emit(op, &[result.bits(), lvalue.bits(), lvalue.bits()])?;

                self.global_property_set(id, lvalue.index)?;
                self.release(lvalue);

                Ok(result)
            }
            ExprKind::Member { object, property } => {
                let object = self.expression(object, None)?;
                let property = self.expression(property, None)?;

                let result = match dest {
                    Some(dest) if dest != object.index && dest != property.index && !self.dest_disable => {
                        Slot::named(dest)
                    }
                    _ => self.temp()?,
                };

                let value = if post { self.temp()? } else { result };

                self.emit(OpCode::PropertyGet, &[value.bits(), object.bits(), property.bits()])?;
                self.emit(op, &[result.bits(), value.bits(), value.bits()])?;
                self.emit(OpCode::PropertySet, &[value.bits(), object.bits(), property.bits()])?;

                if post {
                    self.release(value);
                }

                self.release(object);
                self.release(property);

                Ok(result)
            }
            _ => Err(self.syntax_error("Invalid left-hand side in postfix operation")),
        }
    }

    // ========================================================================
    // Assignment
    // ========================================================================

    /// Emits `ASSIGNMENT_ERROR` when `var` is a constant. The returned slot
    /// stands in for the value of the failed assignment.
    fn const_assignment(&mut self, var: Option<VarId>, lvalue: Slot) -> Result<Option<Slot>> {
        let Some(var) = var else {
            return Ok(None);
        };

        let var = self.scopes.var(var);
        if var.kind != VarKind::Const {
            return Ok(None);
        }

        let index = var.index;
        self.emit(OpCode::AssignmentError, &[index.bits()])?;

        Ok(Some(lvalue))
    }

    fn assignment(&mut self, target: &Expr, value: &Expr) -> Result<Slot> {
        match &target.kind {
            ExprKind::Name(id) => self.assign_name(id, value),
            ExprKind::Member { object, property } => {
                let (object, property) = self.property_target(object, property, value)?;

                let value = self.expression(value, None)?;
                self.emit(OpCode::PropertySet, &[value.bits(), object.bits(), property.bits()])?;

                self.release(object);
                self.release(property);

                Ok(value)
            }
            _ => Err(self.syntax_error("Invalid left-hand side in assignment")),
        }
    }

    fn assign_name(&mut self, id: &Identifier, value: &Expr) -> Result<Slot> {
        let (lvalue, var) = self.variable(id, Access::Reference)?;
        if let Some(slot) = self.const_assignment(var, lvalue)? {
            return Ok(slot);
        }

        let value = self.expression(value, Some(lvalue.index))?;
        if lvalue.index != value.index {
            self.emit(OpCode::Move, &[lvalue.bits(), value.bits()])?;
        }

        self.global_property_set(id, lvalue.index)?;

        if value.index == lvalue.index {
            return Ok(Slot {
                index: value.index,
                temporary: value.temporary || lvalue.temporary,
            });
        }

        self.release(lvalue);
        Ok(value)
    }

    /// Object and key of a property target. Names are copied when the
    /// assigned value could reassign them before the store.
    fn property_target(&mut self, object: &Expr, property: &Expr, value: &Expr) -> Result<(Slot, Slot)> {
        let mut obj = self.expression(object, None)?;
        let mut key = self.expression(property, None)?;

        if value.has_side_effect() {
            if is_name(object) {
                obj = self.snapshot(obj)?;
            }
            if is_name(property) {
                key = self.snapshot(key)?;
            }
        }

        Ok((obj, key))
    }

    fn operation_assignment(&mut self, op: OpCode, target: &Expr, value: &Expr) -> Result<Slot> {
        match &target.kind {
            ExprKind::Name(id) => {
                let (lvalue, var) = self.variable(id, Access::Reference)?;
                if let Some(slot) = self.const_assignment(var, lvalue)? {
                    return Ok(slot);
                }

                let src = if value.has_side_effect() {
                    let temp = self.temp()?;
                    self.emit(OpCode::Move, &[temp.bits(), lvalue.bits()])?;
                    temp
                } else {
                    lvalue
                };

                let value = self.expression(value, None)?;
                self.emit(op, &[lvalue.bits(), src.bits(), value.bits()])?;

                self.global_property_set(id, lvalue.index)?;

                if src.index != lvalue.index {
                    self.release(src);
                }
                self.release(value);

                Ok(lvalue)
            }
            ExprKind::Member { object, property } => {
                let (object, property) = self.property_target(object, property, value)?;

                let result = self.temp()?;
                self.emit(OpCode::PropertyGet, &[result.bits(), object.bits(), property.bits()])?;

                let value = self.expression(value, None)?;
                self.emit(op, &[result.bits(), result.bits(), value.bits()])?;
                self.emit(OpCode::PropertySet, &[result.bits(), object.bits(), property.bits()])?;

                self.release(object);
                self.release(property);
                self.release(value);

                Ok(result)
            }
            _ => Err(self.syntax_error("Invalid left-hand side in assignment")),
        }
    }

    // ========================================================================
    // Literals
    // ========================================================================

    fn object(&mut self, properties: &[Property], dest: Option<Index>) -> Result<Slot> {
        let result = self.object_dest_index(dest, properties.is_empty())?;
        self.emit(OpCode::Object, &[result.bits()])?;

        for property in properties {
            let key = self.expression(&property.key, None)?;
            let value = self.expression(&property.value, None)?;

            self.emit(OpCode::PropertyInit, &[value.bits(), result.bits(), key.bits()])?;

            self.release(key);
            self.release(value);
        }

        Ok(result)
    }

    fn array(&mut self, elements: &[Option<Expr>], dest: Option<Index>) -> Result<Slot> {
        let length = u32::try_from(elements.len()).map_err(|_| Error::range("Invalid array length"))?;

        let result = self.object_dest_index(dest, elements.is_empty())?;
        self.emit(OpCode::Array, &[result.bits(), length, 0])?;

        for (i, element) in elements.iter().enumerate() {
            let Some(element) = element else {
                continue;
            };

            let key = self.constant(Constant::Number(i as f64))?;
            let value = self.expression(element, None)?;

            self.emit(OpCode::PropertyInit, &[value.bits(), result.bits(), key.bits()])?;
            self.release(value);
        }

        Ok(result)
    }

    fn function_expression(&mut self, function: &Function, dest: Option<Index>) -> Result<Slot> {
        let lambda = self.reserve_lambda()?;
        let code = self.lambda(function)?;
        self.unit.lambdas[lambda as usize] = code;

        let result = self.object_dest_index(dest, true)?;
        self.emit(OpCode::Function, &[result.bits(), lambda])?;

        Ok(result)
    }

    // ========================================================================
    // Calls
    // ========================================================================

    fn call(&mut self, callee: &Expr, arguments: &[Expr], ctor: bool, dest: Option<Index>) -> Result<Slot> {
        let ctor = u32::from(ctor);

        let (frame, nargs_field, children) = match &callee.kind {
            ExprKind::Member { object, property } => {
                let object = self.expression(object, None)?;
                let method = self.expression(property, None)?;

                let frame = self.emit(OpCode::MethodFrame, &[object.bits(), method.bits(), 0, ctor])?;
                (frame, field(2), vec![object, method])
            }
            ExprKind::Name(id) => {
                let (function, _) = self.variable(id, Access::Reference)?;
                let frame = self.emit(OpCode::FunctionFrame, &[function.bits(), 0, ctor])?;
                (frame, field(1), vec![function])
            }
            _ => {
                let function = self.expression(callee, None)?;
                let frame = self.emit(OpCode::FunctionFrame, &[function.bits(), 0, ctor])?;
                (frame, field(1), vec![function])
            }
        };

        let mut nargs: u32 = 0;

        for argument in arguments {
            let value = self.expression(argument, None)?;
            self.emit(OpCode::MoveArg, &[nargs, value.bits()])?;
            self.release(value);

            nargs += 1;
        }

        self.code.write_u32(frame + nargs_field, nargs);

        let result = self.dest_index(dest, &children)?;
        self.emit(OpCode::FunctionCall, &[result.bits()])?;

        Ok(result)
    }
}
