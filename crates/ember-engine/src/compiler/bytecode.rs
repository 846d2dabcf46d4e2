// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Bytecode definitions.
//!
//! A code unit is a flat byte stream of records. Each record is a 4 byte
//! header `[opcode, operands, 0, 0]` followed by little-endian 32-bit
//! fields. `operands` is `3 - nargs`, where `nargs` is fixed per opcode.

use std::fmt;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use super::index::{Index, Level, VarClass};
use super::lines::LineMap;
use crate::string::JsString;
use crate::{Error, Result};

/// Size of the record header.
pub const HEADER_SIZE: usize = 4;

/// Size of one record field.
pub const FIELD_SIZE: usize = 4;

/// Byte offset of field `i` within a record.
pub const fn field(i: usize) -> usize {
    HEADER_SIZE + FIELD_SIZE * i
}

/// How a record field is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Slot index bits
    Index,
    /// Signed jump relative to the record start
    Offset,
    /// Plain number or flag
    Count,
    /// Lambda table position
    Lambda,
    /// Error kind
    Kind,
}

/// Name and kind of a record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// Field name
    pub name: &'static str,
    /// Field interpretation
    pub kind: FieldKind,
}

const fn index(name: &'static str) -> Field {
    Field {
        name,
        kind: FieldKind::Index,
    }
}

const fn offset(name: &'static str) -> Field {
    Field {
        name,
        kind: FieldKind::Offset,
    }
}

const fn count(name: &'static str) -> Field {
    Field {
        name,
        kind: FieldKind::Count,
    }
}

const RETVAL: &[Field] = &[index("retval")];
const DST: &[Field] = &[index("dst")];
const JUMP: &[Field] = &[offset("offset")];
const PROPERTY: &[Field] = &[index("value"), index("object"), index("property")];
const COND_JUMP: &[Field] = &[offset("offset"), index("cond")];
const EQUAL_JUMP: &[Field] = &[offset("offset"), index("value1"), index("value2")];
const THREE_ADDR: &[Field] = &[index("dst"), index("src1"), index("src2")];
const TWO_ADDR: &[Field] = &[index("dst"), index("src")];
const TEST_JUMP: &[Field] = &[index("retval"), index("value"), offset("offset")];
const FUNCTION_COPY: &[Field] = &[
    index("retval"),
    Field {
        name: "lambda",
        kind: FieldKind::Lambda,
    },
];
const FUNCTION_FRAME: &[Field] = &[index("name"), count("nargs"), count("ctor")];
const METHOD_FRAME: &[Field] = &[
    index("object"),
    index("method"),
    count("nargs"),
    count("ctor"),
];
const MOVE_ARG: &[Field] = &[count("dst"), index("src")];
const FOREACH: &[Field] = &[index("object"), index("next"), offset("offset")];
const NEXT: &[Field] = &[
    index("retval"),
    index("object"),
    index("next"),
    offset("offset"),
];
const TRY_START: &[Field] = &[
    offset("offset"),
    index("exception_value"),
    index("exit_value"),
];
const TRAMPOLINE: &[Field] = &[index("exit_value"), offset("offset")];
const TRY_RETURN: &[Field] = &[index("save"), index("retval"), offset("offset")];
const CATCH: &[Field] = &[offset("offset"), index("exception")];
const FINALLY: &[Field] = &[
    index("retval"),
    index("exit_value"),
    offset("continue_offset"),
    offset("break_offset"),
];
const ERROR: &[Field] = &[
    Field {
        name: "kind",
        kind: FieldKind::Kind,
    },
    index("name"),
];
const ARRAY: &[Field] = &[index("retval"), count("length"), count("ctor")];

/// Operation codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    // Control
    /// End of the top-level code
    Stop,
    /// Unconditional jump
    Jump,
    /// Jump if the condition is truthy
    IfTrueJump,
    /// Jump if the condition is falsy
    IfFalseJump,
    /// Jump if two values are strictly equal
    IfEqualJump,
    /// Return from the current function
    Return,
    /// Throw a value
    Throw,

    // Properties
    /// `object[property] = value`
    PropertySet,
    /// Define an own property on a literal
    PropertyInit,
    /// `value = object[property]`
    PropertyGet,
    /// Global lookup that may raise
    GlobalGet,
    /// Start a for-in enumeration
    PropertyForeach,
    /// Advance a for-in enumeration
    PropertyNext,

    // Calls and functions
    /// Call a prepared frame
    FunctionCall,
    /// Copy a declared function out of its slot
    FunctionCopy,
    /// Prepare a plain call frame
    FunctionFrame,
    /// Prepare a method call frame
    MethodFrame,
    /// Store an argument into the frame
    MoveArg,
    /// Materialise the `arguments` object
    Arguments,
    /// Create a closure for a function expression
    Function,

    // Exceptions
    /// Enter a protected region
    TryStart,
    /// Route a `break` through `finally`
    TryBreak,
    /// Route a `continue` through `finally`
    TryContinue,
    /// Leave a protected region
    TryEnd,
    /// Stash a return value and run `finally`
    TryReturn,
    /// Bind the pending exception
    Catch,
    /// Resume the pending exit after `finally`
    Finally,

    // Bindings
    /// Initialise a `let`/`const` slot
    Let,
    /// Fresh per-iteration copy of a captured binding
    LetUpdate,
    /// Raise if a binding is still uninitialised
    InitializationTest,
    /// Raise for assignment to a constant
    AssignmentError,
    /// Raise for access before initialisation
    NotInitialized,
    /// Raise a typed error
    Error,
    /// Copy a slot
    Move,

    // Binary operators
    /// `+`
    Addition,
    /// `-`
    Subtraction,
    /// `*`
    Multiplication,
    /// `**`
    Exponentiation,
    /// `/`
    Division,
    /// `%`
    Remainder,
    /// `<<`
    LeftShift,
    /// `>>`
    RightShift,
    /// `>>>`
    UnsignedRightShift,
    /// `&`
    BitwiseAnd,
    /// `|`
    BitwiseOr,
    /// `^`
    BitwiseXor,
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
    /// `===`
    StrictEqual,
    /// `!==`
    StrictNotEqual,
    /// `<`
    Less,
    /// `<=`
    LessOrEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterOrEqual,
    /// `in`
    PropertyIn,
    /// `instanceof`
    InstanceOf,
    /// `delete object[property]`
    PropertyDelete,

    // Updates
    /// `++x`
    Increment,
    /// `--x`
    Decrement,
    /// `x++`
    PostIncrement,
    /// `x--`
    PostDecrement,

    // Short circuit
    /// `||`
    TestIfTrue,
    /// `&&`
    TestIfFalse,
    /// `??`
    Coalesce,

    // Unary operators
    /// `+x`
    UnaryPlus,
    /// `-x`
    UnaryNegation,
    /// `~x`
    BitwiseNot,
    /// `!x`
    LogicalNot,
    /// `typeof x`
    Typeof,
    /// `void x`
    Void,
    /// `delete x`
    Delete,

    // Literals
    /// Empty object
    Object,
    /// Array with preset length
    Array,
}

const OPCODES: &[OpCode] = &[
    OpCode::Stop,
    OpCode::Jump,
    OpCode::IfTrueJump,
    OpCode::IfFalseJump,
    OpCode::IfEqualJump,
    OpCode::Return,
    OpCode::Throw,
    OpCode::PropertySet,
    OpCode::PropertyInit,
    OpCode::PropertyGet,
    OpCode::GlobalGet,
    OpCode::PropertyForeach,
    OpCode::PropertyNext,
    OpCode::FunctionCall,
    OpCode::FunctionCopy,
    OpCode::FunctionFrame,
    OpCode::MethodFrame,
    OpCode::MoveArg,
    OpCode::Arguments,
    OpCode::Function,
    OpCode::TryStart,
    OpCode::TryBreak,
    OpCode::TryContinue,
    OpCode::TryEnd,
    OpCode::TryReturn,
    OpCode::Catch,
    OpCode::Finally,
    OpCode::Let,
    OpCode::LetUpdate,
    OpCode::InitializationTest,
    OpCode::AssignmentError,
    OpCode::NotInitialized,
    OpCode::Error,
    OpCode::Move,
    OpCode::Addition,
    OpCode::Subtraction,
    OpCode::Multiplication,
    OpCode::Exponentiation,
    OpCode::Division,
    OpCode::Remainder,
    OpCode::LeftShift,
    OpCode::RightShift,
    OpCode::UnsignedRightShift,
    OpCode::BitwiseAnd,
    OpCode::BitwiseOr,
    OpCode::BitwiseXor,
    OpCode::Equal,
    OpCode::NotEqual,
    OpCode::StrictEqual,
    OpCode::StrictNotEqual,
    OpCode::Less,
    OpCode::LessOrEqual,
    OpCode::Greater,
    OpCode::GreaterOrEqual,
    OpCode::PropertyIn,
    OpCode::InstanceOf,
    OpCode::PropertyDelete,
    OpCode::Increment,
    OpCode::Decrement,
    OpCode::PostIncrement,
    OpCode::PostDecrement,
    OpCode::TestIfTrue,
    OpCode::TestIfFalse,
    OpCode::Coalesce,
    OpCode::UnaryPlus,
    OpCode::UnaryNegation,
    OpCode::BitwiseNot,
    OpCode::LogicalNot,
    OpCode::Typeof,
    OpCode::Void,
    OpCode::Delete,
    OpCode::Object,
    OpCode::Array,
];

impl OpCode {
    /// Decodes an opcode byte.
    pub fn from_u8(byte: u8) -> Option<OpCode> {
        OPCODES.get(usize::from(byte)).copied()
    }

    /// Number of operands the interpreter reads from slots.
    pub fn nargs(self) -> u8 {
        use OpCode::*;

        match self {
            Jump | FunctionCopy | MoveArg | TryEnd | Let | LetUpdate | InitializationTest
            | AssignmentError | Error => 0,

            Stop | Return | Throw | FunctionCall | Arguments | TryBreak | TryContinue
            | Finally | NotInitialized | Object | Array | Function => 1,

            IfTrueJump | IfFalseJump | FunctionFrame | PropertyForeach | TryStart
            | TryReturn | Catch | Move | TestIfTrue | TestIfFalse | Coalesce | UnaryPlus
            | UnaryNegation | BitwiseNot | LogicalNot | Typeof | Void | Delete => 2,

            _ => 3,
        }
    }

    /// Field layout of the record.
    pub fn fields(self) -> &'static [Field] {
        use OpCode::*;

        match self {
            Stop | Return | Throw | FunctionCall | Object => RETVAL,
            Jump | TryEnd => JUMP,
            PropertySet | PropertyInit | PropertyGet | GlobalGet => PROPERTY,
            IfTrueJump | IfFalseJump => COND_JUMP,
            IfEqualJump => EQUAL_JUMP,
            FunctionCopy | Function => FUNCTION_COPY,
            FunctionFrame => FUNCTION_FRAME,
            MethodFrame => METHOD_FRAME,
            MoveArg => MOVE_ARG,
            PropertyForeach => FOREACH,
            PropertyNext => NEXT,
            Arguments | Let | LetUpdate | InitializationTest | AssignmentError
            | NotInitialized => DST,
            TryStart => TRY_START,
            TryBreak | TryContinue => TRAMPOLINE,
            TryReturn => TRY_RETURN,
            Catch => CATCH,
            Finally => FINALLY,
            Error => ERROR,
            Move | UnaryPlus | UnaryNegation | BitwiseNot | LogicalNot | Typeof | Void
            | Delete => TWO_ADDR,
            TestIfTrue | TestIfFalse | Coalesce => TEST_JUMP,
            Array => ARRAY,
            _ => THREE_ADDR,
        }
    }

    /// Record size in bytes.
    pub fn size(self) -> usize {
        field(self.fields().len())
    }

    /// Byte offset of the named field within the record.
    pub fn field_offset(self, name: &str) -> Option<usize> {
        self.fields()
            .iter()
            .position(|f| f.name == name)
            .map(field)
    }

    /// Disassembler mnemonic.
    pub fn mnemonic(self) -> &'static str {
        use OpCode::*;

        match self {
            Stop => "STOP",
            Jump => "JUMP",
            IfTrueJump => "JUMP IF TRUE",
            IfFalseJump => "JUMP IF FALSE",
            IfEqualJump => "JUMP IF EQUAL",
            Return => "RETURN",
            Throw => "THROW",
            PropertySet => "PROP SET",
            PropertyInit => "PROP INIT",
            PropertyGet => "PROP GET",
            GlobalGet => "GLOBAL GET",
            PropertyForeach => "PROP FOREACH",
            PropertyNext => "PROP NEXT",
            FunctionCall => "FUNCTION CALL",
            FunctionCopy => "FUNCTION COPY",
            FunctionFrame => "FUNCTION FRAME",
            MethodFrame => "METHOD FRAME",
            MoveArg => "MOVE ARGUMENT",
            Arguments => "ARGUMENTS",
            Function => "FUNCTION",
            TryStart => "TRY START",
            TryBreak => "TRY BREAK",
            TryContinue => "TRY CONTINUE",
            TryEnd => "TRY END",
            TryReturn => "TRY RETURN",
            Catch => "CATCH",
            Finally => "FINALLY",
            Let => "LET",
            LetUpdate => "LET UPDATE",
            InitializationTest => "INIT TEST",
            AssignmentError => "ASSIGNMENT ERROR",
            NotInitialized => "NOT INIT",
            Error => "ERROR",
            Move => "MOVE",
            Addition => "ADD",
            Subtraction => "SUBTRACT",
            Multiplication => "MULTIPLY",
            Exponentiation => "EXPONENTIATION",
            Division => "DIVIDE",
            Remainder => "REMAINDER",
            LeftShift => "LEFT SHIFT",
            RightShift => "RIGHT SHIFT",
            UnsignedRightShift => "UNS RIGHT SHIFT",
            BitwiseAnd => "BITWISE AND",
            BitwiseOr => "BITWISE OR",
            BitwiseXor => "BITWISE XOR",
            Equal => "EQUAL",
            NotEqual => "NOT EQUAL",
            StrictEqual => "STRICT EQUAL",
            StrictNotEqual => "STRICT NOT EQUAL",
            Less => "LESS",
            LessOrEqual => "LESS OR EQUAL",
            Greater => "GREATER",
            GreaterOrEqual => "GREATER OR EQUAL",
            PropertyIn => "PROP IN",
            InstanceOf => "INSTANCE OF",
            PropertyDelete => "PROP DELETE",
            Increment => "INC",
            Decrement => "DEC",
            PostIncrement => "POST INC",
            PostDecrement => "POST DEC",
            TestIfTrue => "TEST IF TRUE",
            TestIfFalse => "TEST IF FALSE",
            Coalesce => "COALESCE",
            UnaryPlus => "PLUS",
            UnaryNegation => "NEGATION",
            BitwiseNot => "BITWISE NOT",
            LogicalNot => "LOGICAL NOT",
            Typeof => "TYPEOF",
            Void => "VOID",
            Delete => "DELETE",
            Object => "OBJECT",
            Array => "ARRAY",
        }
    }
}

/// Error raised by an ERROR record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorKind {
    /// `Error`
    Error = 0,
    /// `InternalError`
    Internal = 1,
    /// `RangeError`
    Range = 2,
    /// `ReferenceError`
    Reference = 3,
    /// `SyntaxError`
    Syntax = 4,
    /// `TypeError`
    Type = 5,
    /// `URIError`
    Uri = 6,
}

impl ErrorKind {
    /// Decodes a kind field.
    pub fn from_u32(value: u32) -> Option<ErrorKind> {
        Some(match value {
            0 => ErrorKind::Error,
            1 => ErrorKind::Internal,
            2 => ErrorKind::Range,
            3 => ErrorKind::Reference,
            4 => ErrorKind::Syntax,
            5 => ErrorKind::Type,
            6 => ErrorKind::Uri,
            _ => return None,
        })
    }

    /// Constructor name.
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Error => "Error",
            ErrorKind::Internal => "InternalError",
            ErrorKind::Range => "RangeError",
            ErrorKind::Reference => "ReferenceError",
            ErrorKind::Syntax => "SyntaxError",
            ErrorKind::Type => "TypeError",
            ErrorKind::Uri => "URIError",
        }
    }
}

/// A decoded record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// Byte offset of the record
    pub offset: usize,
    /// Operation
    pub opcode: OpCode,
    /// Raw field values in layout order
    pub operands: SmallVec<[u32; 4]>,
}

impl Instruction {
    /// Record size in bytes.
    pub fn size(&self) -> usize {
        self.opcode.size()
    }

    /// Raw value of the named field.
    pub fn get(&self, name: &str) -> Option<u32> {
        let pos = self.opcode.fields().iter().position(|f| f.name == name)?;
        self.operands.get(pos).copied()
    }

    /// Named field as a slot index.
    pub fn index(&self, name: &str) -> Option<Index> {
        self.get(name).map(Index::from_bits)
    }

    /// Absolute target of the named offset field.
    pub fn jump_target(&self, name: &str) -> Option<usize> {
        let rel = self.get(name)? as i32;
        let target = self.offset as i64 + i64::from(rel);
        usize::try_from(target).ok()
    }
}

/// Iterator over the records of a code unit.
pub struct Instructions<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Instructions<'a> {
    /// Starts decoding at the first record.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn malformed(&mut self) -> Error {
        let err = Error::internal(format!("malformed bytecode at offset {}", self.pos));
        self.pos = self.bytes.len();
        err
    }
}

impl Iterator for Instructions<'_> {
    type Item = Result<Instruction>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.bytes.len() {
            return None;
        }

        let Some(opcode) = OpCode::from_u8(self.bytes[self.pos]) else {
            return Some(Err(self.malformed()));
        };

        let size = opcode.size();
        let Some(record) = self.bytes.get(self.pos..self.pos + size) else {
            return Some(Err(self.malformed()));
        };

        if record[1] != 3 - opcode.nargs() {
            return Some(Err(self.malformed()));
        }

        let operands = record[HEADER_SIZE..]
            .chunks_exact(FIELD_SIZE)
            .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]]))
            .collect();

        let instruction = Instruction {
            offset: self.pos,
            opcode,
            operands,
        };
        self.pos += size;

        Some(Ok(instruction))
    }
}

/// Function declaration instantiated when its scope is entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Declaration {
    /// Slot of the declared variable
    pub index: Index,
    /// Lambda table position
    pub lambda: u32,
}

/// One generated code unit.
#[derive(Debug, Clone, Default)]
pub struct Code {
    /// Unit name
    pub name: String,
    /// Instruction records
    pub bytes: Vec<u8>,
    /// Offset to line map, when enabled
    pub lines: Option<LineMap>,
    /// Function declarations hoisted into this unit
    pub declarations: Vec<Declaration>,
}

impl Code {
    /// Decodes the records of this unit.
    pub fn instructions(&self) -> Instructions<'_> {
        Instructions::new(&self.bytes)
    }

    /// Source line of the record at `offset`.
    pub fn line(&self, offset: usize) -> Option<u32> {
        let offset = u32::try_from(offset).ok()?;
        self.lines.as_ref()?.lookup(offset)
    }
}

/// A compiled nested function.
#[derive(Debug, Clone, Default)]
pub struct Lambda {
    /// Function body
    pub code: Code,
    /// Declared parameter count
    pub nargs: u32,
    /// Frame size in slots
    pub nlocal: u32,
    /// Slots of the enclosing frame captured by this function
    pub closures: Vec<Index>,
}

/// Literal value in the constant pool.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    /// `undefined`
    Undefined,
    /// `null`
    Null,
    /// `true` / `false`
    Boolean(bool),
    /// Number literal
    Number(f64),
    /// String literal or property name
    String(JsString),
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Undefined => f.write_str("undefined"),
            Constant::Null => f.write_str("null"),
            Constant::Boolean(b) => write!(f, "{b}"),
            Constant::Number(n) if n.fract() == 0.0 && n.abs() < 1e21 => {
                write!(f, "{}", *n as i64)
            }
            Constant::Number(n) => write!(f, "{n}"),
            Constant::String(s) => write!(f, "{:?}", s.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ConstantKey {
    Undefined,
    Null,
    Boolean(bool),
    Number(u64),
    String(JsString),
}

impl From<&Constant> for ConstantKey {
    fn from(value: &Constant) -> Self {
        match value {
            Constant::Undefined => ConstantKey::Undefined,
            Constant::Null => ConstantKey::Null,
            Constant::Boolean(b) => ConstantKey::Boolean(*b),
            Constant::Number(n) => ConstantKey::Number(n.to_bits()),
            Constant::String(s) => ConstantKey::String(s.clone()),
        }
    }
}

/// Deduplicating constant pool. Slot 0 is `undefined`.
#[derive(Debug)]
pub struct ConstantPool {
    values: Vec<Constant>,
    lookup: FxHashMap<ConstantKey, u32>,
}

impl Default for ConstantPool {
    fn default() -> Self {
        let mut lookup = FxHashMap::default();
        lookup.insert(ConstantKey::Undefined, 0);

        Self {
            values: vec![Constant::Undefined],
            lookup,
        }
    }
}

impl ConstantPool {
    /// Creates a pool holding only `undefined`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the static index of `value`, adding it if new.
    pub fn add(&mut self, value: Constant) -> Result<Index> {
        let key = ConstantKey::from(&value);

        if let Some(&pos) = self.lookup.get(&key) {
            return Index::new(pos, Level::Static, VarClass::Const);
        }

        let pos = u32::try_from(self.values.len())
            .map_err(|_| Error::internal("too many values in scope"))?;
        let index = Index::new(pos, Level::Static, VarClass::Const)?;

        self.values.try_reserve(1)?;
        self.values.push(value);
        self.lookup.insert(key, pos);

        Ok(index)
    }

    /// Number of pooled values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if only `undefined` is pooled.
    pub fn is_empty(&self) -> bool {
        self.values.len() <= 1
    }

    /// Consumes the pool.
    pub fn into_vec(self) -> Vec<Constant> {
        self.values
    }
}

/// Output of the generator for one compile unit.
#[derive(Debug, Clone, Default)]
pub struct Bytecode {
    /// Top-level code
    pub main: Code,
    /// Nested functions, addressed by lambda position
    pub lambdas: Vec<Lambda>,
    /// Constant pool addressed by static indexes
    pub constants: Vec<Constant>,
}

impl Bytecode {
    /// Looks up a static index in the constant pool.
    pub fn constant(&self, index: Index) -> Option<&Constant> {
        if index.level() != Level::Static {
            return None;
        }

        self.constants.get(index.value() as usize)
    }

    /// All code units, top-level first.
    pub fn units(&self) -> impl Iterator<Item = &Code> {
        std::iter::once(&self.main).chain(self.lambdas.iter().map(|l| &l.code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_roundtrip() {
        for (i, &op) in OPCODES.iter().enumerate() {
            assert_eq!(op as usize, i);
            assert_eq!(OpCode::from_u8(i as u8), Some(op));
        }
        assert_eq!(OpCode::from_u8(OPCODES.len() as u8), None);
    }

    #[test]
    fn test_record_sizes() {
        assert_eq!(OpCode::Jump.size(), 8);
        assert_eq!(OpCode::Move.size(), 12);
        assert_eq!(OpCode::Addition.size(), 16);
        assert_eq!(OpCode::Finally.size(), 20);
        assert_eq!(OpCode::MethodFrame.size(), 20);
    }

    #[test]
    fn test_field_offsets() {
        assert_eq!(OpCode::Jump.field_offset("offset"), Some(4));
        assert_eq!(OpCode::Finally.field_offset("continue_offset"), Some(12));
        assert_eq!(OpCode::Finally.field_offset("break_offset"), Some(16));
        assert_eq!(OpCode::TryReturn.field_offset("offset"), Some(12));
        assert_eq!(OpCode::Move.field_offset("offset"), None);
    }

    #[test]
    fn test_decode_records() {
        let mut bytes = vec![OpCode::Jump as u8, 3, 0, 0];
        bytes.extend_from_slice(&8i32.to_le_bytes());
        bytes.extend_from_slice(&[OpCode::Stop as u8, 2, 0, 0]);
        bytes.extend_from_slice(&Index::UNDEFINED.bits().to_le_bytes());

        let decoded: Vec<_> = Instructions::new(&bytes).collect::<Result<_>>().unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].jump_target("offset"), Some(8));
        assert_eq!(decoded[1].opcode, OpCode::Stop);
        assert_eq!(decoded[1].index("retval"), Some(Index::UNDEFINED));
    }

    #[test]
    fn test_decode_malformed() {
        let bytes = [OpCode::Move as u8, 1, 0, 0, 1];
        let mut it = Instructions::new(&bytes);
        assert!(matches!(it.next(), Some(Err(Error::Internal(_)))));
        assert!(it.next().is_none());

        assert!(Instructions::new(&[0xFF, 0, 0, 0]).next().unwrap().is_err());
    }

    #[test]
    fn test_constant_pool_dedup() {
        let mut pool = ConstantPool::new();
        assert_eq!(pool.add(Constant::Undefined).unwrap(), Index::UNDEFINED);

        let a = pool.add(Constant::Number(1.0)).unwrap();
        let b = pool.add(Constant::String(JsString::text("x").unwrap())).unwrap();
        assert_eq!(pool.add(Constant::Number(1.0)).unwrap(), a);
        assert_eq!(pool.add(Constant::String(JsString::text("x").unwrap())).unwrap(), b);
        assert_ne!(pool.add(Constant::Number(-0.0)).unwrap(), pool.add(Constant::Number(0.0)).unwrap());
        assert_eq!(a.level(), Level::Static);
        assert_eq!(pool.len(), 5);
    }

    #[test]
    fn test_constant_display() {
        assert_eq!(Constant::Number(3.0).to_string(), "3");
        assert_eq!(Constant::Number(0.5).to_string(), "0.5");
        assert_eq!(Constant::String(JsString::text("a").unwrap()).to_string(), "\"a\"");
        assert_eq!(Constant::Null.to_string(), "null");
    }
}
