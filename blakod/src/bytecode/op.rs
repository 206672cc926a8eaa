use crate::KodError;

/// Top three bits of an opcode word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    /// `dest := op source`
    /// Operands: `op:u8`, `dest:u32`, `source:u32`
    UnaryAssign = 0,

    /// `dest := left op right`
    /// Operands: `op:u8`, `dest:u32`, `left:u32`, `right:u32`
    BinaryAssign = 1,

    /// Operands: `target:u32`, then `cond:u32` when conditional
    Goto = 2,

    /// Native call, see [`Interpreter::interpret_call`](crate::Interpreter::interpret_call).
    Call = 3,

    /// Operands: none for propagate, `value:u32` otherwise
    Return = 4,

    /// Operands: `line:u32`
    DebugLine = 5,
}

impl Command {
    pub const COUNT: usize = 6;
}

impl TryFrom<u8> for Command {
    type Error = u8;

    #[inline(always)]
    fn try_from(value: u8) -> Result<Self, u8> {
        Ok(match value {
            0 => Command::UnaryAssign,
            1 => Command::BinaryAssign,
            2 => Command::Goto,
            3 => Command::Call,
            4 => Command::Return,
            5 => Command::DebugLine,
            _ => return Err(value),
        })
    }
}

/// Where a source operand lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OperandKind {
    Local = 0,
    Property = 1,
    /// The operand data is a packed constant.
    Constant = 2,
    ClassVar = 3,
}

impl OperandKind {
    /// Two bit fields can hold every kind.
    #[inline(always)]
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => OperandKind::Local,
            1 => OperandKind::Property,
            2 => OperandKind::Constant,
            _ => OperandKind::ClassVar,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            OperandKind::Local => "local",
            OperandKind::Property => "property",
            OperandKind::Constant => "constant",
            OperandKind::ClassVar => "classvar",
        }
    }
}

/// Kind byte of a call parameter. Unlike the packed fields this is a full
/// byte, so anything past [`OperandKind::ClassVar`] is rejected.
impl TryFrom<u8> for OperandKind {
    type Error = KodError;

    fn try_from(value: u8) -> Result<Self, KodError> {
        match value {
            0..=3 => Ok(Self::from_bits(value)),
            _ => Err(KodError::InvalidOperandKind(value)),
        }
    }
}

/// Where an assignment lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DestKind {
    Local = 0,
    Property = 1,
}

impl DestKind {
    #[inline(always)]
    pub const fn from_bit(bit: u8) -> Self {
        match bit & 1 {
            0 => DestKind::Local,
            _ => DestKind::Property,
        }
    }

    pub const fn operand_kind(self) -> OperandKind {
        match self {
            DestKind::Local => OperandKind::Local,
            DestKind::Property => OperandKind::Property,
        }
    }
}

/// What a call does with the native's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AssignMode {
    Discard = 0,
    AssignLocal = 1,
    AssignProperty = 2,
}

impl AssignMode {
    pub const fn dest_kind(self) -> Option<DestKind> {
        match self {
            AssignMode::Discard => None,
            AssignMode::AssignLocal => Some(DestKind::Local),
            AssignMode::AssignProperty => Some(DestKind::Property),
        }
    }
}

impl TryFrom<u8> for AssignMode {
    type Error = KodError;

    fn try_from(value: u8) -> Result<Self, KodError> {
        match value {
            0 => Ok(AssignMode::Discard),
            1 => Ok(AssignMode::AssignLocal),
            2 => Ok(AssignMode::AssignProperty),
            _ => Err(KodError::InvalidAssignMode(value)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GotoMode {
    Always = 0,
    IfTrue = 1,
    IfFalse = 2,
}

impl TryFrom<u8> for GotoMode {
    type Error = KodError;

    fn try_from(value: u8) -> Result<Self, KodError> {
        match value {
            0 => Ok(GotoMode::Always),
            1 => Ok(GotoMode::IfTrue),
            2 => Ok(GotoMode::IfFalse),
            _ => Err(KodError::InvalidGotoMode(value)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ReturnMode {
    /// Hand the message to the superclass handler.
    Propagate = 0,
    NoPropagate = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum UnaryOp {
    Not = 0,
    Negate = 1,
    /// Plain copy
    None = 2,
    BitwiseNot = 3,
}

impl UnaryOp {
    pub const fn name(self) -> &'static str {
        match self {
            UnaryOp::Not => "not",
            UnaryOp::Negate => "neg",
            UnaryOp::None => "mov",
            UnaryOp::BitwiseNot => "bnot",
        }
    }
}

impl TryFrom<u8> for UnaryOp {
    type Error = KodError;

    fn try_from(value: u8) -> Result<Self, KodError> {
        Ok(match value {
            0 => UnaryOp::Not,
            1 => UnaryOp::Negate,
            2 => UnaryOp::None,
            3 => UnaryOp::BitwiseNot,
            _ => return Err(KodError::UnknownUnaryOp(value)),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BinaryOp {
    Add = 0,
    Subtract,
    Multiply,
    Div,
    Mod,
    And,
    Or,
    Equal,
    NotEqual,
    LessThan,
    GreaterThan,
    LessEqual,
    GreaterEqual,
    BitwiseAnd,
    BitwiseOr,
}

impl BinaryOp {
    pub const COUNT: usize = 15;

    pub const fn name(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Subtract => "sub",
            BinaryOp::Multiply => "mul",
            BinaryOp::Div => "div",
            BinaryOp::Mod => "mod",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Equal => "eq",
            BinaryOp::NotEqual => "ne",
            BinaryOp::LessThan => "lt",
            BinaryOp::GreaterThan => "gt",
            BinaryOp::LessEqual => "le",
            BinaryOp::GreaterEqual => "ge",
            BinaryOp::BitwiseAnd => "band",
            BinaryOp::BitwiseOr => "bor",
        }
    }
}

impl TryFrom<u8> for BinaryOp {
    type Error = KodError;

    fn try_from(value: u8) -> Result<Self, KodError> {
        Ok(match value {
            0 => BinaryOp::Add,
            1 => BinaryOp::Subtract,
            2 => BinaryOp::Multiply,
            3 => BinaryOp::Div,
            4 => BinaryOp::Mod,
            5 => BinaryOp::And,
            6 => BinaryOp::Or,
            7 => BinaryOp::Equal,
            8 => BinaryOp::NotEqual,
            9 => BinaryOp::LessThan,
            10 => BinaryOp::GreaterThan,
            11 => BinaryOp::LessEqual,
            12 => BinaryOp::GreaterEqual,
            13 => BinaryOp::BitwiseAnd,
            14 => BinaryOp::BitwiseOr,
            _ => return Err(KodError::UnknownBinaryOp(value)),
        })
    }
}

/// The packed opcode word.
///
/// ```text
///   7 6 5   4     3 2       1 0
///  command  dest  source1   source2
/// ```
///
/// The meaning of the three low fields depends on the command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode {
    pub command: u8,
    pub dest: u8,
    pub source1: u8,
    pub source2: u8,
}

impl Opcode {
    #[inline(always)]
    pub const fn decode(byte: u8) -> Self {
        Self {
            source2: byte & 0b11,
            source1: (byte >> 2) & 0b11,
            dest: (byte >> 4) & 0b1,
            command: byte >> 5,
        }
    }

    #[inline(always)]
    pub const fn encode(self) -> u8 {
        ((self.command & 0b111) << 5)
            | ((self.dest & 0b1) << 4)
            | ((self.source1 & 0b11) << 2)
            | (self.source2 & 0b11)
    }

    pub const fn new(command: Command, dest: u8, source1: u8, source2: u8) -> Self {
        Self {
            command: command as u8,
            dest,
            source1,
            source2,
        }
    }

    #[inline(always)]
    pub fn command(self) -> Result<Command, u8> {
        Command::try_from(self.command)
    }

    #[inline(always)]
    pub const fn dest_kind(self) -> DestKind {
        DestKind::from_bit(self.dest)
    }

    #[inline(always)]
    pub const fn source1_kind(self) -> OperandKind {
        OperandKind::from_bits(self.source1)
    }

    #[inline(always)]
    pub const fn source2_kind(self) -> OperandKind {
        OperandKind::from_bits(self.source2)
    }

    #[inline(always)]
    pub const fn return_mode(self) -> ReturnMode {
        match self.dest & 1 {
            0 => ReturnMode::Propagate,
            _ => ReturnMode::NoPropagate,
        }
    }
}
