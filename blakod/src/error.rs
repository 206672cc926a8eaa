use crate::{ClassId, MessageId, ObjectId, Tag};

/// Errors raised while running Blakod code.
///
/// None of these are fatal to the host. Each one ends the send that raised
/// it; only [`KodError::StatementBudgetExceeded`] unwinds the whole chain.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KodError {
    // ── malformed bytecode ─────────────────────────────────────────
    #[error("read of {needed} bytes at offset {offset} runs past end of code ({len} bytes)")]
    BytecodeOverrun {
        offset: usize,
        needed: usize,
        len: usize,
    },

    #[error("unknown command {command} in opcode at offset {offset}")]
    UnknownCommand { command: u8, offset: usize },

    #[error("unknown unary operator {0}")]
    UnknownUnaryOp(u8),

    #[error("unknown binary operator {0}")]
    UnknownBinaryOp(u8),

    #[error("invalid operand kind {0}")]
    InvalidOperandKind(u8),

    #[error("invalid call assignment mode {0}")]
    InvalidAssignMode(u8),

    #[error("invalid goto mode {0}")]
    InvalidGotoMode(u8),

    #[error("branch to offset {target} outside of code ({len} bytes)")]
    BranchOutOfRange { target: u32, len: usize },

    #[error("local {index} out of range ({count} in frame)")]
    LocalOutOfRange { index: u32, count: usize },

    #[error("message needs {requested} locals, limit is {max}")]
    TooManyLocals { requested: usize, max: usize },

    #[error("property {index} out of range ({count} on object)")]
    PropertyOutOfRange { index: u32, count: usize },

    #[error("class variable {index} out of range ({count} on class)")]
    ClassVarOutOfRange { index: u32, count: usize },

    #[error("constant operand is not a storage location")]
    ConstantNotStorable,

    #[error("message code ended without a return")]
    MissingReturn,

    // ── resource limits ────────────────────────────────────────────
    #[error("{count} positional parameters, limit is {max}")]
    TooManyPositionalParms { count: usize, max: usize },

    #[error("{count} named parameters, limit is {max}")]
    TooManyNamedParms { count: usize, max: usize },

    #[error("message call depth of {depth} reached")]
    RecursionLimit { depth: usize },

    #[error("statement budget of {budget} exceeded")]
    StatementBudgetExceeded { budget: u64 },

    // ── lookup ─────────────────────────────────────────────────────
    #[error("object {0} does not exist")]
    UnknownObject(ObjectId),

    #[error("class {0} does not exist")]
    UnknownClass(ClassId),

    #[error("class {class} has no handler for message {message}")]
    UnknownMessage { class: ClassId, message: MessageId },

    #[error("native function {0} is not registered")]
    UnknownNative(u8),

    // ── types ──────────────────────────────────────────────────────
    #[error("{operation} expects INT operands, got {left} and {right}")]
    TagMismatch {
        operation: &'static str,
        left: Tag,
        right: Tag,
    },

    #[error("division by zero")]
    DivisionByZero,

    // ── natives ────────────────────────────────────────────────────
    #[error("native {name}: {reason}")]
    Native { name: &'static str, reason: String },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorClass {
    MalformedBytecode,
    ResourceLimit,
    Lookup,
    Type,
    Native,
}

impl KodError {
    pub fn class(&self) -> ErrorClass {
        use KodError::*;
        match self {
            BytecodeOverrun { .. }
            | UnknownCommand { .. }
            | UnknownUnaryOp(_)
            | UnknownBinaryOp(_)
            | InvalidOperandKind(_)
            | InvalidAssignMode(_)
            | InvalidGotoMode(_)
            | BranchOutOfRange { .. }
            | LocalOutOfRange { .. }
            | TooManyLocals { .. }
            | PropertyOutOfRange { .. }
            | ClassVarOutOfRange { .. }
            | ConstantNotStorable
            | MissingReturn => ErrorClass::MalformedBytecode,
            TooManyPositionalParms { .. }
            | TooManyNamedParms { .. }
            | RecursionLimit { .. }
            | StatementBudgetExceeded { .. } => ErrorClass::ResourceLimit,
            UnknownObject(_)
            | UnknownClass(_)
            | UnknownMessage { .. }
            | UnknownNative(_) => ErrorClass::Lookup,
            TagMismatch { .. } | DivisionByZero => ErrorClass::Type,
            Native { .. } => ErrorClass::Native,
        }
    }

    /// Whether the error ends the whole top-level invocation instead of only
    /// the send that raised it.
    pub fn aborts_chain(&self) -> bool {
        matches!(self, KodError::StatementBudgetExceeded { .. })
    }
}

pub type KodResult<T> = Result<T, KodError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("post queue is full ({capacity} pending)")]
pub struct PostQueueFull {
    pub capacity: usize,
}
