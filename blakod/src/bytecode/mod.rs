//! Message bytecode: the packed opcode word, a bounds-checked reader, and an
//! assembler/disassembler pair.
mod builder;
mod decoder;
mod instruction;
mod op;
mod reader;

pub use builder::{Label, MessageBuilder, constant};
pub use decoder::{BytecodeDecoder, decode_instruction};
pub(crate) use decoder::read_parameter;
pub use instruction::{Destination, Instruction, NamedOperand, Operand};
pub use op::{
    AssignMode, BinaryOp, Command, DestKind, GotoMode, Opcode, OperandKind,
    ReturnMode, UnaryOp,
};
pub use reader::CodeReader;
