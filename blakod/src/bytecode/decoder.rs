use crate::bytecode::{
    AssignMode, BinaryOp, CodeReader, Command, Destination, GotoMode,
    Instruction, NamedOperand, Opcode, Operand, OperandKind, ReturnMode,
    UnaryOp,
};
use crate::{KodError, KodResult, MAX_C_PARMS, MAX_NAME_PARMS, Message};

/// Decodes a message body into [`Instruction`]s.
///
/// Yields `(offset, instruction)` pairs. Malformed input produces one `Err`
/// and ends the iteration.
pub struct BytecodeDecoder<'a> {
    reader: CodeReader<'a>,
    failed: bool,
}

impl<'a> BytecodeDecoder<'a> {
    /// Starts decoding `bytes` at `start`.
    pub fn new(bytes: &'a [u8], start: usize) -> Self {
        Self {
            reader: CodeReader::at(bytes, start),
            failed: false,
        }
    }

    pub fn for_message(message: &'a Message) -> Self {
        Self::new(message.body(), message.code_start())
    }

    #[inline(always)]
    pub fn offset(&self) -> usize {
        self.reader.offset()
    }

    pub fn decode_next(&mut self) -> Option<KodResult<(usize, Instruction)>> {
        if self.failed || self.reader.is_at_end() {
            return None;
        }
        let offset = self.reader.offset();
        let result = decode_instruction(&mut self.reader);
        self.failed = result.is_err();
        Some(result.map(|instr| (offset, instr)))
    }
}

impl Iterator for BytecodeDecoder<'_> {
    type Item = KodResult<(usize, Instruction)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.decode_next()
    }
}

/// Decodes one instruction at the reader's position.
pub fn decode_instruction(reader: &mut CodeReader<'_>) -> KodResult<Instruction> {
    let offset = reader.offset();
    let opcode = Opcode::decode(reader.read_u8()?);
    let command = opcode
        .command()
        .map_err(|command| KodError::UnknownCommand { command, offset })?;

    match command {
        Command::UnaryAssign => {
            let op = UnaryOp::try_from(reader.read_u8()?)?;
            let dest = read_dest(reader, opcode)?;
            let source = read_operand(reader, opcode.source1_kind())?;
            Ok(Instruction::Unary { op, dest, source })
        }
        Command::BinaryAssign => {
            let op = BinaryOp::try_from(reader.read_u8()?)?;
            let dest = read_dest(reader, opcode)?;
            let left = read_operand(reader, opcode.source1_kind())?;
            let right = read_operand(reader, opcode.source2_kind())?;
            Ok(Instruction::Binary {
                op,
                dest,
                left,
                right,
            })
        }
        Command::Goto => {
            let mode = GotoMode::try_from(opcode.source1)?;
            let target = reader.read_u32()?;
            let condition = match mode {
                GotoMode::Always => None,
                GotoMode::IfTrue | GotoMode::IfFalse => {
                    Some(read_operand(reader, opcode.source2_kind())?)
                }
            };
            Ok(Instruction::Goto {
                mode,
                target,
                condition,
            })
        }
        Command::Call => {
            let native = reader.read_u8()?;
            let assign = match AssignMode::try_from(opcode.source1)?.dest_kind() {
                Some(kind) => Some(Destination {
                    kind,
                    index: reader.read_u32()?,
                }),
                None => None,
            };

            let count = reader.read_u8()? as usize;
            if count > MAX_C_PARMS {
                return Err(KodError::TooManyPositionalParms {
                    count,
                    max: MAX_C_PARMS,
                });
            }
            let mut positional = Vec::with_capacity(count);
            for _ in 0..count {
                positional.push(read_parameter(reader)?);
            }

            let count = reader.read_u8()? as usize;
            if count > MAX_NAME_PARMS {
                return Err(KodError::TooManyNamedParms {
                    count,
                    max: MAX_NAME_PARMS,
                });
            }
            let mut named = Vec::with_capacity(count);
            for _ in 0..count {
                let name = reader.read_u32()?;
                let operand = read_parameter(reader)?;
                named.push(NamedOperand { name, operand });
            }

            Ok(Instruction::Call {
                native,
                assign,
                positional,
                named,
            })
        }
        Command::Return => match opcode.return_mode() {
            ReturnMode::Propagate => Ok(Instruction::ReturnPropagate),
            ReturnMode::NoPropagate => Ok(Instruction::Return {
                value: read_operand(reader, opcode.source1_kind())?,
            }),
        },
        Command::DebugLine => Ok(Instruction::DebugLine {
            line: reader.read_u32()?,
        }),
    }
}

#[inline(always)]
fn read_operand(reader: &mut CodeReader<'_>, kind: OperandKind) -> KodResult<Operand> {
    Ok(Operand {
        kind,
        data: reader.read_u32()?,
    })
}

#[inline(always)]
fn read_dest(reader: &mut CodeReader<'_>, opcode: Opcode) -> KodResult<Destination> {
    Ok(Destination {
        kind: opcode.dest_kind(),
        index: reader.read_u32()?,
    })
}

/// A call parameter: kind byte then data.
#[inline(always)]
pub(crate) fn read_parameter(reader: &mut CodeReader<'_>) -> KodResult<Operand> {
    let kind = OperandKind::try_from(reader.read_u8()?)?;
    read_operand(reader, kind)
}
