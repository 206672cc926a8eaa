use crate::bytecode::{
    AssignMode, BinaryOp, Command, DestKind, Destination, GotoMode,
    NamedOperand, Opcode, Operand, UnaryOp,
};
use crate::{KodResult, Message, MessageId, ParmId, Value};

/// A forward goto whose target has not yet been resolved.
///
/// Created by [`MessageBuilder::emit_goto`] and friends. Resolve it with
/// [`MessageBuilder::bind`].
#[derive(Debug)]
#[must_use]
pub struct Label {
    /// Position of the u32 target in the code buffer.
    offset_pos: usize,
}

/// Assembles a message body.
///
/// Code offsets handed out by the builder are relative to the first
/// instruction. Goto targets are rebased onto the full body, header included,
/// when the body is finished, so parameters may be declared at any time.
#[derive(Debug, Default)]
pub struct MessageBuilder {
    num_locals: u8,
    parameters: Vec<(ParmId, u32)>,
    code: Vec<u8>,
    /// Positions of goto targets that still need the header length added.
    branches: Vec<usize>,
}

impl MessageBuilder {
    pub fn new(num_locals: u8) -> Self {
        Self {
            num_locals,
            ..Self::default()
        }
    }

    /// Declares a parameter. Parameters take the locals before the plain
    /// ones, in declaration order. Returns the parameter's local index.
    ///
    /// # Panics
    ///
    /// When `default` does not fit in a packed constant.
    pub fn parameter(&mut self, id: ParmId, default: Value) -> u32 {
        let packed = default
            .to_constant()
            .expect("parameter default must fit in a packed constant");
        self.parameters.push((id, packed));
        (self.parameters.len() - 1) as u32
    }

    /// Local index of the `n`th plain local.
    pub fn local(&self, n: u32) -> u32 {
        self.parameters.len() as u32 + n
    }

    /// Current offset in the code, relative to the first instruction.
    pub fn current_offset(&self) -> usize {
        self.code.len()
    }

    fn header_len(&self) -> usize {
        2 + self.parameters.len() * 8
    }

    pub fn into_bytes(self) -> Vec<u8> {
        let header_len = self.header_len();
        let mut out = Vec::with_capacity(header_len + self.code.len());
        out.push(self.num_locals);
        out.push(self.parameters.len() as u8);
        for (id, default) in &self.parameters {
            out.extend_from_slice(&id.0.to_le_bytes());
            out.extend_from_slice(&default.to_le_bytes());
        }
        let mut code = self.code;
        for pos in self.branches {
            let mut raw = [0; 4];
            raw.copy_from_slice(&code[pos..pos + 4]);
            let target = u32::from_le_bytes(raw) + header_len as u32;
            code[pos..pos + 4].copy_from_slice(&target.to_le_bytes());
        }
        out.extend_from_slice(&code);
        out
    }

    pub fn build(self, id: MessageId, name: impl Into<String>) -> KodResult<Message> {
        Message::new(id, name, self.into_bytes())
    }

    // ── emit helpers ───────────────────────────────────────────────

    pub fn emit_u8(&mut self, v: u8) {
        self.code.push(v);
    }

    pub fn emit_u32(&mut self, v: u32) {
        self.code.extend_from_slice(&v.to_le_bytes());
    }

    fn emit_opcode(&mut self, command: Command, dest: u8, source1: u8, source2: u8) {
        self.emit_u8(Opcode::new(command, dest, source1, source2).encode());
    }

    fn emit_parameter(&mut self, operand: Operand) {
        self.emit_u8(operand.kind as u8);
        self.emit_u32(operand.data);
    }

    // ── instructions ───────────────────────────────────────────────

    pub fn emit_unary(&mut self, op: UnaryOp, dest: Destination, source: Operand) {
        self.emit_opcode(Command::UnaryAssign, dest.kind as u8, source.kind as u8, 0);
        self.emit_u8(op as u8);
        self.emit_u32(dest.index);
        self.emit_u32(source.data);
    }

    /// `dest := value`
    pub fn emit_move(&mut self, dest: Destination, source: Operand) {
        self.emit_unary(UnaryOp::None, dest, source);
    }

    /// `dest := constant`
    ///
    /// # Panics
    ///
    /// When `value` does not fit in a packed constant.
    pub fn emit_load_constant(&mut self, dest: Destination, value: Value) {
        let packed = value
            .to_constant()
            .expect("value must fit in a packed constant");
        self.emit_move(dest, Operand::constant(packed));
    }

    pub fn emit_binary(
        &mut self,
        op: BinaryOp,
        dest: Destination,
        left: Operand,
        right: Operand,
    ) {
        self.emit_opcode(
            Command::BinaryAssign,
            dest.kind as u8,
            left.kind as u8,
            right.kind as u8,
        );
        self.emit_u8(op as u8);
        self.emit_u32(dest.index);
        self.emit_u32(left.data);
        self.emit_u32(right.data);
    }

    fn emit_goto_raw(&mut self, mode: GotoMode, target: u32, condition: Option<Operand>) -> usize {
        let kind = condition.map_or(0, |c| c.kind as u8);
        self.emit_opcode(Command::Goto, 0, mode as u8, kind);
        let pos = self.code.len();
        self.emit_u32(target);
        self.branches.push(pos);
        if let Some(condition) = condition {
            self.emit_u32(condition.data);
        }
        pos
    }

    pub fn emit_goto(&mut self) -> Label {
        let offset_pos = self.emit_goto_raw(GotoMode::Always, 0, None);
        Label { offset_pos }
    }

    pub fn emit_goto_if_true(&mut self, condition: Operand) -> Label {
        let offset_pos = self.emit_goto_raw(GotoMode::IfTrue, 0, Some(condition));
        Label { offset_pos }
    }

    pub fn emit_goto_if_false(&mut self, condition: Operand) -> Label {
        let offset_pos = self.emit_goto_raw(GotoMode::IfFalse, 0, Some(condition));
        Label { offset_pos }
    }

    /// Unconditional goto to an earlier code offset.
    pub fn emit_goto_back(&mut self, target: usize) {
        self.emit_goto_raw(GotoMode::Always, target as u32, None);
    }

    /// Resolves a forward goto to the current position.
    pub fn bind(&mut self, label: Label) {
        let target = self.current_offset() as u32;
        self.code[label.offset_pos..label.offset_pos + 4]
            .copy_from_slice(&target.to_le_bytes());
    }

    pub fn emit_call(
        &mut self,
        native: u8,
        assign: Option<Destination>,
        positional: &[Operand],
        named: &[NamedOperand],
    ) {
        let mode = match assign.map(|d| d.kind) {
            None => AssignMode::Discard,
            Some(DestKind::Local) => AssignMode::AssignLocal,
            Some(DestKind::Property) => AssignMode::AssignProperty,
        };
        self.emit_opcode(Command::Call, 0, mode as u8, 0);
        self.emit_u8(native);
        if let Some(dest) = assign {
            self.emit_u32(dest.index);
        }
        self.emit_u8(positional.len() as u8);
        for operand in positional {
            self.emit_parameter(*operand);
        }
        self.emit_u8(named.len() as u8);
        for named in named {
            self.emit_u32(named.name);
            self.emit_parameter(named.operand);
        }
    }

    pub fn emit_return(&mut self, value: Operand) {
        self.emit_opcode(Command::Return, 1, value.kind as u8, 0);
        self.emit_u32(value.data);
    }

    /// # Panics
    ///
    /// When `value` does not fit in a packed constant.
    pub fn emit_return_constant(&mut self, value: Value) {
        let packed = value
            .to_constant()
            .expect("value must fit in a packed constant");
        self.emit_return(Operand::constant(packed));
    }

    pub fn emit_return_propagate(&mut self) {
        self.emit_opcode(Command::Return, 0, 0, 0);
    }

    pub fn emit_debug_line(&mut self, line: u32) {
        self.emit_opcode(Command::DebugLine, 0, 0, 0);
        self.emit_u32(line);
    }
}

/// Shorthand for a constant operand. Panics when `value` does not pack.
pub fn constant(value: Value) -> Operand {
    Operand::constant(
        value
            .to_constant()
            .expect("value must fit in a packed constant"),
    )
}
