use crate::bytecode::{
    BinaryOp, CodeReader, Command, GotoMode, Opcode, OperandKind, ReturnMode,
    UnaryOp,
};
use crate::lookup::{self, ObjectMut, ObjectRef};
use crate::{
    Activation, ClassStore, Clock, ErrorClass, KodConfig, KodError, KodResult,
    KodStats, LocalFrame, Message, NativeTable, ObjectId, ObjectStore,
    PostQueue, PostQueueFull, PostedMessage, Tag, Value, channel, format,
};

/// How a message body finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Return {
    /// Stop here with a result.
    Value(Value),
    /// Continue with the superclass handler.
    Propagate,
}

/// State of one top-level invocation, nested sends included.
///
/// Built by [`Kod`](crate::Kod) for each top-level send and dropped when it
/// completes.
pub struct Interpreter<'k> {
    objects: &'k mut dyn ObjectStore,
    classes: &'k dyn ClassStore,
    pub(crate) natives: &'k NativeTable,
    config: &'k KodConfig,
    pub(crate) stats: &'k mut KodStats,
    posts: &'k mut PostQueue,
    pub(crate) clock: &'k dyn Clock,
    pub(crate) stack: Vec<Activation>,
    statements: u64,
    pub(crate) native_calls: u64,
    /// Error currently unwinding, already reported.
    pub(crate) unwinding: Option<KodError>,
}

impl<'k> Interpreter<'k> {
    pub fn new(
        objects: &'k mut dyn ObjectStore,
        classes: &'k dyn ClassStore,
        natives: &'k NativeTable,
        config: &'k KodConfig,
        stats: &'k mut KodStats,
        posts: &'k mut PostQueue,
        clock: &'k dyn Clock,
    ) -> Self {
        Self {
            objects,
            classes,
            natives,
            config,
            stats,
            posts,
            clock,
            stack: Vec::new(),
            statements: 0,
            native_calls: 0,
            unwinding: None,
        }
    }

    #[inline]
    pub fn objects(&self) -> &dyn ObjectStore {
        &*self.objects
    }

    #[inline]
    pub fn objects_mut(&mut self) -> &mut dyn ObjectStore {
        &mut *self.objects
    }

    #[inline]
    pub fn classes(&self) -> &dyn ClassStore {
        self.classes
    }

    #[inline]
    pub fn config(&self) -> &KodConfig {
        self.config
    }

    #[inline]
    pub fn stats(&self) -> &KodStats {
        &*self.stats
    }

    /// Active messages, outermost first.
    #[inline]
    pub fn stack(&self) -> &[Activation] {
        &self.stack
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Opcodes executed so far in this invocation.
    #[inline]
    pub fn statements(&self) -> u64 {
        self.statements
    }

    #[inline]
    pub fn native_calls(&self) -> u64 {
        self.native_calls
    }

    pub fn post(&mut self, post: PostedMessage) -> Result<(), PostQueueFull> {
        self.posts.push(post)
    }

    /// `[Class Message (line N)]` for the running message.
    pub fn debug_info(&self) -> String {
        match self.stack.last() {
            Some(activation) => format::debug_info(self.classes, activation),
            None => String::from("[top level]"),
        }
    }

    pub fn stack_info(&self) -> String {
        format::stack_info(self.classes, &self.stack)
    }

    /// Logs `err` once per unwinding error. Interpreter faults go to the
    /// error channel, script mistakes to bad kod. Resource limit failures
    /// are flushed before returning.
    pub(crate) fn report(&mut self, err: &KodError) {
        if self.unwinding.as_ref() == Some(err) {
            return;
        }
        let target = match err.class() {
            ErrorClass::MalformedBytecode | ErrorClass::ResourceLimit => channel::ERROR,
            _ => channel::BAD_KOD,
        };
        log::error!(
            target: target,
            "{} {err}; stack: {}",
            self.debug_info(),
            self.stack_info()
        );
        if err.class() == ErrorClass::ResourceLimit {
            log::logger().flush();
        }
        self.unwinding = Some(err.clone());
    }

    /// Reports `err` and hands it back for returning.
    pub(crate) fn fail(&mut self, err: KodError) -> KodError {
        self.report(&err);
        err
    }

    // ── operands ───────────────────────────────────────────────────

    #[inline]
    pub fn retrieve(
        &self,
        object: ObjectId,
        frame: &LocalFrame,
        kind: OperandKind,
        data: u32,
    ) -> KodResult<Value> {
        let value = lookup::retrieve(
            ObjectRef::Lookup(&*self.objects, object),
            self.classes,
            frame,
            kind,
            data,
        )?;
        if kind == OperandKind::Local && frame.is_unwritten(data) {
            log::warn!(
                target: channel::BAD_KOD,
                "{} read of uninitialized local {data}",
                self.debug_info()
            );
        }
        Ok(value)
    }

    #[inline]
    pub fn store(
        &mut self,
        object: ObjectId,
        frame: &mut LocalFrame,
        kind: OperandKind,
        data: u32,
        value: Value,
    ) -> KodResult<()> {
        lookup::store(
            ObjectMut::Lookup(&mut *self.objects, object),
            self.classes,
            frame,
            kind,
            data,
            value,
        )
    }

    // ── loop ───────────────────────────────────────────────────────

    #[inline(always)]
    fn count_statement(&mut self) -> KodResult<()> {
        self.statements += 1;
        if self.statements > self.config.max_statements {
            return Err(KodError::StatementBudgetExceeded {
                budget: self.config.max_statements,
            });
        }
        Ok(())
    }

    /// Runs `message` on `object` with `frame` until it returns. Errors are
    /// reported while the message is still on the stack.
    pub fn interpret(
        &mut self,
        object: ObjectId,
        message: &Message,
        frame: &mut LocalFrame,
    ) -> KodResult<Return> {
        let result = self.run(object, message, frame);
        if let Err(err) = &result {
            self.report(err);
        }
        result
    }

    fn run(
        &mut self,
        object: ObjectId,
        message: &Message,
        frame: &mut LocalFrame,
    ) -> KodResult<Return> {
        let mut reader = CodeReader::at(message.body(), message.code_start());
        loop {
            if reader.is_at_end() {
                return Err(KodError::MissingReturn);
            }
            self.count_statement()?;
            let offset = reader.offset();
            let opcode = Opcode::decode(reader.read_u8()?);
            let command = opcode
                .command()
                .map_err(|command| KodError::UnknownCommand { command, offset })?;

            if self.config.trace_opcodes {
                log::trace!(
                    target: channel::TRACE,
                    "{} @{offset} {command:?} {opcode:?}",
                    self.debug_info()
                );
            }

            match command {
                Command::UnaryAssign => {
                    self.interpret_unary(object, frame, &mut reader, opcode)?
                }
                Command::BinaryAssign => {
                    self.interpret_binary(object, frame, &mut reader, opcode)?
                }
                Command::Goto => {
                    self.interpret_goto(object, frame, &mut reader, opcode, message)?
                }
                Command::Call => {
                    self.interpret_call(object, frame, &mut reader, opcode)?
                }
                Command::Return => {
                    return match opcode.return_mode() {
                        ReturnMode::Propagate => Ok(Return::Propagate),
                        ReturnMode::NoPropagate => {
                            let data = reader.read_u32()?;
                            let value =
                                self.retrieve(object, frame, opcode.source1_kind(), data)?;
                            Ok(Return::Value(value))
                        }
                    };
                }
                Command::DebugLine => {
                    let line = reader.read_u32()?;
                    if let Some(activation) = self.stack.last_mut() {
                        activation.line = line;
                    }
                }
            }
        }
    }

    fn interpret_unary(
        &mut self,
        object: ObjectId,
        frame: &mut LocalFrame,
        reader: &mut CodeReader<'_>,
        opcode: Opcode,
    ) -> KodResult<()> {
        let op = UnaryOp::try_from(reader.read_u8()?)?;
        let dest = reader.read_u32()?;
        let data = reader.read_u32()?;
        let source = self.retrieve(object, frame, opcode.source1_kind(), data)?;
        let result = unary(op, source)?;
        self.store(object, frame, opcode.dest_kind().operand_kind(), dest, result)
    }

    fn interpret_binary(
        &mut self,
        object: ObjectId,
        frame: &mut LocalFrame,
        reader: &mut CodeReader<'_>,
        opcode: Opcode,
    ) -> KodResult<()> {
        let op = BinaryOp::try_from(reader.read_u8()?)?;
        let dest = reader.read_u32()?;
        let left = reader.read_u32()?;
        let right = reader.read_u32()?;
        let left = self.retrieve(object, frame, opcode.source1_kind(), left)?;
        let right = self.retrieve(object, frame, opcode.source2_kind(), right)?;
        let result = binary(op, left, right)?;
        self.store(object, frame, opcode.dest_kind().operand_kind(), dest, result)
    }

    fn interpret_goto(
        &mut self,
        object: ObjectId,
        frame: &LocalFrame,
        reader: &mut CodeReader<'_>,
        opcode: Opcode,
        message: &Message,
    ) -> KodResult<()> {
        let mode = GotoMode::try_from(opcode.source1)?;
        let target = reader.read_u32()?;
        let taken = match mode {
            GotoMode::Always => true,
            GotoMode::IfTrue | GotoMode::IfFalse => {
                let data = reader.read_u32()?;
                let cond = self.retrieve(object, frame, opcode.source2_kind(), data)?;
                cond.is_truthy() == (mode == GotoMode::IfTrue)
            }
        };
        if !taken {
            return Ok(());
        }
        if (target as usize) < message.code_start() {
            return Err(KodError::BranchOutOfRange {
                target,
                len: message.body().len(),
            });
        }
        reader.seek(target as usize)
    }
}

fn expect_int(operation: &'static str, left: Value, right: Value) -> KodResult<(i64, i64)> {
    match (left.as_int(), right.as_int()) {
        (Some(l), Some(r)) => Ok((l, r)),
        _ => Err(KodError::TagMismatch {
            operation,
            left: left.tag(),
            right: right.tag(),
        }),
    }
}

fn unary(op: UnaryOp, source: Value) -> KodResult<Value> {
    let int = |source: Value| {
        source.as_int().ok_or(KodError::TagMismatch {
            operation: op.name(),
            left: source.tag(),
            right: Tag::Int,
        })
    };
    Ok(match op {
        UnaryOp::None => source,
        UnaryOp::Not => Value::bool(!source.is_truthy()),
        UnaryOp::Negate => Value::int(int(source)?.wrapping_neg()),
        UnaryOp::BitwiseNot => Value::int(!int(source)?),
    })
}

/// Integer results wrap within the 60-bit payload.
fn binary(op: BinaryOp, left: Value, right: Value) -> KodResult<Value> {
    let name = op.name();
    Ok(match op {
        BinaryOp::And => Value::bool(left.is_truthy() && right.is_truthy()),
        BinaryOp::Or => Value::bool(left.is_truthy() || right.is_truthy()),
        BinaryOp::Equal => Value::bool(left == right),
        BinaryOp::NotEqual => Value::bool(left != right),
        BinaryOp::Add => {
            let (l, r) = expect_int(name, left, right)?;
            Value::int(l.wrapping_add(r))
        }
        BinaryOp::Subtract => {
            let (l, r) = expect_int(name, left, right)?;
            Value::int(l.wrapping_sub(r))
        }
        BinaryOp::Multiply => {
            let (l, r) = expect_int(name, left, right)?;
            Value::int(l.wrapping_mul(r))
        }
        BinaryOp::Div => {
            let (l, r) = expect_int(name, left, right)?;
            if r == 0 {
                return Err(KodError::DivisionByZero);
            }
            Value::int(l.wrapping_div(r))
        }
        BinaryOp::Mod => {
            let (l, r) = expect_int(name, left, right)?;
            if r == 0 {
                return Err(KodError::DivisionByZero);
            }
            Value::int(l.wrapping_rem_euclid(r))
        }
        BinaryOp::LessThan => {
            let (l, r) = expect_int(name, left, right)?;
            Value::bool(l < r)
        }
        BinaryOp::GreaterThan => {
            let (l, r) = expect_int(name, left, right)?;
            Value::bool(l > r)
        }
        BinaryOp::LessEqual => {
            let (l, r) = expect_int(name, left, right)?;
            Value::bool(l <= r)
        }
        BinaryOp::GreaterEqual => {
            let (l, r) = expect_int(name, left, right)?;
            Value::bool(l >= r)
        }
        BinaryOp::BitwiseAnd => {
            let (l, r) = expect_int(name, left, right)?;
            Value::int(l & r)
        }
        BinaryOp::BitwiseOr => {
            let (l, r) = expect_int(name, left, right)?;
            Value::int(l | r)
        }
    })
}
