//! Native functions: the table scripts call into and the CALL instruction
//! that marshals parameters for them.
use crate::bytecode::{AssignMode, CodeReader, Opcode, read_parameter};
use crate::{
    Interpreter, KodError, KodResult, LocalFrame, MAX_C_FUNCTION, MAX_C_PARMS,
    MAX_NAME_PARMS, MessageId, NamedValue, ObjectId, ParmId, Value, channel,
};

pub mod general;
pub mod message;

pub type NativeFn = fn(&mut NativeCall<'_, '_>) -> KodResult<Value>;

#[derive(Clone, Copy)]
pub struct NativeDesc {
    pub name: &'static str,
    pub func: NativeFn,
}

impl NativeDesc {
    pub const fn new(name: &'static str, func: NativeFn) -> Self {
        Self { name, func }
    }
}

impl std::fmt::Debug for NativeDesc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeDesc").field("name", &self.name).finish()
    }
}

pub const SEND_MESSAGE: u8 = 0;
pub const POST_MESSAGE: u8 = 1;
pub const DEBUG: u8 = 2;

/// Index-addressed native functions.
#[derive(Debug, Clone)]
pub struct NativeTable {
    entries: Vec<Option<NativeDesc>>,
}

impl Default for NativeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeTable {
    pub fn new() -> Self {
        Self {
            entries: vec![None; MAX_C_FUNCTION],
        }
    }

    /// Installs `desc` at `index`, returning what was there.
    pub fn register(&mut self, index: u8, desc: NativeDesc) -> Option<NativeDesc> {
        self.entries[index as usize].replace(desc)
    }

    pub fn unregister(&mut self, index: u8) -> Option<NativeDesc> {
        self.entries[index as usize].take()
    }

    #[inline]
    pub fn get(&self, index: u8) -> Option<NativeDesc> {
        self.entries[index as usize]
    }

    pub fn name(&self, index: u8) -> Option<&'static str> {
        self.get(index).map(|d| d.name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, NativeDesc)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, d)| d.map(|d| (i as u8, d)))
    }
}

pub fn standard_natives() -> NativeTable {
    let mut table = NativeTable::new();
    table.register(
        SEND_MESSAGE,
        NativeDesc::new("SendMessage", message::send_message),
    );
    table.register(
        POST_MESSAGE,
        NativeDesc::new("PostMessage", message::post_message),
    );
    table.register(DEBUG, NativeDesc::new("Debug", general::debug));
    table
}

/// What a native sees of the call that invoked it.
pub struct NativeCall<'a, 'k> {
    pub interp: &'a mut Interpreter<'k>,
    pub name: &'static str,
    /// The object whose message made the call.
    pub object: ObjectId,
    pub frame: &'a LocalFrame,
    pub positional: &'a [Value],
    pub named: &'a [NamedValue],
}

impl NativeCall<'_, '_> {
    pub fn error(&self, reason: impl Into<String>) -> KodError {
        KodError::Native {
            name: self.name,
            reason: reason.into(),
        }
    }

    pub fn arg(&self, index: usize) -> KodResult<Value> {
        self.positional
            .get(index)
            .copied()
            .ok_or_else(|| self.error(format!("missing parameter {index}")))
    }

    pub fn object_arg(&self, index: usize) -> KodResult<ObjectId> {
        let value = self.arg(index)?;
        value
            .as_object()
            .ok_or_else(|| self.error(format!("parameter {index} is {value}, not an object")))
    }

    pub fn message_arg(&self, index: usize) -> KodResult<MessageId> {
        let value = self.arg(index)?;
        value
            .as_message()
            .ok_or_else(|| self.error(format!("parameter {index} is {value}, not a message")))
    }

    pub fn named_arg(&self, name: ParmId) -> Option<Value> {
        self.named.iter().find(|p| p.name == name).map(|p| p.value)
    }
}

impl Interpreter<'_> {
    /// Executes a CALL whose opcode byte has been consumed.
    ///
    /// Reads the native index, the destination when the call assigns, then
    /// the positional and named parameter lists. Each count is checked
    /// against its ceiling before any parameter is read; on overflow the
    /// failure is reported and flushed and the native is not invoked.
    pub fn interpret_call(
        &mut self,
        object: ObjectId,
        frame: &mut LocalFrame,
        reader: &mut CodeReader<'_>,
        opcode: Opcode,
    ) -> KodResult<()> {
        let index = reader.read_u8()?;
        let dest = match AssignMode::try_from(opcode.source1)?.dest_kind() {
            Some(kind) => Some((kind, reader.read_u32()?)),
            None => None,
        };

        let count = reader.read_u8()? as usize;
        if count > MAX_C_PARMS {
            return Err(self.fail(KodError::TooManyPositionalParms {
                count,
                max: MAX_C_PARMS,
            }));
        }
        let mut positional = Vec::with_capacity(count);
        for _ in 0..count {
            let operand = read_parameter(reader)?;
            positional.push(self.retrieve(object, frame, operand.kind, operand.data)?);
        }

        let count = reader.read_u8()? as usize;
        if count > MAX_NAME_PARMS {
            return Err(self.fail(KodError::TooManyNamedParms {
                count,
                max: MAX_NAME_PARMS,
            }));
        }
        let mut named = Vec::with_capacity(count);
        for _ in 0..count {
            let name = ParmId(reader.read_u32()?);
            let operand = read_parameter(reader)?;
            let value = self.retrieve(object, frame, operand.kind, operand.data)?;
            named.push(NamedValue { name, value });
        }

        let desc = self
            .natives
            .get(index)
            .ok_or(KodError::UnknownNative(index))?;
        self.stats.record_native(index);
        self.native_calls += 1;
        log::trace!(target: channel::TRACE, "call {} ({index})", desc.name);

        let result = {
            let mut call = NativeCall {
                interp: self,
                name: desc.name,
                object,
                frame: &*frame,
                positional: &positional,
                named: &named,
            };
            (desc.func)(&mut call)?
        };

        if let Some((kind, index)) = dest {
            self.store(object, frame, kind.operand_kind(), index, result)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::{Command, Destination, NamedOperand, Operand, OperandKind, constant};
    use crate::objects::ObjectStore;
    use crate::{
        Class, ClassId, ClassTable, KodConfig, KodStats, ManualClock,
        ObjectTable, PostQueue, PropertyId, Tag,
    };
    use std::cell::RefCell;

    thread_local! {
        static SEEN: RefCell<Vec<(Vec<Value>, Vec<NamedValue>)>> = const { RefCell::new(Vec::new()) };
    }

    fn recording(call: &mut NativeCall<'_, '_>) -> KodResult<Value> {
        SEEN.with(|s| s.borrow_mut().push((call.positional.to_vec(), call.named.to_vec())));
        Ok(Value::int(call.positional.len() as i64 + 100))
    }

    fn calls_seen() -> Vec<(Vec<Value>, Vec<NamedValue>)> {
        SEEN.with(|s| s.borrow().clone())
    }

    struct World {
        objects: ObjectTable,
        classes: ClassTable,
        natives: NativeTable,
        config: KodConfig,
        stats: KodStats,
        posts: PostQueue,
        clock: ManualClock,
        object: ObjectId,
    }

    impl World {
        fn new() -> Self {
            SEEN.with(|s| s.borrow_mut().clear());
            let mut classes = ClassTable::new();
            let class = classes.insert(
                Class::new(ClassId(1), "Caller").with_property(PropertyId(1), Value::int(5)),
            );
            let mut objects = ObjectTable::new();
            let object = objects.create(&class);
            let mut natives = NativeTable::new();
            natives.register(9, NativeDesc::new("Record", recording));
            Self {
                objects,
                classes,
                natives,
                config: KodConfig::default(),
                stats: KodStats::new(),
                posts: PostQueue::new(4),
                clock: ManualClock::default(),
                object,
            }
        }

        /// Runs CALL operand bytes (opcode excluded) and returns the result
        /// with the reader offset afterwards.
        fn call(&mut self, opcode: Opcode, operands: &[u8], frame: &mut LocalFrame) -> (KodResult<()>, usize) {
            let mut interp = Interpreter::new(
                &mut self.objects,
                &self.classes,
                &self.natives,
                &self.config,
                &mut self.stats,
                &mut self.posts,
                &self.clock,
            );
            let mut reader = CodeReader::new(operands);
            let result = interp.interpret_call(self.object, frame, &mut reader, opcode);
            (result, reader.offset())
        }
    }

    fn discard() -> Opcode {
        Opcode::new(Command::Call, 0, AssignMode::Discard as u8, 0)
    }

    fn parm(bytes: &mut Vec<u8>, kind: OperandKind, data: u32) {
        bytes.push(kind as u8);
        bytes.extend_from_slice(&data.to_le_bytes());
    }

    #[test]
    fn one_positional_int_reaches_native() {
        let mut world = World::new();
        let mut bytes = vec![9, 1];
        parm(&mut bytes, OperandKind::Constant, constant(Value::int(123)).data);
        bytes.push(0);
        let mut frame = LocalFrame::new(0).unwrap();
        let (result, offset) = world.call(discard(), &bytes, &mut frame);
        assert_eq!(result, Ok(()));
        assert_eq!(offset, bytes.len());
        let seen = calls_seen();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, vec![Value::int(123)]);
        assert_eq!(seen[0].0[0].tag(), Tag::Int);
        assert!(seen[0].1.is_empty());
        assert_eq!(world.stats.native_calls(9), 1);
    }

    #[test]
    fn forty_positional_parameters_are_accepted() {
        let mut world = World::new();
        let mut bytes = vec![9, 40];
        for n in 0..40 {
            parm(&mut bytes, OperandKind::Constant, constant(Value::int(n)).data);
        }
        bytes.push(0);
        let mut frame = LocalFrame::new(0).unwrap();
        let (result, _) = world.call(discard(), &bytes, &mut frame);
        assert_eq!(result, Ok(()));
        assert_eq!(calls_seen()[0].0.len(), 40);
    }

    #[test]
    fn forty_one_positional_parameters_fail_before_reading() {
        let mut world = World::new();
        let mut bytes = vec![9, 41];
        // parameter bytes that would be consumed if the count were trusted
        bytes.extend(std::iter::repeat_n(0u8, 41 * 5 + 1));
        let mut frame = LocalFrame::new(0).unwrap();
        let (result, offset) = world.call(discard(), &bytes, &mut frame);
        assert_eq!(
            result,
            Err(KodError::TooManyPositionalParms { count: 41, max: 40 })
        );
        assert_eq!(offset, 2);
        assert!(calls_seen().is_empty());
        assert_eq!(world.stats.num_ccalls, 0);
    }

    #[test]
    fn forty_five_named_parameters_are_accepted() {
        let mut world = World::new();
        let mut bytes = vec![9, 0, 45];
        for n in 0..45u32 {
            bytes.extend_from_slice(&n.to_le_bytes());
            parm(&mut bytes, OperandKind::Constant, constant(Value::int(n as i64)).data);
        }
        let mut frame = LocalFrame::new(0).unwrap();
        let (result, _) = world.call(discard(), &bytes, &mut frame);
        assert_eq!(result, Ok(()));
        let named = &calls_seen()[0].1;
        assert_eq!(named.len(), 45);
        assert_eq!(named[44], NamedValue {
            name: ParmId(44),
            value: Value::int(44)
        });
    }

    #[test]
    fn forty_six_named_parameters_fail_before_reading() {
        let mut world = World::new();
        let mut bytes = vec![9, 0, 46];
        bytes.extend(std::iter::repeat_n(0u8, 46 * 9));
        let mut frame = LocalFrame::new(0).unwrap();
        let (result, offset) = world.call(discard(), &bytes, &mut frame);
        assert_eq!(result, Err(KodError::TooManyNamedParms { count: 46, max: 45 }));
        assert_eq!(offset, 3);
        assert!(calls_seen().is_empty());
    }

    #[test]
    fn result_is_assigned() {
        let mut world = World::new();
        let opcode = Opcode::new(Command::Call, 0, AssignMode::AssignProperty as u8, 0);
        let mut bytes = vec![9];
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.push(2);
        parm(&mut bytes, OperandKind::Property, 0);
        parm(&mut bytes, OperandKind::Local, 0);
        bytes.push(0);
        let mut frame = LocalFrame::new(1).unwrap();
        frame.set(0, Value::int(-1)).unwrap();
        let (result, _) = world.call(opcode, &bytes, &mut frame);
        assert_eq!(result, Ok(()));
        assert_eq!(calls_seen()[0].0, vec![Value::int(5), Value::int(-1)]);
        let object = world.objects.get(world.object).unwrap();
        assert_eq!(object.property(0).unwrap().value, Value::int(102));
    }

    #[test]
    fn unregistered_native_is_an_error() {
        let mut world = World::new();
        let mut frame = LocalFrame::new(0).unwrap();
        let (result, _) = world.call(discard(), &[200, 0, 0], &mut frame);
        assert_eq!(result, Err(KodError::UnknownNative(200)));
    }

    #[test]
    fn bad_parameter_kind_is_rejected() {
        let mut world = World::new();
        let mut frame = LocalFrame::new(0).unwrap();
        let (result, _) = world.call(discard(), &[9, 1, 7, 0, 0, 0, 0, 0], &mut frame);
        assert_eq!(result, Err(KodError::InvalidOperandKind(7)));
        assert!(calls_seen().is_empty());
    }

    #[test]
    fn invalid_assign_mode_is_rejected() {
        let mut world = World::new();
        let mut frame = LocalFrame::new(0).unwrap();
        let opcode = Opcode::new(Command::Call, 0, 3, 0);
        let (result, _) = world.call(opcode, &[9, 0, 0], &mut frame);
        assert_eq!(result, Err(KodError::InvalidAssignMode(3)));
    }

    #[test]
    fn builder_calls_decode_in_the_interpreter() {
        let mut b = crate::MessageBuilder::new(1);
        b.emit_call(
            9,
            Some(Destination::local(0)),
            &[Operand::property(0)],
            &[NamedOperand {
                name: 4,
                operand: constant(Value::NIL),
            }],
        );
        b.emit_return(Operand::local(0));
        let message = b.build(MessageId(1), "m").unwrap();

        let mut world = World::new();
        let mut interp = Interpreter::new(
            &mut world.objects,
            &world.classes,
            &world.natives,
            &world.config,
            &mut world.stats,
            &mut world.posts,
            &world.clock,
        );
        let mut frame = LocalFrame::new(1).unwrap();
        let result = interp.interpret(world.object, &message, &mut frame);
        assert_eq!(result, Ok(crate::Return::Value(Value::int(101))));
        assert_eq!(calls_seen()[0].1, vec![NamedValue {
            name: ParmId(4),
            value: Value::NIL
        }]);
    }

    #[test]
    fn standard_table_layout() {
        let table = standard_natives();
        assert_eq!(table.name(SEND_MESSAGE), Some("SendMessage"));
        assert_eq!(table.name(POST_MESSAGE), Some("PostMessage"));
        assert_eq!(table.name(DEBUG), Some("Debug"));
        assert_eq!(table.iter().count(), 3);
        assert!(table.get(3).is_none());
    }
}
