//! Message sends: handler lookup, parameter binding, the recursion ceiling
//! and `propagate` re-dispatch.
use std::sync::Arc;

use crate::{
    Activation, Class, Interpreter, KodError, KodResult, LocalFrame,
    MAX_NAME_PARMS, Message, MessageId, ObjectId, ParmId, Return, Value,
    channel,
};

/// A named parameter passed with a send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamedValue {
    pub name: ParmId,
    pub value: Value,
}

impl NamedValue {
    pub fn new(name: ParmId, value: Value) -> Self {
        Self { name, value }
    }
}

/// Nested sends recurse on the native stack. When less than `RED_ZONE`
/// remains, the next handler runs on a fresh `STACK_SEGMENT`.
const RED_ZONE: usize = 256 * 1024;
const STACK_SEGMENT: usize = 4 * 1024 * 1024;

impl Interpreter<'_> {
    /// Sends `message` to `object` from inside a running message.
    ///
    /// A failed send yields `Nil` to the caller, which keeps running. An
    /// exhausted statement budget is the exception and ends the whole chain.
    pub fn send_message(
        &mut self,
        object: ObjectId,
        message: MessageId,
        parms: &[NamedValue],
    ) -> KodResult<Value> {
        match self.dispatch(object, message, parms) {
            Err(err) if !err.aborts_chain() => {
                log::debug!(
                    target: channel::DEBUG,
                    "{} send of {message} to {object} failed: {err}",
                    self.debug_info()
                );
                self.unwinding = None;
                Ok(Value::NIL)
            }
            result => result,
        }
    }

    /// Finds and runs the handler for `message` on `object`, following
    /// `propagate` up the superclass chain.
    pub(crate) fn dispatch(
        &mut self,
        object: ObjectId,
        message: MessageId,
        parms: &[NamedValue],
    ) -> KodResult<Value> {
        if parms.len() > MAX_NAME_PARMS {
            return Err(self.fail(KodError::TooManyNamedParms {
                count: parms.len(),
                max: MAX_NAME_PARMS,
            }));
        }
        let depth = self.stack.len();
        if depth >= self.config().max_depth {
            return Err(self.fail(KodError::RecursionLimit { depth }));
        }
        let class_id = match self.objects().get(object) {
            Some(target) => target.class_id(),
            None => return Err(self.fail(KodError::UnknownObject(object))),
        };

        let mut start = class_id;
        let mut propagated = false;
        loop {
            let Some((class, handler)) = self.classes().find_message(start, message)
            else {
                if propagated {
                    return Ok(Value::NIL);
                }
                return Err(self.fail(KodError::UnknownMessage {
                    class: class_id,
                    message,
                }));
            };
            match self.run_handler(object, &class, &handler, parms)? {
                Return::Value(value) => return Ok(value),
                Return::Propagate => match class.super_id() {
                    Some(super_id) => {
                        start = super_id;
                        propagated = true;
                    }
                    None => return Ok(Value::NIL),
                },
            }
        }
    }

    fn run_handler(
        &mut self,
        object: ObjectId,
        class: &Arc<Class>,
        handler: &Arc<Message>,
        parms: &[NamedValue],
    ) -> KodResult<Return> {
        let mut frame = self.bind_frame(handler, parms)?;
        let profiling = self.config().profile_messages;
        let started = self.clock.milli_count();

        self.stack.push(Activation::new(object, class.id(), handler.id()));
        self.stats.record_message(self.stack.len());
        let result = stacker::maybe_grow(RED_ZONE, STACK_SEGMENT, || {
            self.interpret(object, handler, &mut frame)
        });
        self.stack.pop();

        if profiling {
            let elapsed = self.clock.milli_count().saturating_sub(started);
            self.stats.record_profile(class.id(), handler.id(), elapsed);
        }
        result
    }

    /// Builds the handler's frame: declared parameters first, each taking the
    /// passed value with a matching name or its default, then plain locals.
    fn bind_frame(&self, handler: &Message, parms: &[NamedValue]) -> KodResult<LocalFrame> {
        let mut frame = if self.stats.debug_initlocals {
            LocalFrame::unwritten(handler.frame_size())?
        } else {
            LocalFrame::new(handler.frame_size())?
        };
        for (index, declared) in handler.parameters().iter().enumerate() {
            let value = parms
                .iter()
                .find(|p| p.name == declared.id)
                .map_or(declared.default, |p| p.value);
            frame.set(index as u32, value)?;
        }
        Ok(frame)
    }
}
