use crate::primitives::NativeCall;
use crate::{KodResult, PostedMessage, Value, channel};

/// `SendMessage(object, message, named...)`
pub fn send_message(call: &mut NativeCall<'_, '_>) -> KodResult<Value> {
    let object = call.object_arg(0)?;
    let message = call.message_arg(1)?;
    let named = call.named;
    call.interp.send_message(object, message, named)
}

/// `PostMessage(object, message, named...)`: queues the send for the next
/// delivery round. Returns `1` when queued, `0` when the queue is full.
pub fn post_message(call: &mut NativeCall<'_, '_>) -> KodResult<Value> {
    let post = PostedMessage {
        object: call.object_arg(0)?,
        message: call.message_arg(1)?,
        parms: call.named.to_vec(),
    };
    match call.interp.post(post) {
        Ok(()) => Ok(Value::int(1)),
        Err(err) => {
            log::warn!(target: channel::BAD_KOD, "{} {err}", call.interp.debug_info());
            Ok(Value::int(0))
        }
    }
}
