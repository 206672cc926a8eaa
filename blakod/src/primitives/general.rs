use crate::primitives::NativeCall;
use crate::{KodResult, Value, channel, format};

/// `Debug(values...)`: writes the values to the debug channel.
pub fn debug(call: &mut NativeCall<'_, '_>) -> KodResult<Value> {
    let classes = call.interp.classes();
    let rendered: Vec<String> = call
        .positional
        .iter()
        .map(|v| format::data_name(*v, classes))
        .collect();
    log::debug!(
        target: channel::DEBUG,
        "{} {}",
        call.interp.debug_info(),
        rendered.join(" ")
    );
    Ok(Value::NIL)
}
