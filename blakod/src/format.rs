//! Text rendering of values, call stacks and message bodies for diagnostics.
//!
//! Everything returns an owned `String`; nothing is cached between calls.
use crate::bytecode::BytecodeDecoder;
use crate::{Activation, ClassStore, KodResult, Message, Tag, Value};

/// The tag as shown in script diagnostics: nil is `$`, the reserved tag
/// prints as its number.
pub fn tag_name(value: Value) -> &'static str {
    match value.tag() {
        Tag::Nil => "$",
        Tag::Override => "14",
        tag => tag.name(),
    }
}

/// The payload as a script author would recognize it.
pub fn data_name(value: Value, classes: &dyn ClassStore) -> String {
    match value.tag() {
        Tag::Nil => String::from("$"),
        Tag::Class => match value.as_class().and_then(|id| classes.class(id)) {
            Some(class) => class.name().to_owned(),
            None => format!("<class {}>", value.payload()),
        },
        _ => value.payload().to_string(),
    }
}

/// `TAG data`
pub fn value_name(value: Value, classes: &dyn ClassStore) -> String {
    format!("{} {}", tag_name(value), data_name(value, classes))
}

/// `[Class Message (line N)]`
pub fn debug_info(classes: &dyn ClassStore, activation: &Activation) -> String {
    let class = classes.class(activation.class);
    let class_name = class
        .as_ref()
        .map_or_else(|| format!("<class {}>", activation.class), |c| c.name().to_owned());
    let message_name = class
        .as_ref()
        .and_then(|c| c.message(activation.message))
        .map_or_else(
            || format!("<message {}>", activation.message),
            |m| m.name().to_owned(),
        );
    format!("[{class_name} {message_name} (line {})]", activation.line)
}

/// Innermost message first.
pub fn stack_info(classes: &dyn ClassStore, stack: &[Activation]) -> String {
    if stack.is_empty() {
        return String::from("<empty>");
    }
    let frames: Vec<String> = stack
        .iter()
        .rev()
        .map(|a| format!("{} on {}", debug_info(classes, a), a.object))
        .collect();
    frames.join(" <- ")
}

/// Disassembly of a message body: offset, raw bytes, instruction.
pub fn listing(message: &Message) -> KodResult<String> {
    let body = message.body();
    let mut lines = vec![format!(
        "; {} locals, {} parameters",
        message.num_locals(),
        message.parameters().len()
    )];
    lines.extend(
        message
            .parameters()
            .iter()
            .map(|parm| format!("; parm ${} = {}", parm.id, parm.default)),
    );
    let mut decoder = BytecodeDecoder::for_message(message);
    while let Some(next) = decoder.decode_next() {
        let (offset, instr) = next?;
        let raw = hex::encode(&body[offset..decoder.offset()]);
        lines.push(format!("{offset:04}  {raw:<24} {instr}"));
    }
    let mut out = lines.join("\n");
    out.push('\n');
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Class, ClassId, ClassTable, MessageBuilder, MessageId, ObjectId, ParmId};

    fn classes() -> ClassTable {
        let mut b = MessageBuilder::new(0);
        b.emit_return_propagate();
        let mut table = ClassTable::new();
        table.insert(
            Class::new(ClassId(3), "Player")
                .with_message(b.build(MessageId(8), "Constructor").unwrap()),
        );
        table
    }

    #[test]
    fn value_names() {
        let table = classes();
        assert_eq!(value_name(Value::int(-4), &table), "INT -4");
        assert_eq!(value_name(Value::NIL, &table), "$ $");
        assert_eq!(value_name(Value::class(ClassId(3)), &table), "CLASS Player");
        assert_eq!(value_name(Value::class(ClassId(4)), &table), "CLASS <class 4>");
        assert_eq!(value_name(Value::new(Tag::Invalid, 0), &table), "INVALID 0");
    }

    #[test]
    fn tag_names_match_script_diagnostics() {
        assert_eq!(tag_name(Value::int(1)), "INT");
        assert_eq!(tag_name(Value::NIL), "$");
        assert_eq!(tag_name(Value::new(Tag::Override, 3)), "14");
        assert_eq!(tag_name(Value::new(Tag::Invalid, 0)), "INVALID");
    }

    #[test]
    fn debug_info_names_class_and_message() {
        let table = classes();
        let mut activation = Activation::new(ObjectId(1), ClassId(3), MessageId(8));
        activation.line = 17;
        assert_eq!(debug_info(&table, &activation), "[Player Constructor (line 17)]");
        let unknown = Activation::new(ObjectId(1), ClassId(9), MessageId(2));
        assert_eq!(
            debug_info(&table, &unknown),
            "[<class 9> <message 2> (line 0)]"
        );
    }

    #[test]
    fn stack_is_innermost_first() {
        let table = classes();
        let stack = [
            Activation::new(ObjectId(1), ClassId(3), MessageId(8)),
            Activation::new(ObjectId(2), ClassId(9), MessageId(2)),
        ];
        let info = stack_info(&table, &stack);
        assert!(info.starts_with("[<class 9> <message 2> (line 0)] on 2 <- "));
        assert!(info.ends_with("[Player Constructor (line 0)] on 1"));
        assert_eq!(stack_info(&table, &[]), "<empty>");
    }

    #[test]
    fn listing_shows_bytes_and_instructions() {
        let mut b = MessageBuilder::new(0);
        b.parameter(ParmId(5), Value::int(1));
        b.emit_return_constant(Value::int(42));
        let message = b.build(MessageId(1), "m").unwrap();
        let text = listing(&message).unwrap();
        assert!(text.contains("; parm $5 = INT 1"));
        assert!(text.contains("0010  982a000010"));
        assert!(text.contains("return #INT 42"));
    }
}
