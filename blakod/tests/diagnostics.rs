//! Logging behavior observed through a recording logger.
//!
//! The logger is process-wide, so every check lives in this one binary and
//! compares counts before and after rather than absolute values.
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, Once};

use blakod::bytecode::{Destination, Operand, constant};
use blakod::{
    Class, ClassId, ClassTable, Kod, KodConfig, KodError, MessageBuilder, MessageId,
    ObjectId, ObjectTable, PropertyId, Tag, Value, channel,
};

struct Recorder {
    flushes: AtomicUsize,
    records: Mutex<Vec<(String, log::Level, String)>>,
}

impl log::Log for Recorder {
    fn enabled(&self, _: &log::Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &log::Record<'_>) {
        self.records.lock().unwrap().push((
            record.target().to_owned(),
            record.level(),
            record.args().to_string(),
        ));
    }

    fn flush(&self) {
        self.flushes.fetch_add(1, Ordering::SeqCst);
    }
}

static RECORDER: Recorder = Recorder {
    flushes: AtomicUsize::new(0),
    records: Mutex::new(Vec::new()),
};

fn install() -> &'static Recorder {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        log::set_logger(&RECORDER).unwrap();
        log::set_max_level(log::LevelFilter::Trace);
    });
    &RECORDER
}

fn records_matching(target: &str, needle: &str) -> usize {
    RECORDER
        .records
        .lock()
        .unwrap()
        .iter()
        .filter(|(t, _, m)| t == target && m.contains(needle))
        .count()
}

fn single_message_world(build: impl FnOnce(&mut MessageBuilder)) -> (ClassTable, ObjectTable, ObjectId) {
    let mut b = MessageBuilder::new(2);
    build(&mut b);
    let mut classes = ClassTable::new();
    let class = classes.insert(
        Class::new(ClassId(4), "Sample")
            .with_property(PropertyId(1), Value::int(0))
            .with_message(b.build(MessageId(1), "Sample").unwrap()),
    );
    let mut objects = ObjectTable::new();
    let object = objects.create(&class);
    (classes, objects, object)
}

#[test]
fn overflowing_native_call_is_logged_and_flushed() {
    let recorder = install();
    let (classes, mut objects, object) = single_message_world(|b| {
        let args = vec![constant(Value::int(1)); 41];
        b.emit_call(2, Some(Destination::local(0)), &args, &[]);
        b.emit_return(Operand::local(0));
    });
    let mut kod = Kod::new(KodConfig::default());

    let flushes = recorder.flushes.load(Ordering::SeqCst);
    let result = kod.send_top_level(&mut objects, &classes, object, MessageId(1), &[]);
    assert_eq!(
        result,
        Err(KodError::TooManyPositionalParms { count: 41, max: 40 })
    );
    assert!(recorder.flushes.load(Ordering::SeqCst) > flushes);
    assert_eq!(
        records_matching(channel::ERROR, "[Sample Sample (line 0)] 41 positional parameters"),
        1
    );
}

#[test]
fn statement_budget_is_logged_and_flushed() {
    let recorder = install();
    let (classes, mut objects, object) = single_message_world(|b| {
        let top = b.current_offset();
        b.emit_goto_back(top);
    });
    let mut kod = Kod::new(KodConfig::default().with_max_statements(100));

    let flushes = recorder.flushes.load(Ordering::SeqCst);
    let result = kod.send_top_level(&mut objects, &classes, object, MessageId(1), &[]);
    assert_eq!(result, Err(KodError::StatementBudgetExceeded { budget: 100 }));
    assert!(recorder.flushes.load(Ordering::SeqCst) > flushes);
    assert_eq!(kod.stats().last.statements, 101);
}

#[test]
fn lookup_errors_go_to_bad_kod_without_flush() {
    install();
    let (classes, mut objects, object) = single_message_world(|b| {
        b.emit_return_constant(Value::NIL);
    });
    let mut kod = Kod::new(KodConfig::default());

    let before = records_matching(channel::BAD_KOD, "has no handler");
    let result = kod.send_top_level(&mut objects, &classes, object, MessageId(77), &[]);
    assert!(matches!(result, Err(KodError::UnknownMessage { .. })));
    assert!(records_matching(channel::BAD_KOD, "has no handler") > before);
}

#[test]
fn uninitialized_local_read_warns() {
    install();
    let (classes, mut objects, object) = single_message_world(|b| {
        b.emit_move(Destination::property(0), Operand::local(1));
        b.emit_return(Operand::property(0));
    });
    let mut kod = Kod::new(KodConfig::default().with_debug_initlocals(true));

    let before = records_matching(channel::BAD_KOD, "uninitialized local 1");
    let result = kod.send_top_level(&mut objects, &classes, object, MessageId(1), &[]);
    assert_eq!(result, Ok(Value::NIL));
    assert_eq!(records_matching(channel::BAD_KOD, "uninitialized local 1"), before + 1);
}

#[test]
fn stored_invalid_value_reads_back_without_warning() {
    install();
    let (classes, mut objects, object) = single_message_world(|b| {
        b.emit_load_constant(Destination::local(1), Value::new(Tag::Invalid, 0));
        b.emit_move(Destination::property(0), Operand::local(1));
        b.emit_return(Operand::property(0));
    });
    for init_locals in [false, true] {
        let mut kod = Kod::new(KodConfig::default().with_debug_initlocals(init_locals));
        let before = records_matching(channel::BAD_KOD, "uninitialized local 1");
        let result = kod.send_top_level(&mut objects, &classes, object, MessageId(1), &[]);
        assert_eq!(result, Ok(Value::new(Tag::Invalid, 0)));
        assert_eq!(records_matching(channel::BAD_KOD, "uninitialized local 1"), before);
    }
}
