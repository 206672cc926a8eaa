use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};

use blakod::bytecode::{BinaryOp, Destination, NamedOperand, Operand, constant};
use blakod::primitives::SEND_MESSAGE;
use blakod::{
    Class, ClassId, ClassStore, ClassTable, Kod, KodConfig, MessageBuilder, MessageId, NamedValue,
    NativeCall, NativeDesc, ObjectId, ObjectStore, ObjectTable, ParmId, PropertyId, Value,
};

const SUM: MessageId = MessageId(1);
const CALLS: MessageId = MessageId(2);
const CHAIN: MessageId = MessageId(3);
const N: ParmId = ParmId(1);
const IDENTITY: u8 = 30;

fn identity(call: &mut NativeCall<'_, '_>) -> blakod::KodResult<Value> {
    call.arg(0)
}

/// Sum(n): arithmetic loop. Calls(n): loop around a native call.
/// Chain(n): n nested sends.
fn bench_world() -> (ClassTable, ObjectTable, ObjectId) {
    let mut b = MessageBuilder::new(1);
    let n = b.parameter(N, Value::int(0));
    let s = b.local(0);
    b.emit_load_constant(Destination::local(s), Value::int(0));
    let top = b.current_offset();
    let exit = b.emit_goto_if_false(Operand::local(n));
    b.emit_binary(BinaryOp::Add, Destination::local(s), Operand::local(s), Operand::local(n));
    b.emit_binary(
        BinaryOp::Subtract,
        Destination::local(n),
        Operand::local(n),
        constant(Value::int(1)),
    );
    b.emit_goto_back(top);
    b.bind(exit);
    b.emit_return(Operand::local(s));
    let sum = b.build(SUM, "Sum").unwrap();

    let mut b = MessageBuilder::new(1);
    let n = b.parameter(N, Value::int(0));
    let v = b.local(0);
    let top = b.current_offset();
    let exit = b.emit_goto_if_false(Operand::local(n));
    b.emit_call(
        IDENTITY,
        Some(Destination::local(v)),
        &[Operand::local(n), constant(Value::int(2)), constant(Value::int(3))],
        &[],
    );
    b.emit_binary(
        BinaryOp::Subtract,
        Destination::local(n),
        Operand::local(n),
        constant(Value::int(1)),
    );
    b.emit_goto_back(top);
    b.bind(exit);
    b.emit_return(Operand::local(v));
    let calls = b.build(CALLS, "Calls").unwrap();

    let mut b = MessageBuilder::new(1);
    let n = b.parameter(N, Value::int(0));
    let next = b.local(0);
    let done = b.emit_goto_if_false(Operand::local(n));
    b.emit_binary(
        BinaryOp::Subtract,
        Destination::local(next),
        Operand::local(n),
        constant(Value::int(1)),
    );
    b.emit_call(
        SEND_MESSAGE,
        None,
        &[Operand::property(0), constant(Value::message(CHAIN))],
        &[NamedOperand {
            name: N.0,
            operand: Operand::local(next),
        }],
    );
    b.bind(done);
    b.emit_return(Operand::local(n));
    let chain = b.build(CHAIN, "Chain").unwrap();

    let mut classes = ClassTable::new();
    let class = classes.insert(
        Class::new(ClassId(1), "Bench")
            .with_property(PropertyId(1), Value::NIL)
            .with_message(sum)
            .with_message(calls)
            .with_message(chain),
    );
    let mut objects = ObjectTable::new();
    let object = objects.create(&class);
    objects.get_mut(object).unwrap().property_mut(0).unwrap().value = Value::object(object);
    (classes, objects, object)
}

fn bench_interpreter(c: &mut Criterion) {
    let (classes, mut objects, object) = bench_world();
    let mut kod = Kod::new(KodConfig::default().with_max_statements(1_000_000));
    kod.natives_mut().register(IDENTITY, NativeDesc::new("identity", identity));

    let mut group = c.benchmark_group("interpreter");
    for (name, message, n) in [
        ("arith_loop_1000", SUM, 1000),
        ("native_calls_1000", CALLS, 1000),
        ("nested_sends_100", CHAIN, 100),
    ] {
        let parms = [NamedValue::new(N, Value::int(n))];
        group.bench_function(name, |bench| {
            bench.iter(|| {
                let result =
                    kod.send_top_level(&mut objects, &classes, object, message, black_box(&parms));
                black_box(result)
            })
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let (classes, _, _) = bench_world();
    let message = classes
        .class(ClassId(1))
        .and_then(|class| class.message(CALLS).cloned())
        .unwrap();
    c.bench_function("disassemble_calls", |bench| {
        bench.iter_batched(
            || message.clone(),
            |message| black_box(blakod::format::listing(&message)),
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_interpreter, bench_decode);
criterion_main!(benches);
