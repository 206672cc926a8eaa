use clap::{Parser as ClapParser, Subcommand};
use std::{process, sync::Arc};

use blakod::bytecode::{BinaryOp, Destination, NamedOperand, Operand, constant};
use blakod::primitives::{DEBUG, POST_MESSAGE, SEND_MESSAGE};
use blakod::{
    Class, ClassId, ClassStore, ClassTable, Kod, KodConfig, KodResult, KodStats, Message,
    MessageBuilder, MessageId, NamedValue, ObjectId, ObjectStore, ObjectTable, ParmId,
    PropertyId, Value, format,
};

const PROFILE_LIMIT: usize = 10;

#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the listing of a hex-encoded message body
    Disasm {
        #[arg(help = "Message body as hex, header included")]
        body: String,
    },
    /// Run a hex-encoded message body on a fresh object
    Run {
        #[arg(help = "Message body as hex, header included")]
        body: String,

        #[arg(long, default_value_t = blakod::DEFAULT_MAX_STATEMENTS)]
        max_statements: u64,

        #[arg(long, default_value_t = blakod::DEFAULT_MAX_DEPTH)]
        max_depth: usize,

        /// Warn on reads of never-written locals
        #[arg(long)]
        init_locals: bool,

        /// Collect per-message timing
        #[arg(long)]
        profile: bool,
    },
    /// Run the built-in countdown script
    Demo {
        #[arg(long, default_value_t = 5)]
        count: i64,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let outcome = match cli.command {
        Command::Disasm { body } => disasm(&body),
        Command::Run {
            body,
            max_statements,
            max_depth,
            init_locals,
            profile,
        } => {
            let config = KodConfig::default()
                .with_max_statements(max_statements)
                .with_max_depth(max_depth)
                .with_debug_initlocals(init_locals)
                .with_profile_messages(profile);
            run(&body, config)
        }
        Command::Demo { count } => demo(count),
    };

    if let Err(err) = outcome {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}

fn decode_body(hex_body: &str) -> Result<Message, String> {
    let bytes = hex::decode(hex_body.trim()).map_err(|err| format!("bad hex: {err}"))?;
    Message::new(MessageId(1), "Main", bytes).map_err(|err| err.to_string())
}

fn disasm(hex_body: &str) -> Result<(), String> {
    let message = decode_body(hex_body)?;
    let text = format::listing(&message).map_err(|err| err.to_string())?;
    print!("{text}");
    Ok(())
}

fn run(hex_body: &str, config: KodConfig) -> Result<(), String> {
    let message = decode_body(hex_body)?;
    let mut classes = ClassTable::new();
    let class = classes.insert(
        Class::new(ClassId(1), "Scratch")
            .with_property(PropertyId(1), Value::NIL)
            .with_message(message),
    );
    let mut objects = ObjectTable::new();
    let object = spawn_self_aware(&mut objects, &class);

    let mut kod = Kod::new(config);
    let result = kod.send_top_level(&mut objects, &classes, object, MessageId(1), &[]);
    let delivered = kod.deliver_posts(&mut objects, &classes);
    match result {
        Ok(value) => println!("result: {}", format::value_name(value, &classes)),
        Err(err) => println!("failed: {err}"),
    }
    if delivered > 0 {
        println!("delivered {delivered} posted messages");
    }
    print_stats(kod.stats(), &classes);
    Ok(())
}

/// Property 0 of every demo object holds the object itself.
fn spawn_self_aware(objects: &mut ObjectTable, class: &Arc<Class>) -> ObjectId {
    let id = objects.create(class);
    if let Some(property) = objects.get_mut(id).and_then(|o| o.property_mut(0)) {
        property.value = Value::object(id);
    }
    id
}

const TICK: MessageId = MessageId(1);
const COUNT: MessageId = MessageId(2);
const REPORT: MessageId = MessageId(3);
const N: ParmId = ParmId(1);

fn countdown_class() -> KodResult<Class> {
    // Tick(n = 0): Debug(n); if n { SendMessage(self, Tick, n = n - 1) }; ticks += 1
    let mut b = MessageBuilder::new(1);
    let n = b.parameter(N, Value::int(0));
    let next = b.local(0);
    b.emit_debug_line(1);
    b.emit_call(DEBUG, None, &[Operand::local(n)], &[]);
    let done = b.emit_goto_if_false(Operand::local(n));
    b.emit_debug_line(2);
    b.emit_binary(
        BinaryOp::Subtract,
        Destination::local(next),
        Operand::local(n),
        constant(Value::int(1)),
    );
    b.emit_call(
        SEND_MESSAGE,
        None,
        &[Operand::property(0), constant(Value::message(TICK))],
        &[NamedOperand {
            name: N.0,
            operand: Operand::local(next),
        }],
    );
    b.bind(done);
    b.emit_debug_line(3);
    b.emit_binary(
        BinaryOp::Add,
        Destination::property(1),
        Operand::property(1),
        constant(Value::int(1)),
    );
    b.emit_return(Operand::property(1));
    let tick = b.build(TICK, "Tick")?;

    // Count(n = 0): sum := 0; while n { sum += n; n -= 1 }; Tick(3); Post(Report); sum
    let mut b = MessageBuilder::new(1);
    let n = b.parameter(N, Value::int(0));
    let sum = b.local(0);
    b.emit_load_constant(Destination::local(sum), Value::int(0));
    let top = b.current_offset();
    let exit = b.emit_goto_if_false(Operand::local(n));
    b.emit_binary(
        BinaryOp::Add,
        Destination::local(sum),
        Operand::local(sum),
        Operand::local(n),
    );
    b.emit_binary(
        BinaryOp::Subtract,
        Destination::local(n),
        Operand::local(n),
        constant(Value::int(1)),
    );
    b.emit_goto_back(top);
    b.bind(exit);
    b.emit_call(
        SEND_MESSAGE,
        None,
        &[Operand::property(0), constant(Value::message(TICK))],
        &[NamedOperand {
            name: N.0,
            operand: constant(Value::int(3)),
        }],
    );
    b.emit_call(
        POST_MESSAGE,
        None,
        &[Operand::property(0), constant(Value::message(REPORT))],
        &[],
    );
    b.emit_return(Operand::local(sum));
    let count = b.build(COUNT, "Count")?;

    // Report(): Debug(ticks)
    let mut b = MessageBuilder::new(0);
    b.emit_call(DEBUG, None, &[Operand::property(1)], &[]);
    b.emit_return(Operand::property(1));
    let report = b.build(REPORT, "Report")?;

    Ok(Class::new(ClassId(1), "Countdown")
        .with_property(PropertyId(1), Value::NIL)
        .with_property(PropertyId(2), Value::int(0))
        .with_message(tick)
        .with_message(count)
        .with_message(report))
}

fn demo(count: i64) -> Result<(), String> {
    let mut classes = ClassTable::new();
    let class = classes.insert(countdown_class().map_err(|err| err.to_string())?);
    for message in class.messages() {
        println!("== {} ==", message.name());
        print!("{}", format::listing(message).map_err(|err| err.to_string())?);
    }

    let mut objects = ObjectTable::new();
    let object = spawn_self_aware(&mut objects, &class);
    let mut kod = Kod::new(KodConfig::default().with_profile_messages(true));

    let parms = [NamedValue::new(N, Value::int(count))];
    let result = kod
        .send_top_level(&mut objects, &classes, object, COUNT, &parms)
        .map_err(|err| err.to_string())?;
    println!("Count({count}) = {}", format::value_name(result, &classes));
    println!("posted: {}", kod.posts().len());
    kod.deliver_posts(&mut objects, &classes);

    if let Some(ticks) = objects.get(object).and_then(|o| o.property(1)) {
        println!("ticks: {}", format::value_name(ticks.value, &classes));
    }
    print_stats(kod.stats(), &classes);
    Ok(())
}

fn print_stats(stats: &KodStats, classes: &dyn ClassStore) {
    println!(
        "messages: {} ({} top level), native calls: {}, deepest stack: {}",
        stats.num_messages, stats.num_top_level_messages, stats.num_ccalls, stats.deepest_stack
    );
    println!(
        "last: {} statements, {} native calls, {} ms",
        stats.last.statements, stats.last.native_calls, stats.last.elapsed_ms
    );
    for ((class_id, message_id), profile) in stats.top_profiles(PROFILE_LIMIT) {
        let name = classes
            .class(class_id)
            .and_then(|c| c.message(message_id).map(|m| format!("{}.{}", c.name(), m.name())))
            .unwrap_or_else(|| format!("{class_id}.{message_id}"));
        println!(
            "  {name}: {} calls, {} ms total, {} ms max",
            profile.calls, profile.total_ms, profile.highest_ms
        );
    }
}
