//! Blakod bytecode interpreter.
//!
//! Game objects are instances of classes; classes hold message handlers as
//! compiled bytecode. [`Kod`] runs a top-level send to completion, including
//! any nested sends and native calls it makes, under a statement budget and
//! a recursion ceiling.
pub mod activation;
pub mod bytecode;
pub mod class;
pub mod config;
pub mod error;
pub mod format;
pub mod interpreter;
pub mod lookup;
pub mod message;
pub mod object;
pub mod objects;
pub mod primitives;
pub mod profiling;
pub mod scheduler;
pub mod system;
pub mod tagged;
pub mod vm;

pub use activation::{Activation, LocalFrame};
pub use bytecode::{CodeReader, MessageBuilder};
pub use class::{Class, ClassStore, ClassTable, MAX_CLASS_CHAIN, Message, Parameter};
pub use config::{
    DEFAULT_MAX_DEPTH, DEFAULT_MAX_STATEMENTS, DEFAULT_POST_QUEUE_CAPACITY, KodConfig,
    MAX_C_FUNCTION, MAX_C_PARMS, MAX_LOCALS, MAX_NAME_PARMS,
};
pub use error::{ErrorClass, KodError, KodResult, PostQueueFull};
pub use interpreter::{Interpreter, Return};
pub use message::NamedValue;
pub use object::{ClassId, MessageId, Object, ObjectId, ParmId, Property, PropertyId};
pub use objects::{ObjectStore, ObjectTable};
pub use primitives::{NativeCall, NativeDesc, NativeFn, NativeTable, standard_natives};
pub use profiling::{InvocationStats, KodStats, MessageProfile, SlowestSend};
pub use scheduler::{PostQueue, PostedMessage};
pub use system::{Clock, ManualClock, SystemClock};
pub use tagged::{Tag, Value};
pub use vm::Kod;

/// Log targets. Filter them with `RUST_LOG`, e.g.
/// `RUST_LOG=blakod::bad_kod=warn,blakod::trace=off`.
pub mod channel {
    /// Interpreter faults: malformed bytecode, limits, failed lookups.
    pub const ERROR: &str = "blakod::error";
    /// Script-level mistakes worth a warning but not an abort.
    pub const BAD_KOD: &str = "blakod::bad_kod";
    /// Output of the `Debug` native and swallowed nested failures.
    pub const DEBUG: &str = "blakod::debug";
    /// Per-opcode and per-send tracing.
    pub const TRACE: &str = "blakod::trace";
}
