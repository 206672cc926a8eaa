/// Most locals (parameters included) one message frame can hold.
pub const MAX_LOCALS: usize = 50;
/// Most positional parameters one native call can pass.
pub const MAX_C_PARMS: usize = 40;
/// Most named parameters one call or send can pass.
pub const MAX_NAME_PARMS: usize = 45;
/// Size of the native function table.
pub const MAX_C_FUNCTION: usize = 256;

pub const DEFAULT_MAX_STATEMENTS: u64 = 50_000;
pub const DEFAULT_MAX_DEPTH: usize = 2000;
pub const DEFAULT_POST_QUEUE_CAPACITY: usize = 1000;

/// Runtime knobs of the interpreter. Changes apply from the next top-level
/// send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KodConfig {
    /// Opcodes one top-level send may execute, nested sends included.
    pub max_statements: u64,
    /// Deepest message call stack.
    pub max_depth: usize,
    pub post_queue_capacity: usize,
    /// Track never-written locals and warn when one is read.
    pub debug_initlocals: bool,
    /// Keep per-message call counts and timings.
    pub profile_messages: bool,
    /// Log every executed instruction at trace level.
    pub trace_opcodes: bool,
}

impl Default for KodConfig {
    fn default() -> Self {
        Self {
            max_statements: DEFAULT_MAX_STATEMENTS,
            max_depth: DEFAULT_MAX_DEPTH,
            post_queue_capacity: DEFAULT_POST_QUEUE_CAPACITY,
            debug_initlocals: false,
            profile_messages: false,
            trace_opcodes: false,
        }
    }
}

impl KodConfig {
    pub fn with_max_statements(mut self, max_statements: u64) -> Self {
        self.max_statements = max_statements;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_post_queue_capacity(mut self, capacity: usize) -> Self {
        self.post_queue_capacity = capacity;
        self
    }

    pub fn with_debug_initlocals(mut self, enabled: bool) -> Self {
        self.debug_initlocals = enabled;
        self
    }

    pub fn with_profile_messages(mut self, enabled: bool) -> Self {
        self.profile_messages = enabled;
        self
    }

    pub fn with_trace_opcodes(mut self, enabled: bool) -> Self {
        self.trace_opcodes = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = KodConfig::default();
        assert_eq!(config.max_depth, 2000);
        assert_eq!(config.max_statements, DEFAULT_MAX_STATEMENTS);
        assert!(!config.debug_initlocals);
    }

    #[test]
    fn builders_chain() {
        let config = KodConfig::default()
            .with_max_depth(3)
            .with_max_statements(10)
            .with_debug_initlocals(true);
        assert_eq!(config.max_depth, 3);
        assert_eq!(config.max_statements, 10);
        assert!(config.debug_initlocals);
    }
}
