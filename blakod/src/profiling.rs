use rustc_hash::FxHashMap;

use crate::{ClassId, KodConfig, MAX_C_FUNCTION, MessageId, ObjectId};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MessageProfile {
    pub calls: u64,
    pub total_ms: u64,
    pub highest_ms: u64,
}

/// The slowest top-level send seen so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlowestSend {
    pub elapsed_ms: u64,
    pub object: ObjectId,
    pub message: MessageId,
}

/// Counters of the most recent top-level send.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InvocationStats {
    pub statements: u64,
    pub native_calls: u64,
    pub elapsed_ms: u64,
}

/// Interpreter counters. Only observed, never consulted by execution except
/// for `debug_initlocals`.
#[derive(Debug, Clone)]
pub struct KodStats {
    pub num_messages: u64,
    pub num_top_level_messages: u64,
    pub num_interpreted: u64,
    pub num_ccalls: u64,
    pub interpreting_time_ms: u64,
    pub slowest: Option<SlowestSend>,
    pub deepest_stack: usize,
    pub last: InvocationStats,
    /// Copy of the config toggle, refreshed when a top-level send starts.
    pub debug_initlocals: bool,
    ccall_counts: Vec<u64>,
    profiles: FxHashMap<(ClassId, MessageId), MessageProfile>,
}

impl Default for KodStats {
    fn default() -> Self {
        Self {
            num_messages: 0,
            num_top_level_messages: 0,
            num_interpreted: 0,
            num_ccalls: 0,
            interpreting_time_ms: 0,
            slowest: None,
            deepest_stack: 0,
            last: InvocationStats::default(),
            debug_initlocals: false,
            ccall_counts: vec![0; MAX_C_FUNCTION],
            profiles: FxHashMap::default(),
        }
    }
}

impl KodStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn begin_top_level(&mut self, config: &KodConfig) {
        self.debug_initlocals = config.debug_initlocals;
        self.num_top_level_messages += 1;
    }

    pub fn end_top_level(
        &mut self,
        object: ObjectId,
        message: MessageId,
        last: InvocationStats,
    ) {
        self.last = last;
        self.num_interpreted += last.statements;
        self.interpreting_time_ms += last.elapsed_ms;
        let slower = self.slowest.is_none_or(|s| last.elapsed_ms > s.elapsed_ms);
        if slower {
            self.slowest = Some(SlowestSend {
                elapsed_ms: last.elapsed_ms,
                object,
                message,
            });
        }
    }

    pub fn record_message(&mut self, depth: usize) {
        self.num_messages += 1;
        self.deepest_stack = self.deepest_stack.max(depth);
    }

    #[inline]
    pub fn record_native(&mut self, index: u8) {
        self.num_ccalls += 1;
        self.ccall_counts[index as usize] += 1;
    }

    pub fn native_calls(&self, index: u8) -> u64 {
        self.ccall_counts[index as usize]
    }

    pub fn record_profile(&mut self, class: ClassId, message: MessageId, elapsed_ms: u64) {
        let profile = self.profiles.entry((class, message)).or_default();
        profile.calls += 1;
        profile.total_ms += elapsed_ms;
        profile.highest_ms = profile.highest_ms.max(elapsed_ms);
    }

    pub fn profile(&self, class: ClassId, message: MessageId) -> Option<&MessageProfile> {
        self.profiles.get(&(class, message))
    }

    /// Profiles ordered by total time, then call count, most expensive
    /// first.
    pub fn top_profiles(&self, limit: usize) -> Vec<((ClassId, MessageId), MessageProfile)> {
        let mut all: Vec<_> = self.profiles.iter().map(|(k, v)| (*k, *v)).collect();
        all.sort_by(|a, b| {
            b.1.total_ms
                .cmp(&a.1.total_ms)
                .then(b.1.calls.cmp(&a.1.calls))
                .then(a.0.cmp(&b.0))
        });
        all.truncate(limit);
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_level_refreshes_debug_flag() {
        let mut stats = KodStats::new();
        stats.begin_top_level(&KodConfig::default().with_debug_initlocals(true));
        assert!(stats.debug_initlocals);
        stats.begin_top_level(&KodConfig::default());
        assert!(!stats.debug_initlocals);
        assert_eq!(stats.num_top_level_messages, 2);
    }

    #[test]
    fn slowest_send_is_kept() {
        let mut stats = KodStats::new();
        let run = |ms| InvocationStats {
            statements: 3,
            native_calls: 0,
            elapsed_ms: ms,
        };
        stats.end_top_level(ObjectId(1), MessageId(1), run(5));
        stats.end_top_level(ObjectId(2), MessageId(2), run(9));
        stats.end_top_level(ObjectId(3), MessageId(3), run(7));
        assert_eq!(stats.slowest.unwrap().object, ObjectId(2));
        assert_eq!(stats.num_interpreted, 9);
        assert_eq!(stats.interpreting_time_ms, 21);
        assert_eq!(stats.last.elapsed_ms, 7);
    }

    #[test]
    fn native_counts_per_index() {
        let mut stats = KodStats::new();
        stats.record_native(3);
        stats.record_native(3);
        stats.record_native(255);
        assert_eq!(stats.native_calls(3), 2);
        assert_eq!(stats.native_calls(255), 1);
        assert_eq!(stats.num_ccalls, 3);
    }

    #[test]
    fn profiles_sort_by_cost() {
        let mut stats = KodStats::new();
        stats.record_profile(ClassId(1), MessageId(1), 2);
        stats.record_profile(ClassId(1), MessageId(2), 10);
        stats.record_profile(ClassId(1), MessageId(1), 3);
        let top = stats.top_profiles(1);
        assert_eq!(top[0].0, (ClassId(1), MessageId(2)));
        let p = stats.profile(ClassId(1), MessageId(1)).unwrap();
        assert_eq!((p.calls, p.total_ms, p.highest_ms), (2, 5, 3));
    }
}
