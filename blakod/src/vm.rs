use crate::primitives::standard_natives;
use crate::{
    ClassStore, Clock, InvocationStats, Interpreter, KodConfig, KodResult,
    KodStats, MessageId, NamedValue, NativeTable, ObjectId, ObjectStore,
    PostQueue, PostQueueFull, PostedMessage, SystemClock, Value, channel,
};

/// The interpreter engine: configuration, native functions, statistics and
/// the post queue. Objects and classes are owned by the host and lent for
/// each top-level send.
///
/// Nested sends grow the native stack on demand, so any thread can run the
/// full recursion ceiling.
pub struct Kod {
    config: KodConfig,
    natives: NativeTable,
    stats: KodStats,
    posts: PostQueue,
    clock: Box<dyn Clock>,
}

impl Kod {
    pub fn new(config: KodConfig) -> Self {
        Self::with_clock(config, Box::new(SystemClock::new()))
    }

    pub fn with_clock(config: KodConfig, clock: Box<dyn Clock>) -> Self {
        let posts = PostQueue::new(config.post_queue_capacity);
        Self {
            config,
            natives: standard_natives(),
            stats: KodStats::new(),
            posts,
            clock,
        }
    }

    pub fn config(&self) -> &KodConfig {
        &self.config
    }

    /// Changes apply from the next top-level send.
    pub fn config_mut(&mut self) -> &mut KodConfig {
        &mut self.config
    }

    pub fn natives(&self) -> &NativeTable {
        &self.natives
    }

    pub fn natives_mut(&mut self) -> &mut NativeTable {
        &mut self.natives
    }

    pub fn stats(&self) -> &KodStats {
        &self.stats
    }

    pub fn stats_mut(&mut self) -> &mut KodStats {
        &mut self.stats
    }

    pub fn posts(&self) -> &PostQueue {
        &self.posts
    }

    pub fn clock(&self) -> &dyn Clock {
        &*self.clock
    }

    /// Runs `message` on `object` as a new top-level invocation with a fresh
    /// statement budget. Failures have already been reported when this
    /// returns.
    pub fn send_top_level(
        &mut self,
        objects: &mut dyn ObjectStore,
        classes: &dyn ClassStore,
        object: ObjectId,
        message: MessageId,
        parms: &[NamedValue],
    ) -> KodResult<Value> {
        self.posts.set_capacity(self.config.post_queue_capacity);
        self.stats.begin_top_level(&self.config);
        let started = self.clock.milli_count();

        let mut interp = Interpreter::new(
            objects,
            classes,
            &self.natives,
            &self.config,
            &mut self.stats,
            &mut self.posts,
            &*self.clock,
        );
        let result = interp.dispatch(object, message, parms);
        let statements = interp.statements();
        let native_calls = interp.native_calls();
        drop(interp);

        let elapsed_ms = self.clock.milli_count().saturating_sub(started);
        self.stats.end_top_level(object, message, InvocationStats {
            statements,
            native_calls,
            elapsed_ms,
        });
        log::trace!(
            target: channel::TRACE,
            "top level {message} to {object}: {statements} statements, {elapsed_ms} ms"
        );
        result
    }

    /// Queues a send for [`Kod::deliver_posts`].
    pub fn post_message(
        &mut self,
        object: ObjectId,
        message: MessageId,
        parms: Vec<NamedValue>,
    ) -> Result<(), PostQueueFull> {
        self.posts.push(PostedMessage {
            object,
            message,
            parms,
        })
    }

    /// Delivers the posts queued so far, each as its own top-level send.
    /// Posts made during delivery wait for the next call. Returns how many
    /// were delivered.
    pub fn deliver_posts(
        &mut self,
        objects: &mut dyn ObjectStore,
        classes: &dyn ClassStore,
    ) -> usize {
        let pending = self.posts.len();
        let mut delivered = 0;
        for _ in 0..pending {
            let Some(post) = self.posts.pop() else {
                break;
            };
            if let Err(err) = self.send_top_level(
                objects,
                classes,
                post.object,
                post.message,
                &post.parms,
            ) {
                log::debug!(
                    target: channel::DEBUG,
                    "post of {} to {} failed: {err}",
                    post.message,
                    post.object
                );
            }
            delivered += 1;
        }
        delivered
    }
}
