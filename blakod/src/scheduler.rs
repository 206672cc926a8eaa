use std::collections::VecDeque;

use crate::{MessageId, NamedValue, ObjectId, PostQueueFull};

/// A send waiting for the next delivery round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedMessage {
    pub object: ObjectId,
    pub message: MessageId,
    pub parms: Vec<NamedValue>,
}

/// Bounded FIFO of deferred sends.
#[derive(Debug)]
pub struct PostQueue {
    queue: VecDeque<PostedMessage>,
    capacity: usize,
}

impl PostQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            capacity,
        }
    }

    pub fn push(&mut self, post: PostedMessage) -> Result<(), PostQueueFull> {
        if self.queue.len() >= self.capacity {
            return Err(PostQueueFull {
                capacity: self.capacity,
            });
        }
        self.queue.push_back(post);
        Ok(())
    }

    pub fn pop(&mut self) -> Option<PostedMessage> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries already queued beyond a lowered capacity stay queued.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &PostedMessage> {
        self.queue.iter()
    }
}
