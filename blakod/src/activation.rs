use crate::{ClassId, KodError, KodResult, MAX_LOCALS, MessageId, ObjectId, Value};

/// Locals of one running message. Capacity is fixed at [`MAX_LOCALS`]; only
/// the first `len` slots are addressable.
///
/// A frame built with [`LocalFrame::unwritten`] remembers which slots have
/// not been stored to yet. Slot contents are never used as the marker, so
/// every storable value reads back unchanged.
#[derive(Debug, Clone)]
pub struct LocalFrame {
    values: [Value; MAX_LOCALS],
    len: usize,
    /// Bit `i` set while slot `i` has not been written.
    unwritten: u64,
}

const _: () = assert!(MAX_LOCALS <= u64::BITS as usize);

impl LocalFrame {
    /// A frame of `len` nil locals.
    pub fn new(len: usize) -> KodResult<Self> {
        if len > MAX_LOCALS {
            return Err(KodError::TooManyLocals {
                requested: len,
                max: MAX_LOCALS,
            });
        }
        Ok(Self {
            values: [Value::NIL; MAX_LOCALS],
            len,
            unwritten: 0,
        })
    }

    /// A frame of `len` nil locals, each flagged until first written.
    pub fn unwritten(len: usize) -> KodResult<Self> {
        let mut frame = Self::new(len)?;
        frame.unwritten = if len == 0 { 0 } else { u64::MAX >> (u64::BITS as usize - len) };
        Ok(frame)
    }

    /// True when slot `index` is flagged and has not been stored to.
    #[inline(always)]
    pub fn is_unwritten(&self, index: u32) -> bool {
        (index as usize) < self.len && self.unwritten & (1 << index) != 0
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline(always)]
    pub fn as_slice(&self) -> &[Value] {
        &self.values[..self.len]
    }

    #[inline(always)]
    pub fn get(&self, index: u32) -> KodResult<Value> {
        self.as_slice()
            .get(index as usize)
            .copied()
            .ok_or(KodError::LocalOutOfRange {
                index,
                count: self.len,
            })
    }

    #[inline(always)]
    pub fn set(&mut self, index: u32, value: Value) -> KodResult<()> {
        let count = self.len;
        match self.values[..count].get_mut(index as usize) {
            Some(slot) => {
                *slot = value;
                self.unwritten &= !(1 << index);
                Ok(())
            }
            None => Err(KodError::LocalOutOfRange { index, count }),
        }
    }
}

/// One entry of the message call stack, kept for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Activation {
    pub object: ObjectId,
    /// Class whose handler is running, which may be a superclass of the
    /// object's class.
    pub class: ClassId,
    pub message: MessageId,
    pub line: u32,
}

impl Activation {
    pub fn new(object: ObjectId, class: ClassId, message: MessageId) -> Self {
        Self {
            object,
            class,
            message,
            line: 0,
        }
    }
}
