//! Value: one 64-bit word, 4-bit tag in the top nibble, 60-bit signed payload
//!
//! Packed constants: the 32-bit form used inside bytecode, 4-bit tag in the top
//! nibble and a 28-bit payload. Int payloads are sign-extended when widened,
//! every other tag is zero-extended.
use std::fmt;

use crate::{ClassId, MessageId, ObjectId};

pub const TAG_SHIFT: u32 = 60;
pub const PAYLOAD_BITS: u32 = 60;
pub const PAYLOAD_MASK: u64 = (1 << PAYLOAD_BITS) - 1;

pub const CONSTANT_TAG_SHIFT: u32 = 28;
pub const CONSTANT_PAYLOAD_MASK: u32 = (1 << CONSTANT_TAG_SHIFT) - 1;

pub const MAX_INT: i64 = (1 << (PAYLOAD_BITS - 1)) - 1;
pub const MIN_INT: i64 = -(1 << (PAYLOAD_BITS - 1));

#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    Nil = 0,
    Int = 1,
    Object = 2,
    List = 3,
    Resource = 4,
    Timer = 5,
    Session = 6,
    RoomData = 7,
    TempString = 8,
    String = 9,
    Class = 10,
    Message = 11,
    DebugStr = 12,
    Table = 13,
    Override = 14,
    Invalid = 15,
}

impl Tag {
    pub const COUNT: usize = 16;

    /// Every nibble names a tag, so only the low four bits are looked at.
    #[inline(always)]
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0xF {
            0 => Tag::Nil,
            1 => Tag::Int,
            2 => Tag::Object,
            3 => Tag::List,
            4 => Tag::Resource,
            5 => Tag::Timer,
            6 => Tag::Session,
            7 => Tag::RoomData,
            8 => Tag::TempString,
            9 => Tag::String,
            10 => Tag::Class,
            11 => Tag::Message,
            12 => Tag::DebugStr,
            13 => Tag::Table,
            14 => Tag::Override,
            _ => Tag::Invalid,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Tag::Nil => "NIL",
            Tag::Int => "INT",
            Tag::Object => "OBJECT",
            Tag::List => "LIST",
            Tag::Resource => "RESOURCE",
            Tag::Timer => "TIMER",
            Tag::Session => "SESSION",
            Tag::RoomData => "ROOM_DATA",
            Tag::TempString => "TEMP_STRING",
            Tag::String => "STRING",
            Tag::Class => "CLASS",
            Tag::Message => "MESSAGE",
            Tag::DebugStr => "DEBUG_STRING",
            Tag::Table => "TABLE",
            Tag::Override => "OVERRIDE",
            Tag::Invalid => "INVALID",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A tagged script value
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Value(u64);

impl Value {
    pub const NIL: Value = Value(0);

    /// Builds a value, keeping the low 60 bits of `payload`.
    #[inline(always)]
    pub const fn new(tag: Tag, payload: i64) -> Self {
        Self(((tag as u64) << TAG_SHIFT) | (payload as u64 & PAYLOAD_MASK))
    }

    #[inline(always)]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[inline(always)]
    pub const fn raw(self) -> u64 {
        self.0
    }

    #[inline(always)]
    pub const fn int(value: i64) -> Self {
        Self::new(Tag::Int, value)
    }

    #[inline(always)]
    pub const fn bool(value: bool) -> Self {
        Self::int(value as i64)
    }

    #[inline(always)]
    pub const fn object(id: ObjectId) -> Self {
        Self::new(Tag::Object, id.0 as i64)
    }

    #[inline(always)]
    pub const fn class(id: ClassId) -> Self {
        Self::new(Tag::Class, id.0 as i64)
    }

    #[inline(always)]
    pub const fn message(id: MessageId) -> Self {
        Self::new(Tag::Message, id.0 as i64)
    }

    #[inline(always)]
    pub const fn tag(self) -> Tag {
        Tag::from_bits((self.0 >> TAG_SHIFT) as u8)
    }

    /// Payload sign-extended from 60 bits.
    #[inline(always)]
    pub const fn payload(self) -> i64 {
        ((self.0 << (64 - PAYLOAD_BITS)) as i64) >> (64 - PAYLOAD_BITS)
    }

    #[inline(always)]
    pub const fn is_nil(self) -> bool {
        matches!(self.tag(), Tag::Nil)
    }

    #[inline(always)]
    pub const fn is_int(self) -> bool {
        matches!(self.tag(), Tag::Int)
    }

    /// Any non-zero payload is true, whatever the tag.
    #[inline(always)]
    pub const fn is_truthy(self) -> bool {
        self.payload() != 0
    }

    #[inline(always)]
    pub const fn as_int(self) -> Option<i64> {
        match self.tag() {
            Tag::Int => Some(self.payload()),
            _ => None,
        }
    }

    pub fn as_object(self) -> Option<ObjectId> {
        match self.tag() {
            Tag::Object => u32::try_from(self.payload()).ok().map(ObjectId),
            _ => None,
        }
    }

    pub fn as_message(self) -> Option<MessageId> {
        match self.tag() {
            Tag::Message => u32::try_from(self.payload()).ok().map(MessageId),
            _ => None,
        }
    }

    pub fn as_class(self) -> Option<ClassId> {
        match self.tag() {
            Tag::Class => u32::try_from(self.payload()).ok().map(ClassId),
            _ => None,
        }
    }

    /// Widens a packed bytecode constant.
    #[inline(always)]
    pub const fn from_constant(constant: u32) -> Self {
        let tag = Tag::from_bits((constant >> CONSTANT_TAG_SHIFT) as u8);
        let low = constant & CONSTANT_PAYLOAD_MASK;
        let payload = match tag {
            Tag::Int => (((low << 4) as i32) >> 4) as i64,
            _ => low as i64,
        };
        Self::new(tag, payload)
    }

    /// Narrows to a packed bytecode constant, `None` when the payload does not
    /// fit in 28 bits.
    pub const fn to_constant(self) -> Option<u32> {
        let tag = self.tag();
        let payload = self.payload();
        let fits = match tag {
            Tag::Int => payload >= -(1 << 27) && payload < (1 << 27),
            _ => payload >= 0 && payload <= CONSTANT_PAYLOAD_MASK as i64,
        };
        if !fits {
            return None;
        }
        Some(
            ((tag as u32) << CONSTANT_TAG_SHIFT)
                | (payload as u32 & CONSTANT_PAYLOAD_MASK),
        )
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::NIL
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value({} {})", self.tag().name(), self.payload())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tag() {
            Tag::Nil => f.write_str("$"),
            tag => write!(f, "{} {}", tag.name(), self.payload()),
        }
    }
}
