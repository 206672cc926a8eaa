use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::{
    ClassId, CodeReader, KodError, KodResult, MAX_LOCALS, MessageId, ParmId,
    Property, PropertyId, Value,
};

/// Superclass chains longer than this are treated as cyclic.
pub const MAX_CLASS_CHAIN: usize = 256;

/// A declared message parameter and the value it takes when not passed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub id: ParmId,
    pub default: Value,
}

/// A compiled message handler.
///
/// Body layout: `[num_locals u8][num_parms u8]`, then per parameter
/// `[parm_id u32][default u32]`, then the instructions. Branch targets are
/// offsets from the start of the body.
#[derive(Debug)]
pub struct Message {
    id: MessageId,
    name: String,
    body: Arc<[u8]>,
    num_locals: usize,
    parameters: Vec<Parameter>,
    code_start: usize,
}

impl Message {
    pub fn new(
        id: MessageId,
        name: impl Into<String>,
        body: impl Into<Arc<[u8]>>,
    ) -> KodResult<Self> {
        let body = body.into();
        let mut reader = CodeReader::new(&body);
        let num_locals = reader.read_u8()? as usize;
        let num_parms = reader.read_u8()? as usize;
        if num_locals + num_parms > MAX_LOCALS {
            return Err(KodError::TooManyLocals {
                requested: num_locals + num_parms,
                max: MAX_LOCALS,
            });
        }
        let mut parameters = Vec::with_capacity(num_parms);
        for _ in 0..num_parms {
            let id = ParmId(reader.read_u32()?);
            let default = Value::from_constant(reader.read_u32()?);
            parameters.push(Parameter { id, default });
        }
        let code_start = reader.offset();
        Ok(Self {
            id,
            name: name.into(),
            body,
            num_locals,
            parameters,
            code_start,
        })
    }

    #[inline]
    pub fn id(&self) -> MessageId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Offset of the first instruction.
    #[inline]
    pub fn code_start(&self) -> usize {
        self.code_start
    }

    #[inline]
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Plain locals, not counting parameters.
    #[inline]
    pub fn num_locals(&self) -> usize {
        self.num_locals
    }

    #[inline]
    pub fn frame_size(&self) -> usize {
        self.num_locals + self.parameters.len()
    }
}

#[derive(Debug)]
pub struct Class {
    id: ClassId,
    name: String,
    super_id: Option<ClassId>,
    vars: RwLock<Vec<Value>>,
    property_defaults: Vec<Property>,
    messages: FxHashMap<MessageId, Arc<Message>>,
}

impl Class {
    pub fn new(id: ClassId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            super_id: None,
            vars: RwLock::new(Vec::new()),
            property_defaults: Vec::new(),
            messages: FxHashMap::default(),
        }
    }

    pub fn with_super(mut self, super_id: ClassId) -> Self {
        self.super_id = Some(super_id);
        self
    }

    pub fn with_class_var(self, value: Value) -> Self {
        self.vars.write().push(value);
        self
    }

    pub fn with_property(mut self, id: PropertyId, value: Value) -> Self {
        self.property_defaults.push(Property { id, value });
        self
    }

    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.insert(message.id(), Arc::new(message));
        self
    }

    #[inline]
    pub fn id(&self) -> ClassId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn super_id(&self) -> Option<ClassId> {
        self.super_id
    }

    #[inline]
    pub fn property_defaults(&self) -> &[Property] {
        &self.property_defaults
    }

    #[inline]
    pub fn num_properties(&self) -> usize {
        self.property_defaults.len()
    }

    pub fn num_class_vars(&self) -> usize {
        self.vars.read().len()
    }

    pub fn class_var(&self, index: u32) -> Option<Value> {
        self.vars.read().get(index as usize).copied()
    }

    /// Writes a class variable shared by every instance. Returns `false` when
    /// `index` is out of range.
    pub fn set_class_var(&self, index: u32, value: Value) -> bool {
        match self.vars.write().get_mut(index as usize) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Handler defined on this class itself, ignoring superclasses.
    pub fn message(&self, id: MessageId) -> Option<&Arc<Message>> {
        self.messages.get(&id)
    }

    pub fn messages(&self) -> impl Iterator<Item = &Arc<Message>> {
        self.messages.values()
    }
}

/// The class directory.
pub trait ClassStore {
    fn class(&self, id: ClassId) -> Option<Arc<Class>>;

    fn class_by_name(&self, name: &str) -> Option<Arc<Class>>;

    /// Finds the handler for `message` starting at `class` and walking up the
    /// superclass chain. The most derived definition wins.
    fn find_message(
        &self,
        class: ClassId,
        message: MessageId,
    ) -> Option<(Arc<Class>, Arc<Message>)> {
        let mut current = Some(class);
        for _ in 0..MAX_CLASS_CHAIN {
            let class = self.class(current?)?;
            if let Some(handler) = class.message(message) {
                let handler = handler.clone();
                return Some((class, handler));
            }
            current = class.super_id();
        }
        None
    }
}

#[derive(Debug, Default)]
pub struct ClassTable {
    classes: FxHashMap<ClassId, Arc<Class>>,
    names: FxHashMap<String, ClassId>,
}

impl ClassTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a class. Objects holding a cache to a replaced
    /// class pick up the new record on their next lookup.
    pub fn insert(&mut self, class: Class) -> Arc<Class> {
        let class = Arc::new(class);
        if let Some(old) = self.classes.insert(class.id(), class.clone()) {
            if old.name() != class.name() {
                self.names.remove(old.name());
            }
        }
        self.names.insert(class.name().to_owned(), class.id());
        class
    }

    pub fn remove(&mut self, id: ClassId) -> Option<Arc<Class>> {
        let class = self.classes.remove(&id)?;
        self.names.remove(class.name());
        Some(class)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl ClassStore for ClassTable {
    fn class(&self, id: ClassId) -> Option<Arc<Class>> {
        self.classes.get(&id).cloned()
    }

    fn class_by_name(&self, name: &str) -> Option<Arc<Class>> {
        let id = self.names.get(name)?;
        self.class(*id)
    }
}
