use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::{Class, ClassStore, Value};

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[repr(transparent)]
        #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u32> for $name {
            fn from(value: u32) -> Self {
                Self(value)
            }
        }
    };
}

numeric_id!(
    /// Identity of a live object in the object table
    ObjectId
);
numeric_id!(ClassId);
numeric_id!(MessageId);
numeric_id!(
    /// Identity of a property slot, stable across class reloads
    PropertyId
);
numeric_id!(
    /// Name of a message parameter
    ParmId
);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Property {
    pub id: PropertyId,
    pub value: Value,
}

/// An instance living in the object table.
///
/// `class_cache` is a non-owning shortcut to the class record. It either is
/// empty or points at the class whose id equals `class_id`; a cache that fails
/// that check is ignored and refreshed through the class directory.
#[derive(Debug)]
pub struct Object {
    id: ObjectId,
    class_id: ClassId,
    class_cache: Mutex<Weak<Class>>,
    deleted: bool,
    garbage_ref: u32,
    properties: Vec<Property>,
}

impl Object {
    /// Creates an instance with the class's property defaults.
    pub fn new(id: ObjectId, class: &Arc<Class>) -> Self {
        Self {
            id,
            class_id: class.id(),
            class_cache: Mutex::new(Arc::downgrade(class)),
            deleted: false,
            garbage_ref: 0,
            properties: class.property_defaults().to_vec(),
        }
    }

    /// An instance that only knows its class id, with an empty cache.
    pub fn detached(id: ObjectId, class_id: ClassId, properties: Vec<Property>) -> Self {
        Self {
            id,
            class_id,
            class_cache: Mutex::new(Weak::new()),
            deleted: false,
            garbage_ref: 0,
            properties,
        }
    }

    #[inline]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    #[inline]
    pub fn class_id(&self) -> ClassId {
        self.class_id
    }

    /// Moves the object to another class. Properties are left alone.
    pub fn set_class_id(&mut self, class_id: ClassId) {
        self.class_id = class_id;
        *self.class_cache.get_mut() = Weak::new();
    }

    #[inline]
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub fn mark_deleted(&mut self) {
        self.deleted = true;
    }

    #[inline]
    pub fn garbage_ref(&self) -> u32 {
        self.garbage_ref
    }

    pub fn set_garbage_ref(&mut self, value: u32) {
        self.garbage_ref = value;
    }

    #[inline]
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    #[inline]
    pub fn property(&self, index: u32) -> Option<&Property> {
        self.properties.get(index as usize)
    }

    #[inline]
    pub fn property_mut(&mut self, index: u32) -> Option<&mut Property> {
        self.properties.get_mut(index as usize)
    }

    /// The cached class, if it is still alive and still the object's class.
    pub fn cached_class(&self) -> Option<Arc<Class>> {
        let class = self.class_cache.lock().upgrade()?;
        (class.id() == self.class_id).then_some(class)
    }

    pub fn invalidate_class_cache(&self) {
        *self.class_cache.lock() = Weak::new();
    }

    /// Resolves the object's class, preferring the cache and refreshing it
    /// from `classes` on a miss.
    pub fn resolve_class(&self, classes: &dyn ClassStore) -> Option<Arc<Class>> {
        if let Some(class) = self.cached_class() {
            return Some(class);
        }
        let class = classes.class(self.class_id)?;
        *self.class_cache.lock() = Arc::downgrade(&class);
        Some(class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClassTable;

    fn table_with(class: Class) -> (ClassTable, Arc<Class>) {
        let mut table = ClassTable::new();
        let class = table.insert(class);
        (table, class)
    }

    #[test]
    fn new_object_copies_property_defaults() {
        let (_, class) = table_with(
            Class::new(ClassId(1), "Thing")
                .with_property(PropertyId(10), Value::int(5))
                .with_property(PropertyId(11), Value::NIL),
        );
        let object = Object::new(ObjectId(0), &class);
        assert_eq!(object.properties().len(), 2);
        assert_eq!(object.property(0).unwrap().value, Value::int(5));
        assert_eq!(object.property(1).unwrap().id, PropertyId(11));
        assert!(object.property(2).is_none());
    }

    #[test]
    fn cache_hit_uses_cached_class() {
        let (table, class) = table_with(Class::new(ClassId(1), "Thing"));
        let object = Object::new(ObjectId(0), &class);
        assert!(Arc::ptr_eq(&object.cached_class().unwrap(), &class));
        assert!(Arc::ptr_eq(&object.resolve_class(&table).unwrap(), &class));
    }

    #[test]
    fn empty_cache_is_refreshed_from_directory() {
        let (table, class) = table_with(Class::new(ClassId(1), "Thing"));
        let object = Object::detached(ObjectId(0), ClassId(1), Vec::new());
        assert!(object.cached_class().is_none());
        let resolved = object.resolve_class(&table).unwrap();
        assert!(Arc::ptr_eq(&resolved, &class));
        assert!(object.cached_class().is_some());
    }

    #[test]
    fn reloaded_class_replaces_stale_cache() {
        let (mut table, old) = table_with(Class::new(ClassId(1), "Thing"));
        let object = Object::new(ObjectId(0), &old);
        drop(old);
        let new = table.insert(Class::new(ClassId(1), "Thing"));
        // the table held the only strong reference to the old class
        assert!(object.cached_class().is_none());
        assert!(Arc::ptr_eq(&object.resolve_class(&table).unwrap(), &new));
    }

    #[test]
    fn cache_for_other_class_is_ignored() {
        let mut table = ClassTable::new();
        let first = table.insert(Class::new(ClassId(1), "First"));
        let second = table.insert(Class::new(ClassId(2), "Second"));
        let mut object = Object::new(ObjectId(0), &first);
        object.class_id = ClassId(2);
        assert!(object.cached_class().is_none());
        assert!(Arc::ptr_eq(&object.resolve_class(&table).unwrap(), &second));
    }

    #[test]
    fn set_class_id_clears_cache() {
        let mut table = ClassTable::new();
        let first = table.insert(Class::new(ClassId(1), "First"));
        table.insert(Class::new(ClassId(2), "Second"));
        let mut object = Object::new(ObjectId(0), &first);
        object.set_class_id(ClassId(2));
        assert!(object.cached_class().is_none());
        assert_eq!(object.resolve_class(&table).unwrap().id(), ClassId(2));
    }

    #[test]
    fn unknown_class_resolves_to_none() {
        let table = ClassTable::new();
        let object = Object::detached(ObjectId(0), ClassId(9), Vec::new());
        assert!(object.resolve_class(&table).is_none());
    }
}
