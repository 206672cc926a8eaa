use std::sync::Arc;

use crate::{Class, Object, ObjectId};

/// The object directory the interpreter reads and writes through.
///
/// Deleted objects are not returned.
pub trait ObjectStore {
    fn get(&self, id: ObjectId) -> Option<&Object>;

    fn get_mut(&mut self, id: ObjectId) -> Option<&mut Object>;
}

/// Objects indexed by id. Ids are handed out in order and never reused.
#[derive(Debug, Default)]
pub struct ObjectTable {
    objects: Vec<Object>,
}

impl ObjectTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            objects: Vec::with_capacity(capacity),
        }
    }

    /// Creates an instance of `class` and returns its id.
    pub fn create(&mut self, class: &Arc<Class>) -> ObjectId {
        let id = ObjectId(self.objects.len() as u32);
        self.objects.push(Object::new(id, class));
        id
    }

    /// Marks an object deleted. Returns `false` when it was already gone.
    pub fn delete(&mut self, id: ObjectId) -> bool {
        match self.get_mut(id) {
            Some(object) => {
                object.mark_deleted();
                true
            }
            None => false,
        }
    }

    /// Slots ever allocated, deleted ones included.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Object> {
        self.objects.iter().filter(|o| !o.is_deleted())
    }
}

impl ObjectStore for ObjectTable {
    #[inline]
    fn get(&self, id: ObjectId) -> Option<&Object> {
        self.objects
            .get(id.0 as usize)
            .filter(|o| !o.is_deleted())
    }

    #[inline]
    fn get_mut(&mut self, id: ObjectId) -> Option<&mut Object> {
        self.objects
            .get_mut(id.0 as usize)
            .filter(|o| !o.is_deleted())
    }
}
