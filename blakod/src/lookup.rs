//! Operand resolution: reading and writing locals, properties, class
//! variables and constants on behalf of a running message.
//!
//! The object is named either by id or by an already resolved record. Both
//! forms give the same answers; the object is only looked up for kinds that
//! need it.
use crate::bytecode::OperandKind;
use crate::{
    ClassStore, KodError, KodResult, LocalFrame, Object, ObjectId, ObjectStore,
    Value,
};

/// Read access to the object a message runs on.
#[derive(Clone, Copy)]
pub enum ObjectRef<'a> {
    Lookup(&'a dyn ObjectStore, ObjectId),
    Resolved(&'a Object),
}

impl<'a> ObjectRef<'a> {
    pub fn resolve(self) -> KodResult<&'a Object> {
        match self {
            ObjectRef::Lookup(objects, id) => {
                objects.get(id).ok_or(KodError::UnknownObject(id))
            }
            ObjectRef::Resolved(object) => Ok(object),
        }
    }
}

/// Write access to the object a message runs on.
pub enum ObjectMut<'a> {
    Lookup(&'a mut dyn ObjectStore, ObjectId),
    Resolved(&'a mut Object),
}

impl<'a> ObjectMut<'a> {
    pub fn resolve(self) -> KodResult<&'a mut Object> {
        match self {
            ObjectMut::Lookup(objects, id) => {
                objects.get_mut(id).ok_or(KodError::UnknownObject(id))
            }
            ObjectMut::Resolved(object) => Ok(object),
        }
    }
}

pub fn retrieve(
    object: ObjectRef<'_>,
    classes: &dyn ClassStore,
    frame: &LocalFrame,
    kind: OperandKind,
    data: u32,
) -> KodResult<Value> {
    match kind {
        OperandKind::Local => frame.get(data),
        OperandKind::Constant => Ok(Value::from_constant(data)),
        OperandKind::Property => {
            let object = object.resolve()?;
            object.property(data).map(|p| p.value).ok_or(
                KodError::PropertyOutOfRange {
                    index: data,
                    count: object.properties().len(),
                },
            )
        }
        OperandKind::ClassVar => {
            let object = object.resolve()?;
            let class = object
                .resolve_class(classes)
                .ok_or(KodError::UnknownClass(object.class_id()))?;
            class
                .class_var(data)
                .ok_or(KodError::ClassVarOutOfRange {
                    index: data,
                    count: class.num_class_vars(),
                })
        }
    }
}

pub fn store(
    object: ObjectMut<'_>,
    classes: &dyn ClassStore,
    frame: &mut LocalFrame,
    kind: OperandKind,
    data: u32,
    value: Value,
) -> KodResult<()> {
    match kind {
        OperandKind::Local => frame.set(data, value),
        OperandKind::Constant => Err(KodError::ConstantNotStorable),
        OperandKind::Property => {
            let object = object.resolve()?;
            let count = object.properties().len();
            match object.property_mut(data) {
                Some(property) => {
                    property.value = value;
                    Ok(())
                }
                None => Err(KodError::PropertyOutOfRange { index: data, count }),
            }
        }
        OperandKind::ClassVar => {
            let object = object.resolve()?;
            let class = object
                .resolve_class(classes)
                .ok_or(KodError::UnknownClass(object.class_id()))?;
            if class.set_class_var(data, value) {
                Ok(())
            } else {
                Err(KodError::ClassVarOutOfRange {
                    index: data,
                    count: class.num_class_vars(),
                })
            }
        }
    }
}
