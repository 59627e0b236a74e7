//! Representation-neutral instances of a schema.
//!
//! An `Instance` holds one `Slot` per field descriptor, in schema order. It
//! is built from exactly one shape (or the domain struct) and can
//! materialize any other shape. Relations hold only the target id, read
//! through the target's join shape, so conversion never recurses past one hop.

use crate::error::ConversionError;
use crate::field::{FieldDescriptor, Slot};
use crate::resource::Resource;
use crate::schema::Schema;
use crate::shape::{Record, ShapeKind};
use crate::value::Value;
use std::any::TypeId;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Instance {
    schema: Arc<Schema>,
    slots: Vec<Slot>,
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.schema, &other.schema) && self.slots == other.slots
    }
}

fn domain_mismatch(schema: &Schema, found: &str) -> ConversionError {
    ConversionError::ShapeMismatch { expected: schema.shape(ShapeKind::Domain).name.clone(), found: found.to_string() }
}

impl Instance {
    /// Every slot empty, scalar defaults applied.
    pub fn new(schema: &Arc<Schema>) -> Self {
        Instance { schema: schema.clone(), slots: schema.fields.iter().map(FieldDescriptor::empty_slot).collect() }
    }

    /// Reads a Wire or Persistence record, full or join. Join shapes populate only the id.
    pub fn parse(schema: &Arc<Schema>, record: &Record, kind: ShapeKind) -> Result<Self, ConversionError> {
        if kind == ShapeKind::Domain {
            return Err(domain_mismatch(schema, record.shape_name()));
        }
        record.expect_shape(schema.shape(kind))?;
        let slots = schema
            .fields
            .iter()
            .map(|f| if f.in_shape(kind) { f.read(kind, record) } else { Ok(f.empty_slot()) })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Instance { schema: schema.clone(), slots })
    }

    pub fn from_domain<T: Resource>(schema: &Arc<Schema>, value: &T) -> Result<Self, ConversionError> {
        if TypeId::of::<T>() != schema.type_id {
            return Err(domain_mismatch(schema, std::any::type_name::<T>()));
        }
        let mut instance = Instance::new(schema);
        for accessor in T::accessors() {
            let idx = instance.position(accessor.ident)?;
            instance.slots[idx] = schema.fields[idx].slot_from_domain((accessor.get)(value))?;
        }
        Ok(instance)
    }

    pub fn materialize(&self, kind: ShapeKind) -> Result<Record, ConversionError> {
        if kind == ShapeKind::Domain {
            return Err(domain_mismatch(&self.schema, "a shape record"));
        }
        let mut record = self.schema.shape(kind).instantiate();
        for (field, slot) in self.schema.fields.iter().zip(&self.slots) {
            if field.in_shape(kind) {
                field.write(kind, slot, &mut record)?;
            }
        }
        Ok(record)
    }

    pub fn to_domain<T: Resource>(&self) -> Result<T, ConversionError> {
        if TypeId::of::<T>() != self.schema.type_id {
            return Err(domain_mismatch(&self.schema, std::any::type_name::<T>()));
        }
        let mut value = T::default();
        for accessor in T::accessors() {
            let idx = self.position(accessor.ident)?;
            let field = &self.schema.fields[idx];
            let domain = field.slot_to_domain(&self.slots[idx])?;
            (accessor.set)(&mut value, domain).map_err(|e| ConversionError::InvalidValue {
                record: field.record.to_string(),
                field: field.ident.to_string(),
                expected: e.expected,
                found: e.found,
            })?;
        }
        Ok(value)
    }

    fn position(&self, ident: &str) -> Result<usize, ConversionError> {
        self.schema.position(ident).ok_or_else(|| ConversionError::MissingMember {
            shape: self.schema.shape(ShapeKind::Domain).name.clone(),
            member: ident.to_string(),
        })
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn id(&self) -> &Value {
        self.slots[self.schema.id_index].as_scalar().unwrap_or(&Value::Null)
    }

    /// Slot of the field with this wire name.
    pub fn get(&self, wire_name: &str) -> Option<&Slot> {
        self.schema.fields.iter().position(|f| f.wire_name == wire_name).map(|i| &self.slots[i])
    }

    /// Scalar value of `field`, which must belong to this instance's schema.
    pub fn value(&self, field: &FieldDescriptor) -> Option<&Value> {
        self.schema.position(field.ident).and_then(|i| self.slots[i].as_scalar())
    }

    /// Replaces the slot of the field with this wire name; scalars are coerced to the field's primitive.
    pub fn set(&mut self, wire_name: &str, slot: Slot) -> Result<(), ConversionError> {
        let idx = self.schema.fields.iter().position(|f| f.wire_name == wire_name).ok_or_else(|| {
            ConversionError::MissingMember { shape: self.schema.shape(ShapeKind::Wire).name.clone(), member: wire_name.to_string() }
        })?;
        let field = &self.schema.fields[idx];
        let slot = match (slot, field.primitive()) {
            (Slot::Scalar(v), Some(p)) => Slot::Scalar(p.coerce(v).map_err(|e| ConversionError::InvalidValue {
                record: field.record.to_string(),
                field: field.ident.to_string(),
                expected: e.expected,
                found: e.found,
            })?),
            (other, _) => other,
        };
        self.slots[idx] = slot;
        Ok(())
    }

    pub fn set_id(&mut self, id: Value) -> Result<(), ConversionError> {
        let id = self.schema.target().coerce_id(id)?;
        self.slots[self.schema.id_index] = Slot::Scalar(id);
        Ok(())
    }

    pub fn fields(&self) -> impl Iterator<Item = (&FieldDescriptor, &Slot)> {
        self.schema.fields.iter().zip(&self.slots)
    }
}
