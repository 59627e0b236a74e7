//! Field descriptors: one per declared member, with the per-role rules for
//! projecting into shapes and moving values between shapes and instances.

use crate::error::ConversionError;
use crate::resource::{Cardinality, DomainValue};
use crate::shape::{ColumnTag, Datum, JoinTag, Member, MemberType, Record, Shape, ShapeKey, ShapeKind, Tag, WireTag};
use crate::value::{Primitive, Value, ValueError};
use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

/// The identifying member of a schema, all a join shape needs.
#[derive(Debug, Clone, PartialEq)]
pub struct IdSpec {
    pub ident: &'static str,
    pub wire_name: String,
    pub column: String,
    pub primitive: Primitive,
}

impl IdSpec {
    fn member(&self, kind: ShapeKind, wire_type: &str) -> Member {
        let ty = MemberType::Scalar { primitive: self.primitive, nullable: false };
        match kind {
            ShapeKind::Domain => Member { name: self.ident.to_string(), ty, tag: Tag::Domain { ident: self.ident.to_string() } },
            ShapeKind::Wire | ShapeKind::WireJoin => Member {
                name: self.wire_name.clone(),
                ty,
                tag: Tag::Wire(WireTag::Primary { wire_type: wire_type.to_string() }),
            },
            ShapeKind::Persistence | ShapeKind::PersistenceJoin => Member {
                name: self.column.clone(),
                ty,
                tag: Tag::Column(ColumnTag {
                    column: self.column.clone(),
                    primary_key: true,
                    not_null: true,
                    unique: true,
                    default: None,
                }),
            },
        }
    }

    fn member_name(&self, kind: ShapeKind) -> &str {
        match kind {
            ShapeKind::Domain => self.ident,
            ShapeKind::Wire | ShapeKind::WireJoin => &self.wire_name,
            ShapeKind::Persistence | ShapeKind::PersistenceJoin => &self.column,
        }
    }
}

/// A relation target as known after the skeleton phase: identity, id and join shapes.
#[derive(Debug)]
pub struct Target {
    pub type_id: TypeId,
    pub type_name: &'static str,
    pub wire_type: String,
    pub table: String,
    pub alias: String,
    pub id: IdSpec,
    pub wire_join: Shape,
    pub persistence_join: Shape,
}

impl Target {
    pub(crate) fn new(type_id: TypeId, type_name: &'static str, wire_type: String, table: String, alias: String, id: IdSpec) -> Self {
        let join = |kind: ShapeKind| Shape {
            key: ShapeKey { record: type_id, kind },
            name: format!("{type_name}{}", kind.suffix()),
            members: vec![id.member(kind, &wire_type)],
        };
        let wire_join = join(ShapeKind::WireJoin);
        let persistence_join = join(ShapeKind::PersistenceJoin);
        Target { type_id, type_name, wire_type, table, alias, id, wire_join, persistence_join }
    }

    pub fn join_shape(&self, kind: ShapeKind) -> &Shape {
        if kind.is_wire() { &self.wire_join } else { &self.persistence_join }
    }

    pub fn join_record(&self, kind: ShapeKind, id: &Value) -> Result<Record, ConversionError> {
        let shape = self.join_shape(kind);
        let mut record = shape.instantiate();
        record.set_scalar(self.id.member_name(shape.key.kind), id.clone())?;
        Ok(record)
    }

    pub fn read_join(&self, kind: ShapeKind, record: &Record) -> Result<Value, ConversionError> {
        let shape = self.join_shape(kind);
        record.expect_shape(shape)?;
        let name = self.id.member_name(shape.key.kind);
        let value = record
            .scalar(name)
            .cloned()
            .ok_or_else(|| ConversionError::MissingMember { shape: shape.name.clone(), member: name.to_string() })?;
        self.coerce_id(value)
    }

    pub fn coerce_id(&self, value: Value) -> Result<Value, ConversionError> {
        self.id.primitive.coerce(value).map_err(|e| invalid(self.type_name, self.id.ident, e))
    }
}

/// A related record reached through a join shape: the target and its id.
#[derive(Debug, Clone)]
pub struct JoinInstance {
    pub target: Arc<Target>,
    pub id: Value,
}

impl PartialEq for JoinInstance {
    fn eq(&self, other: &Self) -> bool {
        self.target.type_id == other.target.type_id && self.id == other.id
    }
}

/// Neutral value of one field inside a schema instance.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    Scalar(Value),
    One(Option<JoinInstance>),
    Many(Vec<JoinInstance>),
}

impl Slot {
    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            Slot::Scalar(v) => Some(v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Relation {
    pub target: Arc<Target>,
    pub cardinality: Cardinality,
    /// Belongs-to: the foreign-key column. Has: the belongs-to field on the target owning the relation.
    pub foreign_key: String,
    pub join: JoinTag,
}

#[derive(Debug, Clone)]
pub enum FieldKind {
    Id { primitive: Primitive },
    Attribute { primitive: Primitive },
    BelongsTo(Relation),
    Has(Relation),
    Expiring,
    Created,
    Updated,
}

impl FieldKind {
    pub fn label(&self) -> &'static str {
        match self {
            FieldKind::Id { .. } => "id",
            FieldKind::Attribute { .. } => "attribute",
            FieldKind::BelongsTo(_) => "belongs-to",
            FieldKind::Has(_) => "has",
            FieldKind::Expiring => "expiring",
            FieldKind::Created => "created-timestamp",
            FieldKind::Updated => "updated-timestamp",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub record: &'static str,
    pub ident: &'static str,
    pub wire_name: String,
    /// Storage column; for belongs-to the foreign-key column, for has the member ident.
    pub column: String,
    pub kind: FieldKind,
    pub nullable: bool,
    pub writable: bool,
    pub sortable: bool,
    pub filterable: bool,
    pub unique: bool,
    pub omit_empty: bool,
    pub default: Option<(String, Value)>,
}

fn invalid(record: &str, field: &str, e: ValueError) -> ConversionError {
    ConversionError::InvalidValue { record: record.to_string(), field: field.to_string(), expected: e.expected, found: e.found }
}

impl FieldDescriptor {
    pub fn primitive(&self) -> Option<Primitive> {
        match &self.kind {
            FieldKind::Id { primitive } | FieldKind::Attribute { primitive } => Some(*primitive),
            FieldKind::Expiring | FieldKind::Created | FieldKind::Updated => Some(Primitive::Time),
            FieldKind::BelongsTo(_) | FieldKind::Has(_) => None,
        }
    }

    pub fn relation(&self) -> Option<&Relation> {
        match &self.kind {
            FieldKind::BelongsTo(rel) | FieldKind::Has(rel) => Some(rel),
            _ => None,
        }
    }

    pub fn is_id(&self) -> bool {
        matches!(self.kind, FieldKind::Id { .. })
    }

    pub fn is_relation(&self) -> bool {
        self.relation().is_some()
    }

    /// Has relations live on the target's table; every other field owns a column.
    pub fn stored(&self) -> bool {
        !matches!(self.kind, FieldKind::Has(_))
    }

    pub fn in_shape(&self, kind: ShapeKind) -> bool {
        !kind.is_join() || self.is_id()
    }

    pub(crate) fn id_spec(&self) -> Option<IdSpec> {
        match self.kind {
            FieldKind::Id { primitive } => Some(IdSpec {
                ident: self.ident,
                wire_name: self.wire_name.clone(),
                column: self.column.clone(),
                primitive,
            }),
            _ => None,
        }
    }

    /// Name of the member carrying this field's value in a shape of `kind`.
    pub fn member_name(&self, kind: ShapeKind) -> &str {
        match kind {
            ShapeKind::Domain => self.ident,
            ShapeKind::Wire | ShapeKind::WireJoin => &self.wire_name,
            ShapeKind::Persistence | ShapeKind::PersistenceJoin => match self.kind {
                FieldKind::BelongsTo(_) | FieldKind::Has(_) => self.ident,
                _ => &self.column,
            },
        }
    }

    fn column_tag(&self) -> ColumnTag {
        ColumnTag {
            column: self.column.clone(),
            primary_key: self.is_id(),
            not_null: !self.nullable,
            unique: self.unique,
            default: self.default.as_ref().map(|(raw, _)| raw.clone()),
        }
    }

    pub fn empty_slot(&self) -> Slot {
        match &self.kind {
            FieldKind::BelongsTo(_) => Slot::One(None),
            FieldKind::Has(rel) if rel.cardinality == Cardinality::Many => Slot::Many(Vec::new()),
            FieldKind::Has(_) => Slot::One(None),
            _ => Slot::Scalar(self.default.as_ref().map(|(_, v)| v.clone()).unwrap_or(Value::Null)),
        }
    }

    /// Members this field contributes to a shape of `kind`; join shapes keep only the id.
    pub fn project(&self, kind: ShapeKind, wire_type: &str) -> Vec<Member> {
        if !self.in_shape(kind) {
            return Vec::new();
        }
        if let Some(id) = self.id_spec() {
            return vec![id.member(kind, wire_type)];
        }
        match (&self.kind, kind) {
            (FieldKind::BelongsTo(rel) | FieldKind::Has(rel), ShapeKind::Domain) => {
                let target = ShapeKey { record: rel.target.type_id, kind: ShapeKind::Domain };
                let ty = match rel.cardinality {
                    Cardinality::One => MemberType::One { target, target_name: rel.target.type_name.to_string(), nullable: self.nullable },
                    Cardinality::Many => MemberType::Many { target, target_name: rel.target.type_name.to_string() },
                };
                vec![Member { name: self.ident.to_string(), ty, tag: Tag::Domain { ident: self.ident.to_string() } }]
            }
            (FieldKind::BelongsTo(rel) | FieldKind::Has(rel), ShapeKind::Wire) => {
                vec![Member {
                    name: self.wire_name.clone(),
                    ty: self.join_type(rel, ShapeKind::WireJoin),
                    tag: Tag::Wire(WireTag::Relationship { name: self.wire_name.clone(), omit_empty: self.omit_empty }),
                }]
            }
            (FieldKind::BelongsTo(rel), _) => vec![
                Member {
                    name: rel.foreign_key.clone(),
                    ty: MemberType::Scalar { primitive: rel.target.id.primitive, nullable: self.nullable },
                    tag: Tag::Column(self.column_tag()),
                },
                Member {
                    name: self.ident.to_string(),
                    ty: self.join_type(rel, ShapeKind::PersistenceJoin),
                    tag: Tag::Join(rel.join.clone()),
                },
            ],
            (FieldKind::Has(rel), _) => vec![Member {
                name: self.ident.to_string(),
                ty: self.join_type(rel, ShapeKind::PersistenceJoin),
                tag: Tag::Join(rel.join.clone()),
            }],
            (_, ShapeKind::Domain) => vec![Member {
                name: self.ident.to_string(),
                ty: self.scalar_type(),
                tag: Tag::Domain { ident: self.ident.to_string() },
            }],
            (_, ShapeKind::Wire) => vec![Member {
                name: self.wire_name.clone(),
                ty: self.scalar_type(),
                tag: Tag::Wire(WireTag::Attribute { name: self.wire_name.clone(), omit_empty: self.omit_empty }),
            }],
            (_, _) => vec![Member { name: self.column.clone(), ty: self.scalar_type(), tag: Tag::Column(self.column_tag()) }],
        }
    }

    fn scalar_type(&self) -> MemberType {
        MemberType::Scalar { primitive: self.primitive().unwrap_or(Primitive::String), nullable: self.nullable }
    }

    fn join_type(&self, rel: &Relation, join: ShapeKind) -> MemberType {
        let shape = rel.target.join_shape(join);
        match rel.cardinality {
            Cardinality::One => MemberType::One {
                target: shape.key,
                target_name: shape.name.clone(),
                nullable: self.nullable || matches!(self.kind, FieldKind::Has(_)),
            },
            Cardinality::Many => MemberType::Many { target: shape.key, target_name: shape.name.clone() },
        }
    }

    fn required(&self) -> bool {
        matches!(self.kind, FieldKind::BelongsTo(_)) && !self.nullable
    }

    fn null_relation(&self) -> ConversionError {
        ConversionError::NullRelation { record: self.record.to_string(), field: self.ident.to_string() }
    }

    fn coerce(&self, value: Value) -> Result<Value, ConversionError> {
        match self.primitive() {
            Some(p) => p.coerce(value).map_err(|e| invalid(self.record, self.ident, e)),
            None => Ok(value),
        }
    }

    fn datum<'r>(&self, record: &'r Record, name: &str) -> Result<&'r Datum, ConversionError> {
        record
            .get(name)
            .ok_or_else(|| ConversionError::MissingMember { shape: record.shape_name().to_string(), member: name.to_string() })
    }

    fn mismatch(&self, expected: &'static str, found: &str) -> ConversionError {
        ConversionError::InvalidValue {
            record: self.record.to_string(),
            field: self.ident.to_string(),
            expected,
            found: found.to_string(),
        }
    }

    /// Reads this field out of a Wire or Persistence record (full or join).
    pub fn read(&self, kind: ShapeKind, record: &Record) -> Result<Slot, ConversionError> {
        let name = self.member_name(kind);
        match &self.kind {
            FieldKind::BelongsTo(rel) if !kind.is_wire() => {
                let id = match self.datum(record, name)? {
                    Datum::One(Some(nested)) => rel.target.read_join(kind, nested)?,
                    _ => match record.scalar(&rel.foreign_key) {
                        Some(Value::Null) | None => Value::Null,
                        Some(v) => rel.target.coerce_id(v.clone())?,
                    },
                };
                if id.is_null() {
                    if self.required() {
                        return Err(self.null_relation());
                    }
                    return Ok(Slot::One(None));
                }
                Ok(Slot::One(Some(JoinInstance { target: rel.target.clone(), id })))
            }
            FieldKind::BelongsTo(rel) | FieldKind::Has(rel) => match self.datum(record, name)? {
                Datum::One(Some(nested)) => {
                    let id = rel.target.read_join(kind, nested)?;
                    Ok(Slot::One(Some(JoinInstance { target: rel.target.clone(), id })))
                }
                Datum::One(None) if self.required() => Err(self.null_relation()),
                Datum::One(None) => Ok(Slot::One(None)),
                Datum::Many(items) if rel.cardinality == Cardinality::Many => items
                    .iter()
                    .map(|nested| {
                        rel.target.read_join(kind, nested).map(|id| JoinInstance { target: rel.target.clone(), id })
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(Slot::Many),
                Datum::Many(_) => Err(self.mismatch("a single relation", "a collection")),
                Datum::Scalar(v) => Err(self.mismatch("a relation", &v.describe())),
            },
            _ => match self.datum(record, name)? {
                Datum::Scalar(v) => self.coerce(v.clone()).map(Slot::Scalar),
                _ => Err(self.mismatch(self.primitive().map(|p| p.name()).unwrap_or("scalar"), "a relation")),
            },
        }
    }

    /// Writes `slot` into a Wire or Persistence record (full or join).
    pub fn write(&self, kind: ShapeKind, slot: &Slot, record: &mut Record) -> Result<(), ConversionError> {
        let name = self.member_name(kind).to_string();
        match (&self.kind, slot) {
            (FieldKind::BelongsTo(_) | FieldKind::Has(_), Slot::One(None)) if self.required() => Err(self.null_relation()),
            (FieldKind::BelongsTo(rel), Slot::One(link)) if !kind.is_wire() => {
                let id = link.as_ref().map(|j| j.id.clone()).unwrap_or(Value::Null);
                record.set_scalar(&rel.foreign_key, id.clone())?;
                let nested = match link {
                    Some(j) => Some(Box::new(rel.target.join_record(kind, &j.id)?)),
                    None => None,
                };
                record.set(&name, Datum::One(nested))
            }
            (FieldKind::BelongsTo(rel) | FieldKind::Has(rel), Slot::One(link)) => {
                let nested = match link {
                    Some(j) => Some(Box::new(rel.target.join_record(kind, &j.id)?)),
                    None => None,
                };
                record.set(&name, Datum::One(nested))
            }
            (FieldKind::Has(rel), Slot::Many(links)) => {
                let items = links
                    .iter()
                    .map(|j| rel.target.join_record(kind, &j.id))
                    .collect::<Result<Vec<_>, _>>()?;
                record.set(&name, Datum::Many(items))
            }
            (FieldKind::BelongsTo(_) | FieldKind::Has(_), other) => Err(self.mismatch("a relation slot", &format!("{other:?}"))),
            (_, Slot::Scalar(v)) => record.set_scalar(&name, self.coerce(v.clone())?),
            (_, _) => Err(self.mismatch("a scalar slot", "a relation slot")),
        }
    }

    pub fn slot_from_domain(&self, value: DomainValue) -> Result<Slot, ConversionError> {
        match (&self.kind, value) {
            (FieldKind::BelongsTo(_) | FieldKind::Has(_), DomainValue::One(None)) if self.required() => Err(self.null_relation()),
            (FieldKind::BelongsTo(rel) | FieldKind::Has(rel), DomainValue::One(id)) => match id {
                Some(id) => Ok(Slot::One(Some(JoinInstance { target: rel.target.clone(), id: rel.target.coerce_id(id)? }))),
                None => Ok(Slot::One(None)),
            },
            (FieldKind::Has(rel), DomainValue::Many(ids)) => ids
                .into_iter()
                .map(|id| rel.target.coerce_id(id).map(|id| JoinInstance { target: rel.target.clone(), id }))
                .collect::<Result<Vec<_>, _>>()
                .map(Slot::Many),
            (FieldKind::BelongsTo(_) | FieldKind::Has(_), other) => Err(self.mismatch("a relation", &format!("{other:?}"))),
            (_, DomainValue::Scalar(v)) => self.coerce(v).map(Slot::Scalar),
            (_, other) => Err(self.mismatch("a scalar", &format!("{other:?}"))),
        }
    }

    pub fn slot_to_domain(&self, slot: &Slot) -> Result<DomainValue, ConversionError> {
        match slot {
            Slot::Scalar(v) => Ok(DomainValue::Scalar(v.clone())),
            Slot::One(None) if self.required() => Err(self.null_relation()),
            Slot::One(link) => Ok(DomainValue::One(link.as_ref().map(|j| j.id.clone()))),
            Slot::Many(links) => Ok(DomainValue::Many(links.iter().map(|j| j.id.clone()).collect())),
        }
    }
}

impl fmt::Display for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} ({}, wire `{}`, column `{}`)", self.record, self.ident, self.kind.label(), self.wire_name, self.column)
    }
}
