//! What `#[derive(Resource)]` produces: a declaration the registry derives a schema from,
//! plus accessors that move values in and out of the domain struct.

use crate::value::{Primitive, Value, ValueError};
use std::any::TypeId;
use std::fmt;

/// Role keyword of a `#[resource(...)]` field attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Id,
    Attr,
    BelongsTo,
    Has,
    Many2Many,
    Expires,
    Created,
    Updated,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Role::Id => "id",
            Role::Attr => "attribute",
            Role::BelongsTo => "belongs-to",
            Role::Has => "has",
            Role::Many2Many => "many2many",
            Role::Expires => "expiring",
            Role::Created => "created-timestamp",
            Role::Updated => "updated-timestamp",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

/// Member type as seen by the derive macro.
#[derive(Clone, Copy)]
pub enum TypeDecl {
    Primitive { primitive: Primitive, optional: bool },
    Record { target: RecordRef, cardinality: Cardinality, optional: bool },
    /// Anything the macro could not classify; carries the type as written.
    Other(&'static str),
}

impl fmt::Debug for TypeDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDecl::Primitive { primitive, optional: false } => write!(f, "{}", primitive.name()),
            TypeDecl::Primitive { primitive, optional: true } => write!(f, "Option<{}>", primitive.name()),
            TypeDecl::Record { target, cardinality: Cardinality::Many, .. } => write!(f, "Vec<{}>", target.type_name),
            TypeDecl::Record { target, optional: true, .. } => write!(f, "Option<{}>", target.type_name),
            TypeDecl::Record { target, .. } => write!(f, "{}", target.type_name),
            TypeDecl::Other(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MemberDecl {
    pub ident: &'static str,
    pub role: Role,
    pub annotation: &'static str,
    pub ty: TypeDecl,
}

#[derive(Debug, Clone)]
pub struct Declaration {
    pub type_name: &'static str,
    pub name: Option<&'static str>,
    pub table: Option<&'static str>,
    pub alias: Option<&'static str>,
    pub members: Vec<MemberDecl>,
}

/// Lazily resolvable handle to another record type; what relation members point at.
#[derive(Clone, Copy)]
pub struct RecordRef {
    pub type_name: &'static str,
    pub type_id: fn() -> TypeId,
    pub declaration: fn() -> Declaration,
}

impl RecordRef {
    pub fn of<T: Resource>() -> Self {
        RecordRef {
            type_name: short_type_name::<T>(),
            type_id: TypeId::of::<T>,
            declaration: T::declaration,
        }
    }
}

impl fmt::Debug for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

/// Last path segment of the type's name; generic arguments are dropped, so
/// `a::Page<b::Post>` reads as `Page`.
fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    let path = full.split('<').next().unwrap_or(full);
    path.rsplit("::").next().unwrap_or(path)
}

/// Domain-side value of one member: relations expose their targets' ids.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainValue {
    Scalar(Value),
    One(Option<Value>),
    Many(Vec<Value>),
}

pub struct Accessor<T> {
    pub ident: &'static str,
    pub get: fn(&T) -> DomainValue,
    pub set: fn(&mut T, DomainValue) -> Result<(), ValueError>,
}

pub trait Resource: Default + Send + Sync + 'static {
    fn declaration() -> Declaration;
    fn accessors() -> Vec<Accessor<Self>>;
    fn id_value(&self) -> Value;
    fn set_id(&mut self, id: Value) -> Result<(), ValueError>;

    /// A stub carrying only the id, which is all a join shape knows about a record.
    fn from_id(id: Value) -> Result<Self, ValueError> {
        let mut record = Self::default();
        record.set_id(id)?;
        Ok(record)
    }
}

/// Submitted by the derive so `Registry::register_all` can find every resource.
pub struct ResourceInfo {
    pub name: &'static str,
    pub record: fn() -> RecordRef,
}

inventory::collect!(ResourceInfo);
