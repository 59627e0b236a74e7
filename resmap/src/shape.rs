//! Derived record shapes and their instances.
//!
//! Every schema owns five shapes. `Domain` describes the user's struct,
//! `Wire` the JSON:API resource, `Persistence` the table row. The two join
//! shapes carry only the id and are what other schemas embed for relations.

use crate::error::ConversionError;
use crate::value::{Primitive, Value};
use std::any::TypeId;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShapeKind {
    Domain,
    Wire,
    Persistence,
    WireJoin,
    PersistenceJoin,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 5] = [
        ShapeKind::Domain,
        ShapeKind::Wire,
        ShapeKind::Persistence,
        ShapeKind::WireJoin,
        ShapeKind::PersistenceJoin,
    ];

    pub fn is_join(&self) -> bool {
        matches!(self, ShapeKind::WireJoin | ShapeKind::PersistenceJoin)
    }

    /// Shape a relation member of this kind embeds for its target.
    pub fn join(&self) -> ShapeKind {
        match self {
            ShapeKind::Domain => ShapeKind::Domain,
            ShapeKind::Wire | ShapeKind::WireJoin => ShapeKind::WireJoin,
            ShapeKind::Persistence | ShapeKind::PersistenceJoin => ShapeKind::PersistenceJoin,
        }
    }

    pub fn is_wire(&self) -> bool {
        matches!(self, ShapeKind::Wire | ShapeKind::WireJoin)
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            ShapeKind::Domain => "",
            ShapeKind::Wire => "Wire",
            ShapeKind::Persistence => "Persistence",
            ShapeKind::WireJoin => "WireJoin",
            ShapeKind::PersistenceJoin => "PersistenceJoin",
        }
    }
}

/// Identity of a shape: record type plus kind. Two records are of the same shape iff keys are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShapeKey {
    pub record: TypeId,
    pub kind: ShapeKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemberType {
    Scalar { primitive: Primitive, nullable: bool },
    One { target: ShapeKey, target_name: String, nullable: bool },
    Many { target: ShapeKey, target_name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireTag {
    Primary { wire_type: String },
    Attribute { name: String, omit_empty: bool },
    Relationship { name: String, omit_empty: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnTag {
    pub column: String,
    pub primary_key: bool,
    pub not_null: bool,
    pub unique: bool,
    pub default: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinTag {
    /// `local` is the foreign-key column on this table, `foreign` the target's id column.
    BelongsTo { local: String, foreign: String },
    /// `local` is this table's id column, `foreign` the target's foreign-key column.
    Has { local: String, foreign: String },
}

/// Shape-specific metadata attached to each member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tag {
    Domain { ident: String },
    Wire(WireTag),
    Column(ColumnTag),
    Join(JoinTag),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub name: String,
    pub ty: MemberType,
    pub tag: Tag,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub key: ShapeKey,
    pub name: String,
    pub members: Vec<Member>,
}

impl Shape {
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name)
    }

    /// Allocates an instance with every member at its empty value.
    pub fn instantiate(&self) -> Record {
        let members = self
            .members
            .iter()
            .map(|m| {
                let datum = match m.ty {
                    MemberType::Scalar { .. } => Datum::Scalar(Value::Null),
                    MemberType::One { .. } => Datum::One(None),
                    MemberType::Many { .. } => Datum::Many(Vec::new()),
                };
                (m.name.clone(), datum)
            })
            .collect();
        Record { shape: self.key, shape_name: self.name.clone(), members }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    Scalar(Value),
    One(Option<Box<Record>>),
    Many(Vec<Record>),
}

impl Datum {
    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            Datum::Scalar(v) => Some(v),
            _ => None,
        }
    }
}

/// An instance of one shape: members in shape order.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    shape: ShapeKey,
    shape_name: String,
    members: Vec<(String, Datum)>,
}

impl Record {
    pub fn shape(&self) -> ShapeKey {
        self.shape
    }

    pub fn shape_name(&self) -> &str {
        &self.shape_name
    }

    pub fn get(&self, name: &str) -> Option<&Datum> {
        self.members.iter().find(|(n, _)| n == name).map(|(_, d)| d)
    }

    pub fn scalar(&self, name: &str) -> Option<&Value> {
        self.get(name).and_then(Datum::as_scalar)
    }

    pub fn set(&mut self, name: &str, datum: Datum) -> Result<(), ConversionError> {
        match self.members.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => {
                *slot = datum;
                Ok(())
            }
            None => Err(ConversionError::MissingMember { shape: self.shape_name.clone(), member: name.to_string() }),
        }
    }

    pub fn set_scalar(&mut self, name: &str, value: Value) -> Result<(), ConversionError> {
        self.set(name, Datum::Scalar(value))
    }

    pub fn members(&self) -> impl Iterator<Item = (&str, &Datum)> {
        self.members.iter().map(|(n, d)| (n.as_str(), d))
    }

    pub(crate) fn expect_shape(&self, expected: &Shape) -> Result<(), ConversionError> {
        if self.shape == expected.key {
            Ok(())
        } else {
            Err(ConversionError::ShapeMismatch { expected: expected.name.clone(), found: self.shape_name.clone() })
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{", self.shape_name)?;
        for (i, (name, datum)) in self.members.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            match datum {
                Datum::Scalar(v) => write!(f, "{sep}{name}: {}", v.describe())?,
                Datum::One(Some(r)) => write!(f, "{sep}{name}: {r}")?,
                Datum::One(None) => write!(f, "{sep}{name}: null")?,
                Datum::Many(rs) => write!(f, "{sep}{name}: [{} items]", rs.len())?,
            }
        }
        f.write_str(" }")
    }
}
