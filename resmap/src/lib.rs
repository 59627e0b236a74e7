//! resmap derives a storage and a JSON:API representation from one annotated struct.
//!
//! `#[derive(Resource)]` records how each field is meant to be used: id, attribute,
//! belongs-to or has relation, timestamps. The [`Registry`] turns that declaration into an
//! immutable [`Schema`] with five shapes (domain, wire, persistence and the two id-only join shapes),
//! and an [`Instance`] converts a record between any of them. On top sit the query builders
//! (filter, sort, offset and keyset pagination) rendering SQL or evaluating rows in memory,
//! the JSON:API codec, validation, OpenAPI components and a [`Repository`] over a [`Storage`].
//!

extern crate self as resmap;

pub mod annotation;
pub mod config;
pub mod error;
pub mod field;
pub mod instance;
pub mod logger;
pub mod naming;
pub mod openapi;
pub mod query;
pub mod registry;
pub mod repo;
pub mod resource;
pub mod schema;
pub mod shape;
pub mod storage;
pub mod validate;
pub mod value;
pub mod wire;

#[cfg(test)]
mod fixtures;

pub use chrono;
pub use crate::config::{PaginationConfig, ResmapConfig};
pub use error::{AppError, ConversionError, ErrorResponse, QueryError, SchemaError, StorageError};
pub use field::{FieldDescriptor, FieldKind, JoinInstance, Slot};
pub use http;
pub use http::StatusCode;
pub use instance::Instance;
pub use inventory;
pub use macros::Resource;
pub use once_cell;
pub use query::*;
pub use registry::Registry;
pub use repo::Repository;
pub use resource::Resource;
pub use schema::Schema;
pub use serde_json;
pub use shape::{Datum, Record, Shape, ShapeKind};
pub use storage::{MemoryStorage, Row, Storage};
pub use utoipa;
pub use validate::{validate, ValidationErrors};
pub use value::{FromValue, Primitive, ToValue, Value};
