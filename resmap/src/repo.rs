//! Glue between schemas, conversion, the query builders and a `Storage`.

use crate::config::PaginationConfig;
use crate::error::{AppError, QueryError, StorageError};
use crate::field::FieldKind;
use crate::instance::Instance;
use crate::query::page::{self, Page};
use crate::query::statement::QueryTarget;
use crate::query::{filter, sort, ColumnRef, CompareOp, Expr, QueryParams, SelectQuery};
use crate::registry::Registry;
use crate::resource::{Cardinality, Resource};
use crate::schema::Schema;
use crate::shape::{Datum, JoinTag, ShapeKind};
use crate::storage::{Row, Storage};
use crate::validate::validate;
use crate::value::{ToValue, Value};
use crate::wire::{self, Document};
use crate::{debug, info};
use std::any::TypeId;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

pub struct Repository<'r, S: Storage> {
    registry: &'r Registry,
    storage: S,
    pagination: PaginationConfig,
    prepared: Mutex<HashSet<TypeId>>,
}

impl<'r, S: Storage> Repository<'r, S> {
    pub fn new(registry: &'r Registry, storage: S, pagination: PaginationConfig) -> Self {
        Repository { registry, storage, pagination, prepared: Mutex::new(HashSet::new()) }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn schema<T: Resource>(&self) -> Result<Arc<Schema>, AppError> {
        let schema = self.registry.register::<T>()?;
        self.prepare(&schema)?;
        Ok(schema)
    }

    fn by_wire_type(&self, wire_type: &str) -> Result<Arc<Schema>, AppError> {
        let schema = self.registry.by_wire_type(wire_type).ok_or_else(|| QueryError::UnknownType(wire_type.to_string()))?;
        self.prepare(&schema)?;
        Ok(schema)
    }

    /// Creates the table and installs timestamp and expiry triggers, once per schema.
    fn prepare(&self, schema: &Schema) -> Result<(), AppError> {
        let mut prepared = self.prepared.lock().unwrap_or_else(PoisonError::into_inner);
        if prepared.insert(schema.type_id) {
            schema.install_triggers(&self.storage)?;
            info!("Prepared table {} for {}", schema.table, schema.wire_type);
        }
        Ok(())
    }

    fn unique_violation(schema: &Schema, err: StorageError) -> AppError {
        match err {
            StorageError::UniqueViolation { table, column } if table == schema.table => {
                let field = schema.field_by_column(&column).map(|f| f.wire_name.clone()).unwrap_or_else(|| column.clone());
                AppError::UniqueViolation { field, column }
            }
            other => other.into(),
        }
    }

    /// Stored columns of `instance`. Inserts leave out unassigned ids and fill declared defaults, updates carry only writable fields.
    fn row(instance: &Instance, insert: bool) -> Result<Row, AppError> {
        let schema = instance.schema();
        let record = instance.materialize(ShapeKind::Persistence)?;
        let mut row = Row::new();
        for field in schema.fields.iter().filter(|f| f.stored()) {
            let keep = match field.kind {
                FieldKind::Id { .. } => insert && !instance.id().is_empty(),
                FieldKind::Created | FieldKind::Updated => false,
                _ => insert || field.writable,
            };
            if keep {
                let mut value = record.scalar(&field.column).cloned().unwrap_or(Value::Null);
                if let (true, true, Some((_, default))) = (insert, value.is_null(), &field.default) {
                    value = default.clone();
                }
                row.insert(field.column.clone(), value);
            }
        }
        Ok(row)
    }

    /// Builds an instance from a stored row, fetching the ids of has relations one hop away.
    fn hydrate(&self, schema: &Arc<Schema>, row: &Row) -> Result<Instance, AppError> {
        let mut record = schema.shape(ShapeKind::Persistence).instantiate();
        for field in &schema.fields {
            match &field.kind {
                FieldKind::Has(rel) => {
                    let JoinTag::Has { local, foreign } = &rel.join else { continue };
                    let target = self
                        .registry
                        .get_by_id(rel.target.type_id)
                        .ok_or_else(|| QueryError::UnknownType(rel.target.wire_type.clone()))?;
                    self.prepare(&target)?;
                    let owner = row.get(local).cloned().unwrap_or(Value::Null);
                    let mut query = SelectQuery::new(&target.table, &target.alias);
                    query.select(ColumnRef::new(&target.alias, &rel.target.id.column));
                    query.filter(Expr::compare(ColumnRef::new(&target.alias, foreign), CompareOp::Eq, owner));
                    query.order_by(ColumnRef::new(&target.alias, &rel.target.id.column), sort::Direction::Asc);
                    let joins = self
                        .storage
                        .select(&query)?
                        .iter()
                        .map(|r| rel.target.join_record(ShapeKind::PersistenceJoin, r.get(&rel.target.id.column).unwrap_or(&Value::Null)))
                        .collect::<Result<Vec<_>, _>>()?;
                    let datum = match rel.cardinality {
                        Cardinality::Many => Datum::Many(joins),
                        Cardinality::One => Datum::One(joins.into_iter().next().map(Box::new)),
                    };
                    record.set(field.member_name(ShapeKind::Persistence), datum)?;
                }
                _ => {
                    let value = row.get(&field.column).cloned().unwrap_or(Value::Null);
                    record.set_scalar(&field.column, value)?;
                }
            }
        }
        Ok(Instance::parse(schema, &record, ShapeKind::Persistence)?)
    }

    pub fn find(&self, schema: &Arc<Schema>, id: &Value) -> Result<Option<Instance>, AppError> {
        let id = schema.target().coerce_id(id.clone())?;
        let mut query = SelectQuery::for_schema(schema);
        query.filter(Expr::compare(ColumnRef::new(&schema.alias, &schema.id().column), CompareOp::Eq, id));
        query.limit(1);
        match self.storage.select(&query)?.first() {
            Some(row) => self.hydrate(schema, row).map(Some),
            None => Ok(None),
        }
    }

    fn not_found(schema: &Schema, id: &Value) -> AppError {
        AppError::NotFound(format!("{}/{}", schema.wire_type, id))
    }

    pub fn insert_instance(&self, instance: &Instance) -> Result<Instance, AppError> {
        let schema = instance.schema();
        self.prepare(schema)?;
        validate(instance)?;
        let row = Self::row(instance, true)?;
        let stored = self.storage.insert(&schema.table, row).map_err(|e| Self::unique_violation(schema, e))?;
        debug!("Inserted {} into {}", stored.get(&schema.id().column).unwrap_or(&Value::Null), schema.table);
        self.hydrate(schema, &stored)
    }

    pub fn update_instance(&self, instance: &Instance) -> Result<Instance, AppError> {
        let schema = instance.schema();
        self.prepare(schema)?;
        validate(instance)?;
        let row = Self::row(instance, false)?;
        let key = (schema.id().column.as_str(), instance.id());
        let stored = self.storage.update(&schema.table, key, row).map_err(|e| Self::unique_violation(schema, e))?;
        self.hydrate(schema, &stored)
    }

    pub fn list_instances(&self, schema: &Arc<Schema>, params: &QueryParams) -> Result<Vec<Instance>, AppError> {
        self.prepare(schema)?;
        let mut query = SelectQuery::for_schema(schema);
        filter::apply(schema, &params.filter, &mut query)?;
        let page = params.page(&self.pagination)?.unwrap_or(Page::Offset { number: 0, size: self.pagination.default_size });
        match page {
            Page::Offset { number, size } => {
                page::apply_order(schema, &params.sort, &mut query)?;
                page::apply_offset(number, size, &self.pagination, &mut query)?;
            }
            Page::Cursor { after, size } => {
                let id = schema.id_spec().primitive.parse(&after).map_err(|_| QueryError::InvalidCursor(after.clone()))?;
                let cursor = self.find(schema, &id)?.ok_or_else(|| QueryError::InvalidCursor(after.clone()))?;
                page::apply_cursor(schema, &params.sort, &cursor, Some(size), &self.pagination, &mut query)?;
            }
        }
        self.storage.select(&query)?.iter().map(|row| self.hydrate(schema, row)).collect()
    }

    pub fn insert<T: Resource>(&self, value: &T) -> Result<T, AppError> {
        let schema = self.schema::<T>()?;
        Ok(self.insert_instance(&Instance::from_domain(&schema, value)?)?.to_domain()?)
    }

    pub fn get<T: Resource>(&self, id: impl ToValue) -> Result<T, AppError> {
        let schema = self.schema::<T>()?;
        let id = id.to_value();
        let found = self.find(&schema, &id)?.ok_or_else(|| Self::not_found(&schema, &id))?;
        Ok(found.to_domain()?)
    }

    pub fn list<T: Resource>(&self, params: &QueryParams) -> Result<Vec<T>, AppError> {
        let schema = self.schema::<T>()?;
        self.list_instances(&schema, params)?.iter().map(|i| i.to_domain().map_err(AppError::from)).collect()
    }

    pub fn update<T: Resource>(&self, value: &T) -> Result<T, AppError> {
        let schema = self.schema::<T>()?;
        Ok(self.update_instance(&Instance::from_domain(&schema, value)?)?.to_domain()?)
    }

    pub fn delete<T: Resource>(&self, id: impl ToValue) -> Result<(), AppError> {
        let schema = self.schema::<T>()?;
        let id = schema.target().coerce_id(id.to_value())?;
        self.storage.delete(&schema.table, (&schema.id().column, &id))?;
        Ok(())
    }

    /// Handles a JSON:API create request body for `wire_type`.
    pub fn create_document(&self, wire_type: &str, body: &str) -> Result<Document, AppError> {
        let schema = self.by_wire_type(wire_type)?;
        let record = wire::decode_document(&schema, body)?;
        let stored = self.insert_instance(&Instance::parse(&schema, &record, ShapeKind::Wire)?)?;
        Ok(wire::document_one(&schema, &stored.materialize(ShapeKind::Wire)?, None)?)
    }

    pub fn get_document(&self, wire_type: &str, id: &str, params: &QueryParams) -> Result<Document, AppError> {
        let schema = self.by_wire_type(wire_type)?;
        let id = schema.id_spec().primitive.parse(id).map_err(|_| Self::not_found(&schema, &Value::Text(id.to_string())))?;
        let found = self.find(&schema, &id)?.ok_or_else(|| Self::not_found(&schema, &id))?;
        Ok(wire::document_one(&schema, &found.materialize(ShapeKind::Wire)?, self.fieldset(&schema, params)?)?)
    }

    pub fn list_document(&self, wire_type: &str, params: &QueryParams) -> Result<Document, AppError> {
        let schema = self.by_wire_type(wire_type)?;
        let records = self
            .list_instances(&schema, params)?
            .iter()
            .map(|i| i.materialize(ShapeKind::Wire))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(wire::document_many(&schema, &records, self.fieldset(&schema, params)?)?)
    }

    /// Sparse fieldset for `schema`; every listed name must be a member of its Wire shape.
    fn fieldset<'p>(&self, schema: &Schema, params: &'p QueryParams) -> Result<Option<&'p [String]>, AppError> {
        for wire_type in params.fields.keys() {
            if self.registry.by_wire_type(wire_type).is_none() {
                return Err(QueryError::UnknownType(wire_type.clone()).into());
            }
        }
        let fields = params.fieldset(&schema.wire_type);
        for name in fields.unwrap_or_default() {
            if schema.field(name).is_none() {
                return Err(QueryError::UnknownField { record: schema.wire_type.clone(), field: name.clone() }.into());
            }
        }
        Ok(fields)
    }
}
