use crate::error::QueryError;
use crate::field::{FieldDescriptor, FieldKind, IdSpec, Target};
use crate::naming::quote_ident;
use crate::shape::{Shape, ShapeKind};
use crate::storage::{TableDef, Trigger, TriggerSink};
use std::any::TypeId;
use std::sync::Arc;

/// Derived description of one record type. Immutable once the registry publishes it.
#[derive(Debug)]
pub struct Schema {
    pub type_id: TypeId,
    pub type_name: &'static str,
    pub wire_type: String,
    pub table: String,
    pub alias: String,
    pub fields: Vec<FieldDescriptor>,
    pub(crate) id_index: usize,
    pub(crate) target: Arc<Target>,
    pub(crate) domain: Shape,
    pub(crate) wire: Shape,
    pub(crate) persistence: Shape,
}

impl Schema {
    pub fn id(&self) -> &FieldDescriptor {
        &self.fields[self.id_index]
    }

    pub fn id_spec(&self) -> &IdSpec {
        &self.target.id
    }

    /// The id-only view other schemas embed when they relate to this one.
    pub fn target(&self) -> &Arc<Target> {
        &self.target
    }

    pub fn shape(&self, kind: ShapeKind) -> &Shape {
        match kind {
            ShapeKind::Domain => &self.domain,
            ShapeKind::Wire => &self.wire,
            ShapeKind::Persistence => &self.persistence,
            ShapeKind::WireJoin => &self.target.wire_join,
            ShapeKind::PersistenceJoin => &self.target.persistence_join,
        }
    }

    pub fn field(&self, wire_name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.wire_name == wire_name)
    }

    pub fn field_by_ident(&self, ident: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.ident == ident)
    }

    pub fn field_by_column(&self, column: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.column == column && f.stored())
    }

    pub(crate) fn position(&self, ident: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.ident == ident)
    }

    pub fn expiring(&self) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| matches!(f.kind, FieldKind::Expiring))
    }

    /// Resolves a wire name for a query modifier, rejecting relations.
    pub fn scalar_field(&self, wire_name: &str, action: &'static str) -> Result<&FieldDescriptor, QueryError> {
        let field = self
            .field(wire_name)
            .ok_or_else(|| QueryError::UnknownField { record: self.wire_type.clone(), field: wire_name.to_string() })?;
        if field.is_relation() {
            return Err(QueryError::RelationNotAllowed { field: wire_name.to_string(), action });
        }
        Ok(field)
    }

    /// `"alias"."column"`, safe to interpolate into SQL text.
    pub fn qualified(&self, field: &FieldDescriptor) -> String {
        format!("{}.{}", quote_ident(&self.alias), quote_ident(&field.column))
    }

    pub fn table_def(&self) -> TableDef {
        TableDef {
            table: self.table.clone(),
            primary_key: self.id().column.clone(),
            unique: self.fields.iter().filter(|f| f.unique && !f.is_id()).map(|f| f.column.clone()).collect(),
        }
    }

    /// Post-creation hook: asks storage to maintain timestamp and expiry columns.
    pub fn install_triggers(&self, sink: &dyn TriggerSink) -> Result<(), crate::error::StorageError> {
        sink.ensure_table(&self.table_def())?;
        for field in &self.fields {
            let trigger = match field.kind {
                FieldKind::Created => Trigger::AutoCreated { table: self.table.clone(), column: field.column.clone() },
                FieldKind::Updated => Trigger::AutoUpdated { table: self.table.clone(), column: field.column.clone() },
                FieldKind::Expiring => Trigger::Expire { table: self.table.clone(), column: field.column.clone() },
                _ => continue,
            };
            sink.install(trigger)?;
        }
        Ok(())
    }
}
