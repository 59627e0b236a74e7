//! Contracts with the storage collaborator. Rows are flat column maps;
//! relation members of a Persistence record never reach storage.

pub mod memory;

use crate::error::StorageError;
use crate::query::SelectQuery;
use crate::value::Value;
use std::collections::BTreeMap;

pub use memory::MemoryStorage;

pub type Row = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDef {
    pub table: String,
    pub primary_key: String,
    pub unique: Vec<String>,
}

/// Storage-side behaviour requested by timestamp and expiring fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    AutoCreated { table: String, column: String },
    AutoUpdated { table: String, column: String },
    Expire { table: String, column: String },
}

impl Trigger {
    pub fn table(&self) -> &str {
        match self {
            Trigger::AutoCreated { table, .. } | Trigger::AutoUpdated { table, .. } | Trigger::Expire { table, .. } => table,
        }
    }
}

pub trait TriggerSink {
    fn ensure_table(&self, def: &TableDef) -> Result<(), StorageError>;
    fn install(&self, trigger: Trigger) -> Result<(), StorageError>;
}

pub trait Storage: TriggerSink + Send + Sync {
    fn select(&self, query: &SelectQuery) -> Result<Vec<Row>, StorageError>;

    /// Returns the stored row, including columns the storage populated.
    fn insert(&self, table: &str, row: Row) -> Result<Row, StorageError>;

    /// Overwrites the given columns of the row whose `key.0` column equals `key.1`.
    fn update(&self, table: &str, key: (&str, &Value), row: Row) -> Result<Row, StorageError>;

    fn delete(&self, table: &str, key: (&str, &Value)) -> Result<(), StorageError>;
}
