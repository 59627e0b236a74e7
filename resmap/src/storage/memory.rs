use crate::error::StorageError;
use crate::query::SelectQuery;
use crate::storage::{Row, Storage, TableDef, Trigger, TriggerSink};
use crate::value::Value;
use crate::debug;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct Table {
    def: Option<TableDef>,
    rows: Vec<Row>,
    next_id: u64,
    created: Vec<String>,
    updated: Vec<String>,
    expire: Option<String>,
}

impl Table {
    fn unique_columns(&self) -> Vec<&str> {
        match &self.def {
            Some(def) => std::iter::once(def.primary_key.as_str()).chain(def.unique.iter().map(String::as_str)).collect(),
            None => Vec::new(),
        }
    }

    fn position(&self, column: &str, key: &Value) -> Option<usize> {
        self.rows.iter().position(|r| r.get(column) == Some(key))
    }

    /// First unique column whose value in `row` is already taken by a row other than `skip`.
    fn conflict(&self, row: &Row, skip: Option<usize>) -> Option<String> {
        self.unique_columns().into_iter().find_map(|column| {
            let value = row.get(column).filter(|v| !v.is_null())?;
            self.rows
                .iter()
                .enumerate()
                .any(|(i, other)| Some(i) != skip && other.get(column) == Some(value))
                .then(|| column.to_string())
        })
    }

    fn expired(&self, row: &Row, now: &DateTime<Utc>) -> bool {
        match self.expire.as_ref().and_then(|c| row.get(c)) {
            Some(Value::Time(at)) => at <= now,
            _ => false,
        }
    }
}

/// Process-local storage backend for tests and demos.
pub struct MemoryStorage {
    tables: Mutex<HashMap<String, Table>>,
    clock: fn() -> DateTime<Utc>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        MemoryStorage::with_clock(Utc::now)
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clock(clock: fn() -> DateTime<Utc>) -> Self {
        MemoryStorage { tables: Mutex::new(HashMap::new()), clock }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Table>> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stored rows including expired ones.
    pub fn row_count(&self, table: &str) -> usize {
        self.lock().get(table).map(|t| t.rows.len()).unwrap_or(0)
    }

    pub fn triggers(&self, table: &str) -> Vec<Trigger> {
        let tables = self.lock();
        let Some(t) = tables.get(table) else { return Vec::new() };
        let created = t.created.iter().map(|c| Trigger::AutoCreated { table: table.to_string(), column: c.clone() });
        let updated = t.updated.iter().map(|c| Trigger::AutoUpdated { table: table.to_string(), column: c.clone() });
        let expire = t.expire.iter().map(|c| Trigger::Expire { table: table.to_string(), column: c.clone() });
        created.chain(updated).chain(expire).collect()
    }
}

fn unknown(table: &str) -> StorageError {
    StorageError::UnknownTable(table.to_string())
}

impl TriggerSink for MemoryStorage {
    fn ensure_table(&self, def: &TableDef) -> Result<(), StorageError> {
        let mut tables = self.lock();
        let table = tables.entry(def.table.clone()).or_default();
        if table.def.as_ref() != Some(def) {
            debug!("Memory table {} with primary key {} and unique {:?}", def.table, def.primary_key, def.unique);
            table.def = Some(def.clone());
        }
        Ok(())
    }

    fn install(&self, trigger: Trigger) -> Result<(), StorageError> {
        let mut tables = self.lock();
        let table = tables.get_mut(trigger.table()).ok_or_else(|| unknown(trigger.table()))?;
        match trigger {
            Trigger::AutoCreated { column, .. } if !table.created.contains(&column) => table.created.push(column),
            Trigger::AutoUpdated { column, .. } if !table.updated.contains(&column) => table.updated.push(column),
            Trigger::Expire { column, .. } => table.expire = Some(column),
            _ => {}
        }
        Ok(())
    }
}

impl Storage for MemoryStorage {
    fn select(&self, query: &SelectQuery) -> Result<Vec<Row>, StorageError> {
        let tables = self.lock();
        let table = tables.get(query.table()).ok_or_else(|| unknown(query.table()))?;
        let now = (self.clock)();
        let live = table.rows.iter().filter(|r| !table.expired(r, &now)).cloned();
        Ok(query.apply(live))
    }

    fn insert(&self, name: &str, mut row: Row) -> Result<Row, StorageError> {
        let mut tables = self.lock();
        let table = tables.get_mut(name).ok_or_else(|| unknown(name))?;
        let pk = table.def.as_ref().map(|d| d.primary_key.clone()).ok_or_else(|| unknown(name))?;
        match row.get(&pk) {
            None | Some(Value::Null) => {
                table.next_id += 1;
                row.insert(pk, Value::UInt(table.next_id));
            }
            Some(Value::UInt(id)) => table.next_id = table.next_id.max(*id),
            Some(Value::Int(id)) if *id > 0 => table.next_id = table.next_id.max(*id as u64),
            Some(_) => {}
        }
        let now = (self.clock)();
        for column in table.created.iter().chain(&table.updated) {
            row.insert(column.clone(), Value::Time(now));
        }
        if let Some(column) = table.conflict(&row, None) {
            return Err(StorageError::UniqueViolation { table: name.to_string(), column });
        }
        table.rows.push(row.clone());
        Ok(row)
    }

    fn update(&self, name: &str, key: (&str, &Value), changes: Row) -> Result<Row, StorageError> {
        let mut tables = self.lock();
        let table = tables.get_mut(name).ok_or_else(|| unknown(name))?;
        let idx = table
            .position(key.0, key.1)
            .ok_or_else(|| StorageError::NotFound { table: name.to_string(), id: key.1.to_string() })?;
        let mut row = table.rows[idx].clone();
        row.extend(changes);
        let now = (self.clock)();
        for column in &table.updated {
            row.insert(column.clone(), Value::Time(now));
        }
        if let Some(column) = table.conflict(&row, Some(idx)) {
            return Err(StorageError::UniqueViolation { table: name.to_string(), column });
        }
        table.rows[idx] = row.clone();
        Ok(row)
    }

    fn delete(&self, name: &str, key: (&str, &Value)) -> Result<(), StorageError> {
        let mut tables = self.lock();
        let table = tables.get_mut(name).ok_or_else(|| unknown(name))?;
        let idx = table
            .position(key.0, key.1)
            .ok_or_else(|| StorageError::NotFound { table: name.to_string(), id: key.1.to_string() })?;
        table.rows.remove(idx);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn storage() -> MemoryStorage {
        let storage = MemoryStorage::with_clock(fixed_now);
        let def = TableDef { table: "users".into(), primary_key: "id".into(), unique: vec!["email".into()] };
        storage.ensure_table(&def).unwrap();
        storage.install(Trigger::AutoCreated { table: "users".into(), column: "created_at".into() }).unwrap();
        storage.install(Trigger::Expire { table: "users".into(), column: "expires_at".into() }).unwrap();
        storage
    }

    fn user(email: &str) -> Row {
        Row::from([("email".to_string(), Value::Text(email.to_string()))])
    }

    #[test]
    fn assigns_ids_and_timestamps() {
        let storage = storage();
        let row = storage.insert("users", user("a@x")).unwrap();
        assert_eq!(row["id"], Value::UInt(1));
        assert_eq!(row["created_at"], Value::Time(fixed_now()));
        assert_eq!(storage.insert("users", user("b@x")).unwrap()["id"], Value::UInt(2));
    }

    #[test]
    fn unique_columns_are_enforced() {
        let storage = storage();
        storage.insert("users", user("a@x")).unwrap();
        let err = storage.insert("users", user("a@x")).unwrap_err();
        assert_eq!(err, StorageError::UniqueViolation { table: "users".into(), column: "email".into() });
        let second = storage.insert("users", user("b@x")).unwrap();
        let err = storage.update("users", ("id", &second["id"]), user("a@x")).unwrap_err();
        assert!(matches!(err, StorageError::UniqueViolation { .. }));
        assert!(storage.update("users", ("id", &second["id"]), user("b@x")).is_ok());
    }

    #[test]
    fn expired_rows_are_invisible() {
        let storage = storage();
        let mut row = user("old@x");
        row.insert("expires_at".into(), Value::Time(fixed_now() - chrono::Duration::hours(1)));
        storage.insert("users", row).unwrap();
        storage.insert("users", user("new@x")).unwrap();
        let rows = storage.select(&SelectQuery::new("users", "u")).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(storage.row_count("users"), 2);
        assert_eq!(storage.triggers("users").len(), 2);
    }

    #[test]
    fn missing_rows_and_tables() {
        let storage = storage();
        assert!(matches!(storage.delete("users", ("id", &Value::UInt(9))), Err(StorageError::NotFound { .. })));
        assert_eq!(storage.select(&SelectQuery::new("nope", "n")), Err(StorageError::UnknownTable("nope".into())));
    }
}
