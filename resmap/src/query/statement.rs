use crate::naming::quote_ident;
use crate::query::expr::{ColumnRef, Expr};
use crate::query::sort::Direction;
use crate::schema::Schema;
use crate::storage::Row;
use crate::value::Value;
use std::cmp::Ordering;

/// What the query builders need from a storage query object.
pub trait QueryTarget {
    fn select(&mut self, column: ColumnRef);
    /// Each call adds one parenthesized conjunct.
    fn filter(&mut self, predicate: Expr);
    fn order_by(&mut self, column: ColumnRef, direction: Direction);
    fn offset(&mut self, offset: u64);
    fn limit(&mut self, limit: u64);
}

/// Single-table SELECT: renders SQL with `?` placeholders and evaluates over in-memory rows.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    table: String,
    alias: String,
    columns: Vec<ColumnRef>,
    predicates: Vec<Expr>,
    order: Vec<(ColumnRef, Direction)>,
    offset: Option<u64>,
    limit: Option<u64>,
}

impl SelectQuery {
    pub fn new(table: &str, alias: &str) -> Self {
        SelectQuery {
            table: table.to_string(),
            alias: alias.to_string(),
            columns: Vec::new(),
            predicates: Vec::new(),
            order: Vec::new(),
            offset: None,
            limit: None,
        }
    }

    /// Selects every stored column of `schema`.
    pub fn for_schema(schema: &Schema) -> Self {
        let mut query = SelectQuery::new(&schema.table, &schema.alias);
        for field in schema.fields.iter().filter(|f| f.stored()) {
            query.select(ColumnRef::new(&schema.alias, &field.column));
        }
        query
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn predicates(&self) -> &[Expr] {
        &self.predicates
    }

    pub fn order(&self) -> &[(ColumnRef, Direction)] {
        &self.order
    }

    pub fn offset_value(&self) -> Option<u64> {
        self.offset
    }

    pub fn limit_value(&self) -> Option<u64> {
        self.limit
    }

    pub fn to_sql(&self) -> (String, Vec<Value>) {
        let mut params = Vec::new();
        let columns = if self.columns.is_empty() {
            format!("{}.*", quote_ident(&self.alias))
        } else {
            self.columns.iter().map(ColumnRef::to_string).collect::<Vec<_>>().join(", ")
        };
        let mut sql = format!("SELECT {columns} FROM {} AS {}", quote_ident(&self.table), quote_ident(&self.alias));
        for (i, predicate) in self.predicates.iter().enumerate() {
            sql.push_str(if i == 0 { " WHERE (" } else { " AND (" });
            predicate.render(&mut sql, &mut params);
            sql.push(')');
        }
        if !self.order.is_empty() {
            let order: Vec<String> = self.order.iter().map(|(c, d)| format!("{c} {}", d.sql())).collect();
            sql.push_str(&format!(" ORDER BY {}", order.join(", ")));
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }
        (sql, params)
    }

    pub fn matches(&self, row: &Row) -> bool {
        self.predicates.iter().all(|p| p.matches(row))
    }

    /// Ordering of two rows under this query's ORDER BY; nulls sort first.
    pub fn compare_rows(&self, a: &Row, b: &Row) -> Ordering {
        for (column, direction) in &self.order {
            let left = a.get(&column.column).unwrap_or(&Value::Null);
            let right = b.get(&column.column).unwrap_or(&Value::Null);
            let ord = match (left.is_null(), right.is_null()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                _ => left.compare(right).unwrap_or(Ordering::Equal),
            };
            let ord = if *direction == Direction::Desc { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    /// Runs the whole query over `rows`: filter, order, offset, limit.
    pub fn apply(&self, rows: impl IntoIterator<Item = Row>) -> Vec<Row> {
        let mut selected: Vec<Row> = rows.into_iter().filter(|r| self.matches(r)).collect();
        selected.sort_by(|a, b| self.compare_rows(a, b));
        let skip = self.offset.unwrap_or(0).min(usize::MAX as u64) as usize;
        let take = self.limit.map(|l| l.min(usize::MAX as u64) as usize).unwrap_or(usize::MAX);
        let projected = selected.into_iter().skip(skip).take(take);
        if self.columns.is_empty() {
            return projected.collect();
        }
        projected
            .map(|row| {
                self.columns
                    .iter()
                    .map(|c| (c.column.clone(), row.get(&c.column).cloned().unwrap_or(Value::Null)))
                    .collect()
            })
            .collect()
    }
}

impl QueryTarget for SelectQuery {
    fn select(&mut self, column: ColumnRef) {
        self.columns.push(column);
    }

    fn filter(&mut self, predicate: Expr) {
        self.predicates.push(predicate);
    }

    fn order_by(&mut self, column: ColumnRef, direction: Direction) {
        self.order.push((column, direction));
    }

    fn offset(&mut self, offset: u64) {
        self.offset = Some(offset);
    }

    fn limit(&mut self, limit: u64) {
        self.limit = Some(limit);
    }
}
