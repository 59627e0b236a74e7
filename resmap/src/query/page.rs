//! Offset and keyset pagination.
//!
//! Keyset pages are located relative to a cursor row. For sort keys
//! `(k1,d1)..(kn,dn)` the predicate is built recursively:
//!
//! ```text
//! P(i) = (ki op(i) C.ki) AND ((ki <> C.ki) OR P(i+1))   for i < n, op widened to >= / <=
//! P(n) = (kn op(n) C.kn)                                 strict > / <
//! ```
//!
//! so later keys only matter while earlier keys tie with the cursor.

use crate::config::PaginationConfig;
use crate::error::QueryError;
use crate::instance::Instance;
use crate::query::expr::{ColumnRef, CompareOp, Expr};
use crate::query::sort::{self, Direction, ResolvedKey, SortKey};
use crate::query::statement::QueryTarget;
use crate::schema::Schema;
use crate::value::Value;
use crate::debug;
use std::collections::BTreeMap;
use std::sync::Arc;

pub const NUMBER: &str = "number";
pub const SIZE: &str = "size";
pub const AFTER: &str = "after";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Page {
    /// Zero-based page number.
    Offset { number: u64, size: u64 },
    /// `after` is the wire id of the last row of the previous page.
    Cursor { after: String, size: u64 },
}

fn integer(param: &str, raw: &str) -> Result<u64, QueryError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| QueryError::NotAnInteger { param: format!("page[{param}]"), value: raw.to_string() })
}

impl Page {
    /// Interprets raw `page[...]` parameters; `None` when none were given.
    pub fn parse(raw: &BTreeMap<String, String>, config: &PaginationConfig) -> Result<Option<Page>, QueryError> {
        if let Some(unknown) = raw.keys().find(|k| ![NUMBER, SIZE, AFTER].contains(&k.as_str())) {
            return Err(QueryError::UnknownPageParameter(unknown.clone()));
        }
        let number = raw.get(NUMBER).map(|v| integer(NUMBER, v)).transpose()?;
        let size = raw.get(SIZE).map(|v| integer(SIZE, v)).transpose()?;
        let after = raw.get(AFTER);
        if number.is_some() && after.is_some() {
            return Err(QueryError::ConflictingPagination);
        }
        if let Some(size) = size {
            check_size(size, config)?;
        }
        let size = size.unwrap_or(config.default_size);
        Ok(match (number, after) {
            (_, Some(after)) => Some(Page::Cursor { after: after.clone(), size }),
            (Some(number), None) => Some(Page::Offset { number, size }),
            (None, None) if raw.contains_key(SIZE) => Some(Page::Offset { number: 0, size }),
            (None, None) => None,
        })
    }

    pub fn size(&self) -> u64 {
        match self {
            Page::Offset { size, .. } | Page::Cursor { size, .. } => *size,
        }
    }
}

fn check_size(size: u64, config: &PaginationConfig) -> Result<(), QueryError> {
    if size == 0 {
        return Err(QueryError::EmptyPage);
    }
    if size > config.max_size {
        debug!("Rejected page size {} above {}", size, config.max_size);
        return Err(QueryError::PageSizeExceeded { requested: size, max: config.max_size });
    }
    Ok(())
}

/// `OFFSET number*size LIMIT size`. Nothing is emitted when the size is rejected.
pub fn apply_offset(number: u64, size: u64, config: &PaginationConfig, target: &mut dyn QueryTarget) -> Result<(), QueryError> {
    check_size(size, config)?;
    let offset = number
        .checked_mul(size)
        .ok_or_else(|| QueryError::NotAnInteger { param: format!("page[{NUMBER}]"), value: number.to_string() })?;
    target.offset(offset);
    target.limit(size);
    Ok(())
}

/// Sort keys used for keyset pages: the requested ones up to the id, with the id
/// appended as final tie-breaker when it was not requested.
pub fn keyset_keys<'s>(schema: &'s Schema, keys: &[SortKey]) -> Result<Vec<ResolvedKey<'s>>, QueryError> {
    let mut resolved = sort::resolve(schema, keys)?;
    match resolved.iter().position(|k| k.field.is_id()) {
        Some(at) => resolved.truncate(at + 1),
        None => {
            let id = schema.id();
            resolved.push(ResolvedKey { field: id, column: ColumnRef::new(&schema.alias, &id.column), direction: Direction::Asc });
        }
    }
    Ok(resolved)
}

/// One ORDER BY per keyset key, so offset and keyset pages share a total order.
pub fn apply_order(schema: &Schema, keys: &[SortKey], target: &mut dyn QueryTarget) -> Result<(), QueryError> {
    for key in keyset_keys(schema, keys)? {
        target.order_by(key.column, key.direction);
    }
    Ok(())
}

struct Bound {
    column: ColumnRef,
    direction: Direction,
    nullable: bool,
    value: Value,
}

/// The keyset predicate for rows strictly after `cursor` in the order given by `keys`.
pub fn cursor_predicate(keys: &[ResolvedKey<'_>], cursor: &Instance) -> Result<Expr, QueryError> {
    let bounds = keys
        .iter()
        .map(|k| {
            let value = cursor
                .value(k.field)
                .cloned()
                .ok_or_else(|| QueryError::InvalidCursor(format!("cursor has no value for `{}`", k.field.wire_name)))?;
            if k.field.is_id() && value.is_null() {
                return Err(QueryError::InvalidCursor("cursor has no id".to_string()));
            }
            Ok(Bound { column: k.column.clone(), direction: k.direction, nullable: k.field.nullable, value })
        })
        .collect::<Result<Vec<_>, QueryError>>()?;
    keyset(&bounds).ok_or_else(|| QueryError::InvalidCursor("no sort keys".to_string()))
}

/// Nulls order below every value, so a null cursor key is followed by the remaining
/// nulls (ascending) or by nothing on that key (descending), and a non-null cursor key
/// in descending order is followed by all nulls.
fn keyset(bounds: &[Bound]) -> Option<Expr> {
    let (bound, rest) = bounds.split_first()?;
    let next = keyset(rest);
    let column = &bound.column;
    if bound.value.is_null() {
        return match bound.direction {
            Direction::Asc => Some(match next {
                None => Expr::IsNotNull(column.clone()),
                Some(next) => Expr::Or(vec![Expr::IsNotNull(column.clone()), Expr::And(vec![Expr::IsNull(column.clone()), next])]),
            }),
            Direction::Desc => next.map(|next| Expr::And(vec![Expr::IsNull(column.clone()), next])),
        };
    }
    let op = match (bound.direction, next.is_none()) {
        (Direction::Asc, true) => CompareOp::Gt,
        (Direction::Asc, false) => CompareOp::Ge,
        (Direction::Desc, true) => CompareOp::Lt,
        (Direction::Desc, false) => CompareOp::Le,
    };
    let head = Expr::compare(column.clone(), op, bound.value.clone());
    let after = match next {
        None => head,
        Some(next) => Expr::And(vec![head, Expr::Or(vec![Expr::compare(column.clone(), CompareOp::Ne, bound.value.clone()), next])]),
    };
    Some(match (bound.direction, bound.nullable) {
        (Direction::Desc, true) => Expr::Or(vec![after, Expr::IsNull(column.clone())]),
        _ => after,
    })
}

/// Emits the keyset predicate, one ORDER BY per key (same keys and directions) and the limit.
pub fn apply_cursor(
    schema: &Arc<Schema>,
    keys: &[SortKey],
    cursor: &Instance,
    limit: Option<u64>,
    config: &PaginationConfig,
    target: &mut dyn QueryTarget,
) -> Result<(), QueryError> {
    if !Arc::ptr_eq(cursor.schema(), schema) {
        return Err(QueryError::InvalidCursor(format!("cursor is not a {} row", schema.wire_type)));
    }
    if let Some(size) = limit {
        check_size(size, config)?;
    }
    let predicate = cursor_predicate(&keyset_keys(schema, keys)?, cursor)?;
    target.filter(predicate);
    apply_order(schema, keys, target)?;
    if let Some(size) = limit {
        target.limit(size);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Slot;
    use crate::fixtures::{Athlete, Post};
    use crate::query::statement::SelectQuery;
    use crate::registry::Registry;
    use crate::storage::Row;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use proptest::prelude::*;

    fn raw(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn offset_page_two_of_ten() {
        let config = PaginationConfig::default();
        let page = Page::parse(&raw(&[("number", "2"), ("size", "10")]), &config).unwrap();
        assert_eq!(page, Some(Page::Offset { number: 2, size: 10 }));
        let mut query = SelectQuery::new("posts", "p");
        apply_offset(2, 10, &config, &mut query).unwrap();
        assert_eq!(query.offset_value(), Some(20));
        assert_eq!(query.limit_value(), Some(10));
        assert!(query.to_sql().0.ends_with("LIMIT 10 OFFSET 20"));
    }

    #[test]
    fn oversized_pages_build_nothing() {
        let config = PaginationConfig { default_size: 20, max_size: 100 };
        let err = Page::parse(&raw(&[("size", "500")]), &config).unwrap_err();
        assert_eq!(err.to_string(), "page size 500 exceeds the maximum of 100");
        let mut query = SelectQuery::new("posts", "p");
        assert!(apply_offset(0, 500, &config, &mut query).is_err());
        assert_eq!((query.offset_value(), query.limit_value()), (None, None));
    }

    #[test]
    fn page_parameter_errors() {
        let config = PaginationConfig::default();
        assert_eq!(Page::parse(&raw(&[("limit", "2")]), &config), Err(QueryError::UnknownPageParameter("limit".into())));
        assert!(matches!(Page::parse(&raw(&[("number", "two")]), &config), Err(QueryError::NotAnInteger { .. })));
        assert!(matches!(Page::parse(&raw(&[("number", "-1")]), &config), Err(QueryError::NotAnInteger { .. })));
        assert_eq!(Page::parse(&raw(&[("size", "0")]), &config), Err(QueryError::EmptyPage));
        assert_eq!(Page::parse(&raw(&[("number", "1"), ("after", "5")]), &config), Err(QueryError::ConflictingPagination));
        assert_eq!(Page::parse(&raw(&[("after", "5")]), &config), Ok(Some(Page::Cursor { after: "5".into(), size: 20 })));
        assert_eq!(Page::parse(&raw(&[]), &config), Ok(None));
    }

    fn post_row(created_at: DateTime<Utc>, id: u64) -> Row {
        Row::from([("created_at".to_string(), Value::Time(created_at)), ("id".to_string(), Value::UInt(id))])
    }

    #[test]
    fn cursor_desc_timestamp_then_id() {
        let registry = Registry::new();
        let schema = registry.register::<Post>().unwrap();
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let mut cursor = Instance::new(&schema);
        cursor.set_id(Value::UInt(5)).unwrap();
        cursor.set("created-at", Slot::Scalar(Value::Time(t))).unwrap();

        let mut query = SelectQuery::new(&schema.table, &schema.alias);
        let keys = SortKey::parse_list("-created-at,id");
        apply_cursor(&schema, &keys, &cursor, Some(10), &PaginationConfig::default(), &mut query).unwrap();

        let (sql, params) = query.to_sql();
        assert!(
            sql.contains(r#"WHERE ("p"."created_at" <= ? AND ("p"."created_at" <> ? OR "p"."id" > ?)) ORDER BY "p"."created_at" DESC, "p"."id" ASC LIMIT 10"#),
            "{sql}"
        );
        assert_eq!(params, vec![Value::Time(t), Value::Time(t), Value::UInt(5)]);

        let earlier = t - Duration::seconds(1);
        let later = t + Duration::seconds(1);
        assert!(query.matches(&post_row(earlier, 1)));
        assert!(query.matches(&post_row(t, 6)));
        assert!(!query.matches(&post_row(t, 5)), "cursor row itself");
        assert!(!query.matches(&post_row(t, 4)));
        assert!(!query.matches(&post_row(later, 9)));
    }

    #[test]
    fn id_is_appended_as_tie_breaker() {
        let schema = Registry::new().register::<Post>().unwrap();
        let keys = keyset_keys(&schema, &[SortKey::desc("created-at")]).unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys[1].field.is_id() && keys[1].direction == Direction::Asc);
        let keys = keyset_keys(&schema, &[SortKey::desc("id")]).unwrap();
        assert_eq!(keys.len(), 1);
    }

    #[test]
    fn cursor_from_another_schema_is_rejected() {
        let registry = Registry::new();
        let posts = registry.register::<Post>().unwrap();
        let athletes = registry.register::<Athlete>().unwrap();
        let cursor = Instance::new(&athletes);
        let mut query = SelectQuery::new(&posts.table, &posts.alias);
        let err = apply_cursor(&posts, &[], &cursor, None, &PaginationConfig::default(), &mut query).unwrap_err();
        assert!(matches!(err, QueryError::InvalidCursor(_)));
        assert!(query.predicates().is_empty());
    }

    fn expiring_row(id: u64, expires_at: Option<DateTime<Utc>>) -> Row {
        Row::from([("id".to_string(), Value::UInt(id)), ("expires_at".to_string(), expires_at.map_or(Value::Null, Value::Time))])
    }

    fn page_after(schema: &Arc<Schema>, keys: &[SortKey], row: &Row, rows: &[Row]) -> Vec<Value> {
        let mut cursor = Instance::new(schema);
        cursor.set_id(row["id"].clone()).unwrap();
        cursor.set("expires-at", Slot::Scalar(row["expires_at"].clone())).unwrap();
        let mut query = SelectQuery::new(&schema.table, &schema.alias);
        apply_cursor(schema, keys, &cursor, None, &PaginationConfig::default(), &mut query).unwrap();
        query.apply(rows.to_vec()).into_iter().map(|r| r["id"].clone()).collect()
    }

    #[test]
    fn null_keys_continue_the_walk() {
        let schema = Registry::new().register::<Post>().unwrap();
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let rows = vec![expiring_row(1, None), expiring_row(2, Some(t)), expiring_row(3, None)];

        let asc = SortKey::parse_list("expires-at");
        assert_eq!(page_after(&schema, &asc, &rows[0], &rows), vec![Value::UInt(3), Value::UInt(2)]);
        assert_eq!(page_after(&schema, &asc, &rows[2], &rows), vec![Value::UInt(2)]);

        let desc = SortKey::parse_list("-expires-at");
        assert_eq!(page_after(&schema, &desc, &rows[1], &rows), vec![Value::UInt(1), Value::UInt(3)]);
        assert_eq!(page_after(&schema, &desc, &rows[0], &rows), vec![Value::UInt(3)]);
    }

    #[test]
    fn null_cursor_key_renders_is_null_terms() {
        let schema = Registry::new().register::<Post>().unwrap();
        let mut cursor = Instance::new(&schema);
        cursor.set_id(Value::UInt(4)).unwrap();
        let mut query = SelectQuery::new(&schema.table, &schema.alias);
        apply_cursor(&schema, &SortKey::parse_list("expires-at"), &cursor, None, &PaginationConfig::default(), &mut query).unwrap();
        let (sql, params) = query.to_sql();
        assert!(sql.contains(r#"WHERE ("p"."expires_at" IS NOT NULL OR ("p"."expires_at" IS NULL AND "p"."id" > ?))"#), "{sql}");
        assert_eq!(params, vec![Value::UInt(4)]);
    }

    #[test]
    fn keys_after_the_id_are_dropped() {
        let schema = Registry::new().register::<Post>().unwrap();
        let keys = keyset_keys(&schema, &SortKey::parse_list("-id,title")).unwrap();
        assert_eq!(keys.len(), 1);
        assert!(keys[0].field.is_id());
    }

    proptest! {
        /// The keyset page after any row is exactly the rows that follow it in sort order.
        #[test]
        fn keyset_matches_sorted_suffix(ages in proptest::collection::vec(0i64..5, 1..40), pick in any::<prop::sample::Index>(), desc in any::<bool>()) {
            let registry = Registry::new();
            let schema = registry.register::<Athlete>().unwrap();
            let rows: Vec<Row> = ages
                .iter()
                .enumerate()
                .map(|(i, age)| Row::from([("id".to_string(), Value::UInt(i as u64)), ("age".to_string(), Value::Int(*age))]))
                .collect();
            let keys = vec![if desc { SortKey::desc("age") } else { SortKey::asc("age") }];

            let mut ordered = SelectQuery::new(&schema.table, &schema.alias);
            for key in keyset_keys(&schema, &keys).unwrap() {
                ordered.order_by(key.column, key.direction);
            }
            let sorted = ordered.apply(rows.clone());
            let at = pick.index(sorted.len());

            let mut cursor = Instance::new(&schema);
            cursor.set_id(sorted[at]["id"].clone()).unwrap();
            cursor.set("age", Slot::Scalar(sorted[at]["age"].clone())).unwrap();

            let mut query = SelectQuery::new(&schema.table, &schema.alias);
            apply_cursor(&schema, &keys, &cursor, None, &PaginationConfig::default(), &mut query).unwrap();
            prop_assert_eq!(query.apply(rows), sorted[at + 1..].to_vec());
        }

        /// Same walk over a nullable key: nulls sort lowest and are never skipped.
        #[test]
        fn keyset_matches_sorted_suffix_with_nulls(hours in proptest::collection::vec(proptest::option::of(0i64..4), 1..40), pick in any::<prop::sample::Index>(), desc in any::<bool>()) {
            let registry = Registry::new();
            let schema = registry.register::<Post>().unwrap();
            let base = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
            let rows: Vec<Row> = hours
                .iter()
                .enumerate()
                .map(|(i, h)| expiring_row(i as u64, h.map(|h| base + Duration::hours(h))))
                .collect();
            let keys = vec![if desc { SortKey::desc("expires-at") } else { SortKey::asc("expires-at") }];

            let mut ordered = SelectQuery::new(&schema.table, &schema.alias);
            for key in keyset_keys(&schema, &keys).unwrap() {
                ordered.order_by(key.column, key.direction);
            }
            let sorted = ordered.apply(rows.clone());
            let at = pick.index(sorted.len());
            let expected: Vec<Value> = sorted[at + 1..].iter().map(|r| r["id"].clone()).collect();
            prop_assert_eq!(page_after(&schema, &keys, &sorted[at], &rows), expected);
        }
    }
}
