use crate::error::QueryError;
use crate::query::expr::{ColumnRef, CompareOp, Expr};
use crate::query::statement::QueryTarget;
use crate::schema::Schema;
use crate::value::Primitive;
use crate::debug;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FilterOp {
    Eq,
    Ne,
    Like,
    Lt,
    Le,
    Gt,
    Ge,
}

impl FilterOp {
    pub fn token(&self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Ne => "ne",
            FilterOp::Like => "like",
            FilterOp::Lt => "lt",
            FilterOp::Le => "lte",
            FilterOp::Gt => "gt",
            FilterOp::Ge => "gte",
        }
    }

    pub fn compare_op(&self) -> CompareOp {
        match self {
            FilterOp::Eq => CompareOp::Eq,
            FilterOp::Ne => CompareOp::Ne,
            FilterOp::Like => CompareOp::Like,
            FilterOp::Lt => CompareOp::Lt,
            FilterOp::Le => CompareOp::Le,
            FilterOp::Gt => CompareOp::Gt,
            FilterOp::Ge => CompareOp::Ge,
        }
    }
}

impl FromStr for FilterOp {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "eq" => Ok(FilterOp::Eq),
            "ne" => Ok(FilterOp::Ne),
            "like" => Ok(FilterOp::Like),
            "lt" => Ok(FilterOp::Lt),
            "lte" => Ok(FilterOp::Le),
            "gt" => Ok(FilterOp::Gt),
            "gte" => Ok(FilterOp::Ge),
            _ => Err(QueryError::UnknownOperator(s.to_string())),
        }
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Wire name → operator → raw values.
pub type FilterMap = BTreeMap<String, BTreeMap<FilterOp, Vec<String>>>;

/// One predicate per filtered field: values ORed per operator, operators ANDed.
pub fn build(schema: &Schema, filters: &FilterMap) -> Result<Vec<Expr>, QueryError> {
    let mut predicates = Vec::with_capacity(filters.len());
    for (name, ops) in filters {
        let field = schema.scalar_field(name, "filter")?;
        if !field.filterable {
            debug!("Rejected filter on {}", field);
            return Err(QueryError::NotFilterable { field: name.clone() });
        }
        let primitive = field.primitive().unwrap_or(Primitive::String);
        let column = ColumnRef::new(&schema.alias, &field.column);
        let mut clauses = Vec::with_capacity(ops.len());
        for (op, values) in ops {
            if *op == FilterOp::Like && primitive != Primitive::String {
                return Err(QueryError::InvalidValue { field: name.clone(), value: values.join(","), expected: "a text field for `like`" });
            }
            let alternatives = values
                .iter()
                .map(|raw| {
                    primitive
                        .parse(raw)
                        .map(|value| Expr::compare(column.clone(), op.compare_op(), value))
                        .map_err(|e| QueryError::InvalidValue { field: name.clone(), value: raw.clone(), expected: e.expected })
                })
                .collect::<Result<Vec<_>, _>>()?;
            if !alternatives.is_empty() {
                clauses.push(Expr::any(alternatives));
            }
        }
        if !clauses.is_empty() {
            predicates.push(Expr::all(clauses));
        }
    }
    Ok(predicates)
}

/// Adds each field's predicate as its own conjunct. Nothing is added if any entry is rejected.
pub fn apply(schema: &Schema, filters: &FilterMap, target: &mut dyn QueryTarget) -> Result<(), QueryError> {
    for predicate in build(schema, filters)? {
        target.filter(predicate);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::Athlete;
    use crate::query::statement::SelectQuery;
    use crate::registry::Registry;
    use crate::storage::Row;
    use crate::value::Value;

    fn filters(entries: &[(&str, FilterOp, &[&str])]) -> FilterMap {
        let mut map = FilterMap::new();
        for (name, op, values) in entries {
            map.entry(name.to_string())
                .or_default()
                .insert(*op, values.iter().map(|v| v.to_string()).collect());
        }
        map
    }

    fn row(age: i64, name: &str) -> Row {
        Row::from([("age".to_string(), Value::Int(age)), ("name".to_string(), Value::Text(name.to_string()))])
    }

    #[test]
    fn ors_values_and_ands_fields() {
        let schema = Registry::new().register::<Athlete>().unwrap();
        let map = filters(&[("age", FilterOp::Gt, &["18"]), ("name", FilterOp::Eq, &["Ann", "Bob"])]);
        let mut query = SelectQuery::new(&schema.table, &schema.alias);
        apply(&schema, &map, &mut query).unwrap();

        let (sql, params) = query.to_sql();
        assert!(sql.ends_with(r#"WHERE ("a"."age" > ?) AND ("a"."name" = ? OR "a"."name" = ?)"#), "{sql}");
        assert_eq!(params, vec![Value::Int(18), Value::Text("Ann".into()), Value::Text("Bob".into())]);

        assert!(query.matches(&row(30, "Ann")));
        assert!(query.matches(&row(19, "Bob")));
        assert!(!query.matches(&row(18, "Ann")));
        assert!(!query.matches(&row(40, "Cid")));
    }

    #[test]
    fn operators_on_one_field_are_anded() {
        let schema = Registry::new().register::<Athlete>().unwrap();
        let map = filters(&[("age", FilterOp::Ge, &["18"]), ("age", FilterOp::Lt, &["65"])]);
        let predicates = build(&schema, &map).unwrap();
        assert_eq!(predicates.len(), 1);
        assert!(predicates[0].matches(&row(40, "x")));
        assert!(!predicates[0].matches(&row(70, "x")));
    }

    #[test]
    fn rejects_bad_fields_and_values() {
        let schema = Registry::new().register::<Athlete>().unwrap();
        let err = build(&schema, &filters(&[("age", FilterOp::Eq, &["old"])])).unwrap_err();
        assert_eq!(err, QueryError::InvalidValue { field: "age".into(), value: "old".into(), expected: "i64" });
        let err = build(&schema, &filters(&[("club", FilterOp::Eq, &["1"])])).unwrap_err();
        assert!(matches!(err, QueryError::RelationNotAllowed { action: "filter", .. }));
        let err = build(&schema, &filters(&[("secret", FilterOp::Eq, &["x"])])).unwrap_err();
        assert_eq!(err, QueryError::NotFilterable { field: "secret".into() });
        let err = build(&schema, &filters(&[("age", FilterOp::Like, &["1%"])])).unwrap_err();
        assert!(matches!(err, QueryError::InvalidValue { .. }));
        assert_eq!("gte".parse::<FilterOp>(), Ok(FilterOp::Ge));
        assert!("between".parse::<FilterOp>().is_err());
    }
}
