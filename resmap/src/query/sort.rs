use crate::error::QueryError;
use crate::field::FieldDescriptor;
use crate::query::expr::ColumnRef;
use crate::query::statement::QueryTarget;
use crate::schema::Schema;
use crate::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn sql(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: Direction,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        SortKey { field: field.into(), direction: Direction::Asc }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        SortKey { field: field.into(), direction: Direction::Desc }
    }

    /// `-name` sorts descending, `name` ascending.
    pub fn parse(token: &str) -> Self {
        match token.strip_prefix('-') {
            Some(field) => SortKey::desc(field),
            None => SortKey::asc(token),
        }
    }

    /// Comma-separated `sort` parameter value.
    pub fn parse_list(raw: &str) -> Vec<SortKey> {
        raw.split(',').map(str::trim).filter(|t| !t.is_empty()).map(SortKey::parse).collect()
    }
}

/// A sort key bound to its field.
#[derive(Debug, Clone)]
pub struct ResolvedKey<'s> {
    pub field: &'s FieldDescriptor,
    pub column: ColumnRef,
    pub direction: Direction,
}

pub fn resolve<'s>(schema: &'s Schema, keys: &[SortKey]) -> Result<Vec<ResolvedKey<'s>>, QueryError> {
    keys.iter()
        .map(|key| {
            let field = schema.scalar_field(&key.field, "sort")?;
            if !field.sortable {
                debug!("Rejected sort on {}", field);
                return Err(QueryError::NotSortable { field: key.field.clone() });
            }
            Ok(ResolvedKey { field, column: ColumnRef::new(&schema.alias, &field.column), direction: key.direction })
        })
        .collect()
}

/// Emits one ORDER BY entry per key, in order. Nothing is emitted if any key is rejected.
pub fn apply(schema: &Schema, keys: &[SortKey], target: &mut dyn QueryTarget) -> Result<(), QueryError> {
    for key in resolve(schema, keys)? {
        target.order_by(key.column, key.direction);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::Post;
    use crate::query::statement::SelectQuery;
    use crate::registry::Registry;

    #[test]
    fn parses_direction_prefix() {
        assert_eq!(SortKey::parse_list("-created-at, id"), vec![SortKey::desc("created-at"), SortKey::asc("id")]);
    }

    #[test]
    fn orders_in_given_sequence() {
        let schema = Registry::new().register::<Post>().unwrap();
        let mut query = SelectQuery::new(&schema.table, &schema.alias);
        apply(&schema, &SortKey::parse_list("-created-at,id"), &mut query).unwrap();
        let (sql, _) = query.to_sql();
        assert!(sql.ends_with(r#"ORDER BY "p"."created_at" DESC, "p"."id" ASC"#), "{sql}");
    }

    #[test]
    fn rejects_relations_and_unsortable_fields() {
        let schema = Registry::new().register::<Post>().unwrap();
        let mut query = SelectQuery::new(&schema.table, &schema.alias);
        let err = apply(&schema, &[SortKey::asc("title"), SortKey::asc("author")], &mut query).unwrap_err();
        assert!(matches!(err, QueryError::RelationNotAllowed { .. }));
        assert!(query.order().is_empty());
        let err = apply(&schema, &[SortKey::asc("views")], &mut query).unwrap_err();
        assert_eq!(err, QueryError::NotSortable { field: "views".into() });
        let err = apply(&schema, &[SortKey::asc("nope")], &mut query).unwrap_err();
        assert!(matches!(err, QueryError::UnknownField { .. }));
    }
}
