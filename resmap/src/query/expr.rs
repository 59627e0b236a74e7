use crate::naming::quote_ident;
use crate::storage::Row;
use crate::value::Value;
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CompareOp {
    Eq,
    Ne,
    Like,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Like => "LIKE",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }

    /// SQL semantics: any comparison involving NULL is false.
    pub fn holds(&self, left: &Value, right: &Value) -> bool {
        if left.is_null() || right.is_null() {
            return false;
        }
        if let CompareOp::Like = self {
            return match (left, right) {
                (Value::Text(text), Value::Text(pattern)) => like(text, pattern),
                _ => false,
            };
        }
        match left.compare(right) {
            Some(ord) => match self {
                CompareOp::Eq => ord == Ordering::Equal,
                CompareOp::Ne => ord != Ordering::Equal,
                CompareOp::Lt => ord == Ordering::Less,
                CompareOp::Le => ord != Ordering::Greater,
                CompareOp::Gt => ord == Ordering::Greater,
                CompareOp::Ge => ord != Ordering::Less,
                CompareOp::Like => false,
            },
            None => false,
        }
    }
}

/// `%` matches any run of characters, `_` exactly one.
fn like(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    // matches[j]: pattern[..i] matches text[..j]
    let mut matches = vec![false; text.len() + 1];
    matches[0] = true;
    for p in &pattern {
        let mut next = vec![false; text.len() + 1];
        match p {
            '%' => {
                let mut seen = false;
                for j in 0..=text.len() {
                    seen |= matches[j];
                    next[j] = seen;
                }
            }
            _ => {
                for j in 1..=text.len() {
                    next[j] = matches[j - 1] && (*p == '_' || *p == text[j - 1]);
                }
            }
        }
        matches = next;
    }
    matches[text.len()]
}

/// Alias-qualified column reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub alias: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(alias: impl Into<String>, column: impl Into<String>) -> Self {
        ColumnRef { alias: alias.into(), column: column.into() }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", quote_ident(&self.alias), quote_ident(&self.column))
    }
}

/// Predicate tree handed to a query target. Values are always bound, never interpolated.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Compare { column: ColumnRef, op: CompareOp, value: Value },
    IsNull(ColumnRef),
    IsNotNull(ColumnRef),
    And(Vec<Expr>),
    Or(Vec<Expr>),
}

impl Expr {
    pub fn compare(column: ColumnRef, op: CompareOp, value: Value) -> Self {
        Expr::Compare { column, op, value }
    }

    /// Collapses single-element groups.
    pub fn all(mut parts: Vec<Expr>) -> Self {
        if parts.len() == 1 { parts.remove(0) } else { Expr::And(parts) }
    }

    pub fn any(mut parts: Vec<Expr>) -> Self {
        if parts.len() == 1 { parts.remove(0) } else { Expr::Or(parts) }
    }

    pub fn to_sql(&self) -> (String, Vec<Value>) {
        let mut sql = String::new();
        let mut params = Vec::new();
        self.render(&mut sql, &mut params);
        (sql, params)
    }

    pub(crate) fn render(&self, sql: &mut String, params: &mut Vec<Value>) {
        let (parts, sep) = match self {
            Expr::Compare { column, op, value } => {
                sql.push_str(&format!("{column} {} ?", op.sql()));
                params.push(value.clone());
                return;
            }
            Expr::IsNull(column) => {
                sql.push_str(&format!("{column} IS NULL"));
                return;
            }
            Expr::IsNotNull(column) => {
                sql.push_str(&format!("{column} IS NOT NULL"));
                return;
            }
            Expr::And(parts) => (parts, " AND "),
            Expr::Or(parts) => (parts, " OR "),
        };
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                sql.push_str(sep);
            }
            match part {
                Expr::Compare { .. } | Expr::IsNull(_) | Expr::IsNotNull(_) => part.render(sql, params),
                _ => {
                    sql.push('(');
                    part.render(sql, params);
                    sql.push(')');
                }
            }
        }
    }

    /// Evaluates against a single-table row; the alias is ignored.
    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Expr::Compare { column, op, value } => row.get(&column.column).is_some_and(|v| op.holds(v, value)),
            Expr::IsNull(column) => row.get(&column.column).map_or(true, Value::is_null),
            Expr::IsNotNull(column) => row.get(&column.column).is_some_and(|v| !v.is_null()),
            Expr::And(parts) => parts.iter().all(|p| p.matches(row)),
            Expr::Or(parts) => parts.iter().any(|p| p.matches(row)),
        }
    }
}
