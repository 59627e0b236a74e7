use crate::field::{FieldKind, Slot};
use crate::instance::Instance;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    NotNull,
    Required,
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::NotNull => f.write_str("must not be null"),
            Rule::Required => f.write_str("is a required relation"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Wire name of the offending field.
    pub field: String,
    pub rule: Rule,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{record}: {}", describe(.violations))]
pub struct ValidationErrors {
    pub record: String,
    pub violations: Vec<Violation>,
}

fn describe(violations: &[Violation]) -> String {
    violations.iter().map(|v| format!("`{}` {}", v.field, v.rule)).collect::<Vec<_>>().join(", ")
}

/// Collects every violated rule of `instance`. Ids and storage-maintained timestamps are not checked.
pub fn validate(instance: &Instance) -> Result<(), ValidationErrors> {
    let mut violations = Vec::new();
    for (field, slot) in instance.fields() {
        let rule = match (&field.kind, slot) {
            (FieldKind::Id { .. } | FieldKind::Created | FieldKind::Updated | FieldKind::Has(_), _) => None,
            (FieldKind::BelongsTo(_), Slot::One(None)) if !field.nullable => Some(Rule::Required),
            (_, Slot::Scalar(v)) if v.is_null() && !field.nullable && field.default.is_none() => Some(Rule::NotNull),
            _ => None,
        };
        if let Some(rule) = rule {
            violations.push(Violation { field: field.wire_name.clone(), rule });
        }
    }
    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors { record: instance.schema().wire_type.clone(), violations })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{Athlete, Post};
    use crate::registry::Registry;
    use crate::value::Value;

    #[test]
    fn collects_all_violations() {
        let schema = Registry::new().register::<Post>().unwrap();
        let instance = Instance::new(&schema);
        let err = validate(&instance).unwrap_err();
        assert_eq!(
            err.violations,
            vec![
                Violation { field: "title".into(), rule: Rule::NotNull },
                Violation { field: "author".into(), rule: Rule::Required },
            ]
        );
        assert_eq!(err.to_string(), "posts: `title` must not be null, `author` is a required relation");
    }

    #[test]
    fn optional_relations_and_defaults_pass() {
        let schema = Registry::new().register::<Athlete>().unwrap();
        let mut instance = Instance::new(&schema);
        instance.set("name", Slot::Scalar(Value::Text("Ann".into()))).unwrap();
        instance.set("age", Slot::Scalar(Value::Int(30))).unwrap();
        instance.set("secret", Slot::Scalar(Value::Text(String::new()))).unwrap();
        assert_eq!(validate(&instance), Ok(()));
    }
}
