//! Parser for field annotation strings of the form `name,flag,key:value`.
//!
//! The first comma-separated token is the name (empty means "derive it"), the
//! remaining tokens are options. An option is either a bare `flag` or a
//! `key:value` pair, split at the first colon.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnnotationError {
    #[error("empty option at position {0}")]
    EmptyOption(usize),
    #[error("option `{0}` has an empty key")]
    EmptyKey(String),
    #[error("option `{0}` is given more than once")]
    Duplicate(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotation {
    pub name: Option<String>,
    pub options: Vec<(String, Option<String>)>,
}

impl Annotation {
    pub fn has(&self, key: &str) -> bool {
        self.options.iter().any(|(k, _)| k == key)
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.options.iter().find(|(k, _)| k == key).and_then(|(_, v)| v.as_deref())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.options.iter().map(|(k, _)| k.as_str())
    }
}

pub fn parse(raw: &str) -> Result<Annotation, AnnotationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Annotation::default());
    }
    let mut tokens = raw.split(',');
    let name = tokens.next().map(str::trim).filter(|n| !n.is_empty()).map(str::to_string);

    let mut options: Vec<(String, Option<String>)> = Vec::new();
    for (idx, token) in tokens.enumerate() {
        let token = token.trim();
        if token.is_empty() {
            return Err(AnnotationError::EmptyOption(idx + 1));
        }
        let (key, value) = match token.split_once(':') {
            Some((k, v)) => (k.trim(), Some(v.trim().to_string())),
            None => (token, None),
        };
        if key.is_empty() {
            return Err(AnnotationError::EmptyKey(token.to_string()));
        }
        if options.iter().any(|(k, _)| k == key) {
            return Err(AnnotationError::Duplicate(key.to_string()));
        }
        options.push((key.to_string(), value));
    }
    Ok(Annotation { name, options })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_name_flags_and_values() {
        let a = parse("created-at, notnull ,default:now(),column:created").unwrap();
        assert_eq!(a.name.as_deref(), Some("created-at"));
        assert!(a.has("notnull"));
        assert_eq!(a.value("notnull"), None);
        assert_eq!(a.value("default"), Some("now()"));
        assert_eq!(a.value("column"), Some("created"));
        assert_eq!(a.keys().collect::<Vec<_>>(), vec!["notnull", "default", "column"]);
    }

    #[test]
    fn empty_name_is_derived_later() {
        let a = parse(",unique").unwrap();
        assert_eq!(a.name, None);
        assert!(a.has("unique"));
        assert_eq!(parse("").unwrap(), Annotation::default());
    }

    #[test]
    fn rejects_malformed_options() {
        assert_eq!(parse("a,,b"), Err(AnnotationError::EmptyOption(1)));
        assert_eq!(parse("a,:x"), Err(AnnotationError::EmptyKey(":x".into())));
        assert_eq!(parse("a,unique,unique"), Err(AnnotationError::Duplicate("unique".into())));
    }
}
