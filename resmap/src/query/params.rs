//! Bracket-notation query parameters: `filter[field][op]`, `fields[type]`, `page[key]` and `sort`.

use crate::config::PaginationConfig;
use crate::error::QueryError;
use crate::query::filter::{FilterMap, FilterOp};
use crate::query::page::Page;
use crate::query::sort::SortKey;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    pub filter: FilterMap,
    /// Sparse fieldsets by wire type.
    pub fields: BTreeMap<String, Vec<String>>,
    pub sort: Vec<SortKey>,
    pub page: BTreeMap<String, String>,
}

/// `name[a][b]` → (`name`, [`a`, `b`]).
fn split_key(key: &str) -> Result<(&str, Vec<&str>), QueryError> {
    let malformed = || QueryError::Malformed(key.to_string());
    let (name, mut rest) = match key.find('[') {
        Some(i) => (&key[..i], &key[i..]),
        None => (key, ""),
    };
    let mut segments = Vec::new();
    while !rest.is_empty() {
        let inner = rest.strip_prefix('[').ok_or_else(malformed)?;
        let end = inner.find(']').ok_or_else(malformed)?;
        if end == 0 {
            return Err(malformed());
        }
        segments.push(&inner[..end]);
        rest = &inner[end + 1..];
    }
    Ok((name, segments))
}

fn values(raw: &str) -> impl Iterator<Item = String> + '_ {
    raw.split(',').map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

impl QueryParams {
    /// Parses a raw query string (without the leading `?`).
    pub fn parse(raw: &str) -> Result<Self, QueryError> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(raw).map_err(|e| QueryError::Malformed(e.to_string()))?;
        Self::from_pairs(pairs)
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Result<Self, QueryError> {
        let mut params = QueryParams::default();
        for (key, value) in pairs {
            let (name, segments) = split_key(&key)?;
            match (name, segments.as_slice()) {
                ("filter", [field]) => {
                    params.filter.entry(field.to_string()).or_default().entry(FilterOp::Eq).or_default().extend(values(&value));
                }
                ("filter", [field, op]) => {
                    let op: FilterOp = op.parse()?;
                    params.filter.entry(field.to_string()).or_default().entry(op).or_default().extend(values(&value));
                }
                ("fields", [wire_type]) => {
                    params.fields.entry(wire_type.to_string()).or_default().extend(values(&value));
                }
                ("page", [param]) => {
                    params.page.insert(param.to_string(), value);
                }
                ("sort", []) => params.sort.extend(SortKey::parse_list(&value)),
                ("filter" | "fields" | "page" | "sort", _) => return Err(QueryError::Malformed(key.clone())),
                _ => return Err(QueryError::UnknownParameter(key.clone())),
            }
        }
        Ok(params)
    }

    pub fn page(&self, config: &PaginationConfig) -> Result<Option<Page>, QueryError> {
        Page::parse(&self.page, config)
    }

    pub fn fieldset(&self, wire_type: &str) -> Option<&[String]> {
        self.fields.get(wire_type).map(Vec::as_slice)
    }
}
