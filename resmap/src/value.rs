//! Representation-neutral scalar values and their conversions.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

/// The allow-list of member types an attribute may have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Primitive {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    String,
    Time,
}

impl Primitive {
    pub fn name(&self) -> &'static str {
        match self {
            Primitive::Bool => "bool",
            Primitive::I8 => "i8",
            Primitive::I16 => "i16",
            Primitive::I32 => "i32",
            Primitive::I64 => "i64",
            Primitive::U8 => "u8",
            Primitive::U16 => "u16",
            Primitive::U32 => "u32",
            Primitive::U64 => "u64",
            Primitive::F32 => "f32",
            Primitive::F64 => "f64",
            Primitive::String => "String",
            Primitive::Time => "DateTime<Utc>",
        }
    }

    pub fn is_signed(&self) -> bool {
        matches!(self, Primitive::I8 | Primitive::I16 | Primitive::I32 | Primitive::I64)
    }

    pub fn is_unsigned(&self) -> bool {
        matches!(self, Primitive::U8 | Primitive::U16 | Primitive::U32 | Primitive::U64)
    }

    pub fn is_integer(&self) -> bool {
        self.is_signed() || self.is_unsigned()
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Primitive::F32 | Primitive::F64)
    }

    fn int_bounds(&self) -> (i128, i128) {
        match self {
            Primitive::I8 => (i8::MIN as i128, i8::MAX as i128),
            Primitive::I16 => (i16::MIN as i128, i16::MAX as i128),
            Primitive::I32 => (i32::MIN as i128, i32::MAX as i128),
            Primitive::I64 => (i64::MIN as i128, i64::MAX as i128),
            Primitive::U8 => (0, u8::MAX as i128),
            Primitive::U16 => (0, u16::MAX as i128),
            Primitive::U32 => (0, u32::MAX as i128),
            _ => (0, u64::MAX as i128),
        }
    }

    fn integer(&self, n: i128) -> Option<Value> {
        let (lo, hi) = self.int_bounds();
        if n < lo || n > hi {
            None
        } else if self.is_signed() {
            Some(Value::Int(n as i64))
        } else {
            Some(Value::UInt(n as u64))
        }
    }

    /// Parses the textual form used in query parameters, annotation defaults and wire ids.
    pub fn parse(&self, raw: &str) -> Result<Value, ValueError> {
        let fail = || ValueError::new(self.name(), raw);
        match self {
            Primitive::Bool => match raw {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(fail()),
            },
            p if p.is_integer() => raw.trim().parse::<i128>().ok().and_then(|n| p.integer(n)).ok_or_else(fail),
            p if p.is_float() => raw.trim().parse::<f64>().map(Value::Float).map_err(|_| fail()),
            Primitive::String => Ok(Value::Text(raw.to_string())),
            _ => DateTime::parse_from_rfc3339(raw)
                .map(|t| Value::Time(t.with_timezone(&Utc)))
                .map_err(|_| fail()),
        }
    }

    /// Normalizes `value` into the canonical variant for this primitive, `Null` passes through.
    pub fn coerce(&self, value: Value) -> Result<Value, ValueError> {
        let found = value.describe();
        let fail = || ValueError { expected: self.name(), found: found.clone() };
        match (self, value) {
            (_, Value::Null) => Ok(Value::Null),
            (Primitive::Bool, Value::Bool(b)) => Ok(Value::Bool(b)),
            (p, Value::Int(i)) if p.is_integer() => p.integer(i as i128).ok_or_else(fail),
            (p, Value::UInt(u)) if p.is_integer() => p.integer(u as i128).ok_or_else(fail),
            (p, Value::Float(f)) if p.is_float() => Ok(Value::Float(f)),
            (p, Value::Int(i)) if p.is_float() => Ok(Value::Float(i as f64)),
            (p, Value::UInt(u)) if p.is_float() => Ok(Value::Float(u as f64)),
            (Primitive::String, Value::Text(s)) => Ok(Value::Text(s)),
            (Primitive::Time, Value::Time(t)) => Ok(Value::Time(t)),
            (Primitive::Time, Value::Text(s)) => Primitive::Time.parse(&s),
            _ => Err(fail()),
        }
    }

    pub fn from_json(&self, json: &serde_json::Value) -> Result<Value, ValueError> {
        let value = match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(u) = n.as_u64() {
                    Value::UInt(u)
                } else if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    n.as_f64()
                        .filter(|f| f.is_finite())
                        .map(Value::Float)
                        .ok_or_else(|| ValueError::new(self.name(), &n.to_string()))?
                }
            }
            serde_json::Value::String(s) => Value::Text(s.clone()),
            other => return Err(ValueError::new(self.name(), &other.to_string())),
        };
        self.coerce(value)
    }
}

/// Tagged neutral value held by a schema instance slot.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Time(DateTime<Utc>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Zero values are omitted from wire payloads of `omitempty` members.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(b) => !b,
            Value::Int(i) => *i == 0,
            Value::UInt(u) => *u == 0,
            Value::Float(f) => *f == 0.0,
            Value::Text(s) => s.is_empty(),
            Value::Time(_) => false,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Text(s) => format!("\"{s}\""),
            other => other.to_string(),
        }
    }

    /// SQL-like comparison: `None` whenever either side is null or the kinds are unrelated.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::UInt(a), Value::UInt(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::UInt(b)) => Some((*a as i128).cmp(&(*b as i128))),
            (Value::UInt(a), Value::Int(b)) => Some((*a as i128).cmp(&(*b as i128))),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Time(a), Value::Time(b)) => Some(a.cmp(b)),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => None,
            },
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::UInt(u) => Some(*u as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::UInt(u) => serde_json::Value::from(*u),
            Value::Float(f) => serde_json::Number::from_f64(*f).map(serde_json::Value::Number).unwrap_or(serde_json::Value::Null),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Time(t) => serde_json::Value::String(t.to_rfc3339()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::UInt(u) => write!(f, "{u}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => f.write_str(s),
            Value::Time(t) => f.write_str(&t.to_rfc3339()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueError {
    pub expected: &'static str,
    pub found: String,
}

impl ValueError {
    pub fn new(expected: &'static str, found: &str) -> Self {
        ValueError { expected, found: found.to_string() }
    }
}

impl fmt::Display for ValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected {}, found {}", self.expected, self.found)
    }
}

impl std::error::Error for ValueError {}

pub trait ToValue {
    fn to_value(&self) -> Value;
}

pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, ValueError>;
}

macro_rules! impl_integer_value {
    ($($t:ty => $p:ident),*) => {
        $(
            impl ToValue for $t {
                fn to_value(&self) -> Value {
                    Primitive::$p.integer(*self as i128).unwrap_or(Value::Null)
                }
            }

            impl FromValue for $t {
                fn from_value(value: Value) -> Result<Self, ValueError> {
                    let found = value.describe();
                    match Primitive::$p.coerce(value) {
                        Ok(Value::Int(i)) => <$t>::try_from(i).map_err(|_| ValueError::new(stringify!($t), &found)),
                        Ok(Value::UInt(u)) => <$t>::try_from(u).map_err(|_| ValueError::new(stringify!($t), &found)),
                        _ => Err(ValueError::new(stringify!($t), &found)),
                    }
                }
            }
        )*
    };
}

impl_integer_value!(i8 => I8, i16 => I16, i32 => I32, i64 => I64, u8 => U8, u16 => U16, u32 => U32, u64 => U64);

impl ToValue for f64 {
    fn to_value(&self) -> Value { Value::Float(*self) }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        let found = value.describe();
        match Primitive::F64.coerce(value) {
            Ok(Value::Float(f)) => Ok(f),
            _ => Err(ValueError::new("f64", &found)),
        }
    }
}

impl ToValue for f32 {
    fn to_value(&self) -> Value { Value::Float(*self as f64) }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        f64::from_value(value).map(|f| f as f32).map_err(|e| ValueError { expected: "f32", ..e })
    }
}

impl ToValue for bool {
    fn to_value(&self) -> Value { Value::Bool(*self) }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(ValueError::new("bool", &other.describe())),
        }
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value { Value::Text(self.clone()) }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Text(s) => Ok(s),
            other => Err(ValueError::new("String", &other.describe())),
        }
    }
}

impl ToValue for DateTime<Utc> {
    fn to_value(&self) -> Value { Value::Time(*self) }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        let found = value.describe();
        match Primitive::Time.coerce(value) {
            Ok(Value::Time(t)) => Ok(t),
            _ => Err(ValueError::new("DateTime<Utc>", &found)),
        }
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        self.as_ref().map(ToValue::to_value).unwrap_or(Value::Null)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn integer_coercion_respects_width() {
        assert_eq!(Primitive::U8.coerce(Value::Int(255)), Ok(Value::UInt(255)));
        assert!(Primitive::U8.coerce(Value::Int(256)).is_err());
        assert!(Primitive::U32.coerce(Value::Int(-1)).is_err());
        assert_eq!(Primitive::I16.parse("-12"), Ok(Value::Int(-12)));
        assert!(Primitive::I16.parse("12.5").is_err());
    }

    #[test]
    fn comparison_crosses_numeric_kinds_but_not_null() {
        assert_eq!(Value::Int(-1).compare(&Value::UInt(0)), Some(Ordering::Less));
        assert_eq!(Value::Float(2.5).compare(&Value::Int(2)), Some(Ordering::Greater));
        assert_eq!(Value::Null.compare(&Value::Null), None);
        assert_eq!(Value::Text("a".into()).compare(&Value::Int(1)), None);
    }

    #[test]
    fn primitives_move_through_values() {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(DateTime::<Utc>::from_value(Value::Text(t.to_rfc3339())), Ok(t));
        assert_eq!(i32::from_value(7u8.to_value()), Ok(7));
        assert_eq!(Option::<String>::from_value(Value::Null), Ok(None));
        assert!(bool::from_value(Value::Int(1)).is_err());
        assert_eq!(Primitive::F32.from_json(&serde_json::json!(3)), Ok(Value::Float(3.0)));
    }

    #[test]
    fn json_numbers_keep_their_kind() {
        assert_eq!(Primitive::F64.from_json(&serde_json::json!(-2.5)), Ok(Value::Float(-2.5)));
        assert_eq!(Primitive::I64.from_json(&serde_json::json!(-3)), Ok(Value::Int(-3)));
        let err = Primitive::I64.from_json(&serde_json::json!(1.5)).unwrap_err();
        assert_eq!(err.expected, "i64");
        let err = Primitive::F64.from_json(&serde_json::json!([1.0])).unwrap_err();
        assert_eq!(err.found, "[1.0]");
    }
}
