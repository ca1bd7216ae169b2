//! Typed key-value fields for structured records
//!
//! A `Field` is a closed tagged union: exactly one payload per kind, no
//! reflection. Rendering is deferred to format time so a disabled log
//! statement never pays for it. Truly unknown types are stringified at the
//! boundary via [`Field::display`].

use chrono::{DateTime, SecondsFormat, Utc};
use std::borrow::Cow;
use std::fmt;
use std::time::Duration;

/// The payload of a [`Field`].
#[derive(Debug, Clone)]
pub enum FieldValue {
    Str(Cow<'static, str>),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    Duration(Duration),
    Time(DateTime<Utc>),
    /// An error rendered to its display string at construction time.
    Error(String),
    /// Arbitrary structured data, stringified into JSON at the boundary.
    Json(serde_json::Value),
    Array(Vec<FieldValue>),
    Map(Vec<(String, FieldValue)>),
}

impl FieldValue {
    /// Convert to `serde_json::Value` for JSON formatting
    #[must_use]
    pub fn to_json_value(&self) -> serde_json::Value {
        match self {
            FieldValue::Str(s) => serde_json::Value::String(s.to_string()),
            FieldValue::Int(i) => serde_json::Value::Number((*i).into()),
            FieldValue::UInt(u) => serde_json::Value::Number((*u).into()),
            FieldValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            FieldValue::Bool(b) => serde_json::Value::Bool(*b),
            FieldValue::Duration(d) => serde_json::Value::String(format!("{:?}", d)),
            FieldValue::Time(t) => {
                serde_json::Value::String(t.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            FieldValue::Error(e) => serde_json::Value::String(e.clone()),
            FieldValue::Json(v) => v.clone(),
            FieldValue::Array(items) => {
                serde_json::Value::Array(items.iter().map(FieldValue::to_json_value).collect())
            }
            FieldValue::Map(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json_value()))
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Str(s) => write!(f, "{}", s),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::UInt(u) => write!(f, "{}", u),
            FieldValue::Float(fl) => write!(f, "{}", fl),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Duration(d) => write!(f, "{:?}", d),
            FieldValue::Time(t) => {
                write!(f, "{}", t.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            FieldValue::Error(e) => write!(f, "{}", e),
            FieldValue::Json(v) => write!(f, "{}", v),
            FieldValue::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            FieldValue::Map(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}={}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// An immutable key-value pair attached to a record.
///
/// Safe to share across threads once constructed.
#[derive(Debug, Clone)]
pub struct Field {
    pub key: Cow<'static, str>,
    pub value: FieldValue,
}

impl Field {
    fn with(key: impl Into<Cow<'static, str>>, value: FieldValue) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    pub fn string(key: impl Into<Cow<'static, str>>, value: impl Into<Cow<'static, str>>) -> Self {
        Self::with(key, FieldValue::Str(value.into()))
    }

    pub fn int(key: impl Into<Cow<'static, str>>, value: i64) -> Self {
        Self::with(key, FieldValue::Int(value))
    }

    pub fn uint(key: impl Into<Cow<'static, str>>, value: u64) -> Self {
        Self::with(key, FieldValue::UInt(value))
    }

    pub fn float(key: impl Into<Cow<'static, str>>, value: f64) -> Self {
        Self::with(key, FieldValue::Float(value))
    }

    pub fn bool(key: impl Into<Cow<'static, str>>, value: bool) -> Self {
        Self::with(key, FieldValue::Bool(value))
    }

    pub fn duration(key: impl Into<Cow<'static, str>>, value: Duration) -> Self {
        Self::with(key, FieldValue::Duration(value))
    }

    pub fn time(key: impl Into<Cow<'static, str>>, value: DateTime<Utc>) -> Self {
        Self::with(key, FieldValue::Time(value))
    }

    pub fn err(key: impl Into<Cow<'static, str>>, value: &dyn std::error::Error) -> Self {
        Self::with(key, FieldValue::Error(value.to_string()))
    }

    pub fn json(key: impl Into<Cow<'static, str>>, value: serde_json::Value) -> Self {
        Self::with(key, FieldValue::Json(value))
    }

    pub fn array(key: impl Into<Cow<'static, str>>, items: Vec<FieldValue>) -> Self {
        Self::with(key, FieldValue::Array(items))
    }

    pub fn map(key: impl Into<Cow<'static, str>>, entries: Vec<(String, FieldValue)>) -> Self {
        Self::with(key, FieldValue::Map(entries))
    }

    /// Fallback for values with no dedicated kind: stringify via `Display`.
    pub fn display(key: impl Into<Cow<'static, str>>, value: impl fmt::Display) -> Self {
        Self::with(key, FieldValue::Str(Cow::Owned(value.to_string())))
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_typed_constructors() {
        assert!(matches!(
            Field::string("k", "v").value,
            FieldValue::Str(_)
        ));
        assert!(matches!(Field::int("k", -1).value, FieldValue::Int(-1)));
        assert!(matches!(Field::uint("k", 7).value, FieldValue::UInt(7)));
        assert!(matches!(Field::bool("k", true).value, FieldValue::Bool(true)));
        assert!(matches!(
            Field::duration("k", Duration::from_secs(1)).value,
            FieldValue::Duration(_)
        ));
    }

    #[test]
    fn test_display_rendering() {
        assert_eq!(Field::string("user", "alice").to_string(), "user=alice");
        assert_eq!(Field::int("n", 42).to_string(), "n=42");
        assert_eq!(
            Field::duration("took", Duration::from_millis(250)).to_string(),
            "took=250ms"
        );
        assert_eq!(
            Field::array(
                "xs",
                vec![FieldValue::Int(1), FieldValue::Int(2)]
            )
            .to_string(),
            "xs=[1, 2]"
        );
    }

    #[test]
    fn test_err_field_stringifies() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let f = Field::err("cause", &io);
        assert_eq!(f.to_string(), "cause=gone");
    }

    #[test]
    fn test_json_value_conversion() {
        assert_eq!(Field::int("n", 3).value.to_json_value(), json!(3));
        assert_eq!(Field::bool("b", false).value.to_json_value(), json!(false));
        assert_eq!(
            Field::map(
                "m",
                vec![("a".to_string(), FieldValue::Int(1))]
            )
            .value
            .to_json_value(),
            json!({"a": 1})
        );
        // Non-finite floats degrade to null instead of panicking
        assert_eq!(
            Field::float("f", f64::NAN).value.to_json_value(),
            serde_json::Value::Null
        );
    }

    #[test]
    fn test_display_fallback_for_unknown_types() {
        let f = Field::display("addr", std::net::Ipv4Addr::LOCALHOST);
        assert_eq!(f.to_string(), "addr=127.0.0.1");
    }
}
