//! Typed cell values.

use super::geometry::Geometry;
use super::schema::ColumnType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single cell of a dataset record.
///
/// Serialized untagged so records read and write as plain JSON objects:
/// `null`, booleans, numbers, strings, and GeoJSON geometry objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    /// The null marker. Coercion failures map here instead of raising.
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Geometry(Geometry),
}

impl Value {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The column type this value would naturally be declared as.
    pub fn natural_type(&self) -> Option<ColumnType> {
        match self {
            Self::Null => None,
            Self::Bool(_) => Some(ColumnType::Boolean),
            Self::Number(_) => Some(ColumnType::Numeric),
            Self::Text(_) => Some(ColumnType::Text),
            Self::Geometry(_) => Some(ColumnType::Geometry),
        }
    }

    /// Numeric view of this value, if it has one.
    ///
    /// Text is parsed after trimming; booleans map to 1/0. Non-finite
    /// results are treated as having no numeric value.
    pub fn as_f64(&self) -> Option<f64> {
        let number = match self {
            Self::Number(n) => *n,
            Self::Text(s) => s.trim().parse::<f64>().ok()?,
            Self::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Null | Self::Geometry(_) => return None,
        };
        number.is_finite().then_some(number)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_geometry(&self) -> Option<&Geometry> {
        match self {
            Self::Geometry(g) => Some(g),
            _ => None,
        }
    }

    /// Coerce to a numeric value. Anything without a numeric reading
    /// becomes [`Value::Null`]; this never fails.
    pub fn to_numeric(&self) -> Value {
        self.as_f64().map_or(Value::Null, Value::Number)
    }

    /// Coerce to a text value. Nulls stay null.
    pub fn to_text(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Text(s) => Value::Text(s.clone()),
            other => Value::Text(other.to_string()),
        }
    }

    /// Parse a raw delimited-text field, guided by a declared type if any.
    ///
    /// Empty fields are null. Without a declared type the narrowest
    /// matching type wins: boolean, then number, then text.
    pub fn parse_field(raw: &str, declared: Option<ColumnType>) -> Value {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Value::Null;
        }
        match declared {
            Some(ColumnType::Numeric) => Value::text(trimmed).to_numeric(),
            Some(ColumnType::Text) => Value::text(raw),
            Some(ColumnType::Boolean) => parse_bool(trimmed).map_or(Value::Null, Value::Bool),
            Some(ColumnType::Geometry) => serde_json::from_str::<Geometry>(trimmed)
                .map_or(Value::Null, Value::Geometry),
            None => {
                if let Some(b) = parse_bool(trimmed) {
                    Value::Bool(b)
                } else if let Some(n) = Value::text(trimmed).as_f64() {
                    Value::Number(n)
                } else {
                    Value::text(raw)
                }
            }
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Format a number the way it reads in a report: integral values without a
/// fractional part.
pub(crate) fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Number(n) => write!(f, "{}", format_number(*n)),
            Self::Text(s) => write!(f, "{}", s),
            Self::Geometry(g) => write!(f, "{}", g),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Geometry> for Value {
    fn from(g: Geometry) -> Self {
        Self::Geometry(g)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untagged_deserialization() {
        let values: Vec<Value> = serde_json::from_str(
            r#"[null, true, 12.5, "abc", {"type": "Point", "coordinates": [1.0, 2.0]}]"#,
        )
        .unwrap();
        assert_eq!(
            values,
            vec![
                Value::Null,
                Value::Bool(true),
                Value::Number(12.5),
                Value::text("abc"),
                Value::Geometry(Geometry::Point([1.0, 2.0])),
            ]
        );
    }

    #[test]
    fn test_numeric_coercion_never_fails() {
        assert_eq!(Value::text(" 1200 ").to_numeric(), Value::Number(1200.0));
        assert_eq!(Value::text("1.5e3").to_numeric(), Value::Number(1500.0));
        assert_eq!(Value::text("n/a").to_numeric(), Value::Null);
        assert_eq!(Value::text("NaN").to_numeric(), Value::Null);
        assert_eq!(Value::Bool(true).to_numeric(), Value::Number(1.0));
        assert_eq!(
            Value::Geometry(Geometry::Point([0.0, 0.0])).to_numeric(),
            Value::Null
        );
    }

    #[test]
    fn test_text_coercion_formats_integral_numbers() {
        assert_eq!(Value::Number(2019.0).to_text(), Value::text("2019"));
        assert_eq!(Value::Number(1.25).to_text(), Value::text("1.25"));
        assert_eq!(Value::Null.to_text(), Value::Null);
    }

    #[test]
    fn test_parse_field_inference() {
        assert_eq!(Value::parse_field("", None), Value::Null);
        assert_eq!(Value::parse_field("TRUE", None), Value::Bool(true));
        assert_eq!(Value::parse_field("42", None), Value::Number(42.0));
        assert_eq!(Value::parse_field("42 Main St", None), Value::text("42 Main St"));
        assert_eq!(
            Value::parse_field("007", Some(ColumnType::Text)),
            Value::text("007")
        );
        assert_eq!(
            Value::parse_field("abc", Some(ColumnType::Numeric)),
            Value::Null
        );
    }
}
