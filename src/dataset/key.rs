//! Record identity keys.

use super::value::{format_number, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical form of an identity-key value.
///
/// Keys compare by their canonical text so that a key read back as text
/// (`"1001"`) and the same key held as a number (`1001.0`) identify the same
/// record across runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordKey(String);

impl RecordKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Canonical key for a cell value. Null and geometry values cannot
    /// identify a record.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Text(s) => Some(Self(s.clone())),
            Value::Number(n) if n.is_finite() => Some(Self(format_number(*n))),
            Value::Bool(b) => Some(Self(b.to_string())),
            Value::Number(_) | Value::Null | Value::Geometry(_) => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
