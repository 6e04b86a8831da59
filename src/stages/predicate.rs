use crate::dataset::{Record, Value};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    IsNull,
    NotNull,
}

impl PredicateOp {
    fn needs_value(self) -> bool {
        !matches!(self, Self::IsNull | Self::NotNull)
    }
}

/// A single-column test against a record.
///
/// Null cells only satisfy `is_null`; every comparison against a null cell
/// is false, `ne` included. Ordering ops compare numeric readings and are
/// false when either side has none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub column: String,
    pub op: PredicateOp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl Predicate {
    pub fn validate(&self) -> Result<(), String> {
        if self.column.trim().is_empty() {
            return Err("predicate column must not be empty".to_string());
        }
        let has_value = self.value.as_ref().is_some_and(|v| !v.is_null());
        match (self.op.needs_value(), has_value) {
            (true, false) => Err(format!(
                "predicate on '{}' needs a non-null value",
                self.column
            )),
            (false, true) => Err(format!(
                "null check on '{}' takes no value",
                self.column
            )),
            _ => Ok(()),
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        let cell = record.get(&self.column).unwrap_or(&Value::Null);
        match self.op {
            PredicateOp::IsNull => return cell.is_null(),
            PredicateOp::NotNull => return !cell.is_null(),
            _ => {}
        }
        let Some(expected) = self.value.as_ref() else {
            return false;
        };
        if cell.is_null() {
            return false;
        }
        match self.op {
            PredicateOp::Eq => loosely_equal(cell, expected),
            PredicateOp::Ne => !loosely_equal(cell, expected),
            PredicateOp::Gt => compare(cell, expected).is_some_and(|o| o.is_gt()),
            PredicateOp::Ge => compare(cell, expected).is_some_and(|o| o.is_ge()),
            PredicateOp::Lt => compare(cell, expected).is_some_and(|o| o.is_lt()),
            PredicateOp::Le => compare(cell, expected).is_some_and(|o| o.is_le()),
            PredicateOp::IsNull | PredicateOp::NotNull => false,
        }
    }
}

/// Numbers compare numerically (so `"12"` equals `12`), everything else by
/// exact value.
fn loosely_equal(cell: &Value, expected: &Value) -> bool {
    match expected {
        Value::Number(n) => cell.as_f64().is_some_and(|c| c == *n),
        _ => cell == expected,
    }
}

fn compare(cell: &Value, expected: &Value) -> Option<std::cmp::Ordering> {
    cell.as_f64()?.partial_cmp(&expected.as_f64()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::record;

    fn pred(op: PredicateOp, value: Option<Value>) -> Predicate {
        Predicate {
            column: "market_value".to_string(),
            op,
            value,
        }
    }

    #[test]
    fn test_numeric_comparisons() {
        let row = record([("market_value", Value::from(150_000.0))]);
        let limit = Some(Value::from(100_000.0));

        assert!(pred(PredicateOp::Gt, limit.clone()).matches(&row));
        assert!(pred(PredicateOp::Ge, limit.clone()).matches(&row));
        assert!(!pred(PredicateOp::Lt, limit.clone()).matches(&row));
        assert!(pred(PredicateOp::Ne, limit).matches(&row));

        let text_row = record([("market_value", Value::from("150000"))]);
        assert!(pred(PredicateOp::Eq, Some(Value::from(150_000.0))).matches(&text_row));
    }

    #[test]
    fn test_null_cells_only_match_null_checks() {
        let row = record([("market_value", Value::Null)]);
        assert!(pred(PredicateOp::IsNull, None).matches(&row));
        assert!(!pred(PredicateOp::NotNull, None).matches(&row));
        assert!(!pred(PredicateOp::Ne, Some(Value::from(1.0))).matches(&row));
        assert!(!pred(PredicateOp::Lt, Some(Value::from(1.0))).matches(&row));

        let missing = record([("other", Value::from(1.0))]);
        assert!(pred(PredicateOp::IsNull, None).matches(&missing));
    }

    #[test]
    fn test_validate_value_presence() {
        assert!(pred(PredicateOp::Eq, None).validate().is_err());
        assert!(pred(PredicateOp::Eq, Some(Value::Null)).validate().is_err());
        assert!(pred(PredicateOp::IsNull, Some(Value::from(1.0))).validate().is_err());
        assert!(pred(PredicateOp::NotNull, None).validate().is_ok());
    }
}
