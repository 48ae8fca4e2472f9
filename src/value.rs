//! Dynamic values carried by attributes and generic data columns.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Tolerance used when deciding whether two numeric values differ.
pub const APPROX_TOLERANCE: f64 = 0.001;

/// A dynamically typed attribute or data value.
///
/// Numbers are the only variant that interpolates; every other variant
/// snaps to its final value when animated.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Absent value.
    #[default]
    Null,
    /// Boolean flag (e.g. visibility).
    Bool(bool),
    /// Any numeric value.
    Number(f64),
    /// Strings, including CSS colors and labels.
    Text(String),
    /// Ordered list (e.g. nested neighbor IDs).
    List(Vec<Value>),
    /// Named fields (e.g. a whole row of a linked data table).
    Record(BTreeMap<String, Value>),
}

impl Value {
    /// Numeric view of the value, if it is a number.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// String view of the value, if it is text.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Boolean view of the value, if it is a flag.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// List view of the value.
    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Record view of the value.
    #[must_use]
    pub fn as_record(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Record(fields) => Some(fields),
            _ => None,
        }
    }

    /// Field lookup on a record value.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.as_record().and_then(|fields| fields.get(name))
    }

    /// Whether this is [`Value::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Numeric value or `fallback`.
    #[must_use]
    pub fn number_or(&self, fallback: f64) -> f64 {
        self.as_f64().unwrap_or(fallback)
    }
}

/// Equality with a 0.001 tolerance for numbers; structural otherwise.
#[must_use]
pub fn approx_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            (x - y).abs() <= APPROX_TOLERANCE
        }
        _ => a == b,
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<f32> for Value {
    fn from(n: f32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(fields: BTreeMap<String, Value>) -> Self {
        Self::Record(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_compare_with_tolerance() {
        assert!(approx_equals(&Value::from(1.0), &Value::from(1.0009)));
        assert!(!approx_equals(&Value::from(1.0), &Value::from(1.002)));
    }

    #[test]
    fn non_numbers_compare_structurally() {
        assert!(approx_equals(&Value::from("red"), &Value::from("red")));
        assert!(!approx_equals(&Value::from("red"), &Value::from(1.0)));
        assert!(approx_equals(&Value::Null, &Value::Null));
    }

    #[test]
    fn json_records_deserialize_untagged() {
        let v: Value =
            serde_json::from_str(r#"{"x": 1, "color": "blue", "on": true}"#)
                .unwrap();
        assert_eq!(v.field("x"), Some(&Value::Number(1.0)));
        assert_eq!(v.field("color").and_then(Value::as_str), Some("blue"));
        assert_eq!(v.field("on").and_then(Value::as_bool), Some(true));
    }
}
