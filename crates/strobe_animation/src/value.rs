//! Dynamically typed attribute values
//!
//! Cycle entries and string-keyed attribute access carry [`AttrValue`]s so
//! that declarative configuration (TOML, JSON, or a DSL layer) can drive an
//! animation without knowing its Rust types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A loosely typed attribute or cycle value
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    /// Absent / unset
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<AttrValue>),
}

impl AttrValue {
    pub fn is_nil(&self) -> bool {
        matches!(self, AttrValue::Nil)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Non-negative integer view (counts)
    pub fn as_count(&self) -> Option<u64> {
        match self {
            AttrValue::Int(i) => u64::try_from(*i).ok(),
            _ => None,
        }
    }

    /// Numeric view, integers widened to floats
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Int(i) => Some(*i as f64),
            AttrValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[AttrValue]> {
        match self {
            AttrValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Interpret as a cycle: lists are taken as-is, scalars become a
    /// one-element cycle and `Nil` means no cycle
    pub fn into_cycle(self) -> Option<Vec<AttrValue>> {
        match self {
            AttrValue::Nil => None,
            AttrValue::List(items) => Some(items),
            scalar => Some(vec![scalar]),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            AttrValue::Nil => "nil",
            AttrValue::Bool(_) => "bool",
            AttrValue::Int(_) => "int",
            AttrValue::Float(_) => "float",
            AttrValue::Text(_) => "text",
            AttrValue::List(_) => "list",
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Nil => write!(f, "nil"),
            AttrValue::Bool(b) => write!(f, "{}", b),
            AttrValue::Int(i) => write!(f, "{}", i),
            AttrValue::Float(x) => write!(f, "{}", x),
            AttrValue::Text(s) => write!(f, "{}", s),
            AttrValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<i32> for AttrValue {
    fn from(value: i32) -> Self {
        AttrValue::Int(value.into())
    }
}

impl From<u64> for AttrValue {
    fn from(value: u64) -> Self {
        AttrValue::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Float(value)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

impl<T: Into<AttrValue>> From<Vec<T>> for AttrValue {
    fn from(values: Vec<T>) -> Self {
        AttrValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<AttrValue>> From<Option<T>> for AttrValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(AttrValue::Nil)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_becomes_single_cycle() {
        assert_eq!(
            AttrValue::from("red").into_cycle(),
            Some(vec![AttrValue::Text("red".into())])
        );
        assert_eq!(AttrValue::Nil.into_cycle(), None);
        assert_eq!(
            AttrValue::from(vec![1, 2]).into_cycle(),
            Some(vec![AttrValue::Int(1), AttrValue::Int(2)])
        );
    }

    #[test]
    fn test_numeric_views() {
        assert_eq!(AttrValue::Int(3).as_count(), Some(3));
        assert_eq!(AttrValue::Int(-1).as_count(), None);
        assert_eq!(AttrValue::Float(3.0).as_count(), None);
        assert_eq!(AttrValue::Int(2).as_f64(), Some(2.0));
        assert_eq!(AttrValue::Text("2".into()).as_f64(), None);
    }

    #[test]
    fn test_untagged_json() {
        let value: AttrValue = serde_json::from_str(r#"[1, 2.5, "x", true, null]"#).unwrap();
        assert_eq!(
            value,
            AttrValue::List(vec![
                AttrValue::Int(1),
                AttrValue::Float(2.5),
                AttrValue::Text("x".into()),
                AttrValue::Bool(true),
                AttrValue::Nil,
            ])
        );
        assert_eq!(value.to_string(), "[1, 2.5, x, true, nil]");
    }
}
