use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Universal result and argument type of the expression language.
///
/// `Empty` stands for "nothing here": the value of a missing key, of a JSON
/// `null`, or of the `null` literal. Its string form is the empty string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DynamicValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<DynamicValue>),
    Map(BTreeMap<String, DynamicValue>),
    Empty,
}

impl DynamicValue {
    /// Short type label used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            DynamicValue::Bool(_) => "bool",
            DynamicValue::Int(_) => "int",
            DynamicValue::Float(_) => "float",
            DynamicValue::String(_) => "string",
            DynamicValue::List(_) => "list",
            DynamicValue::Map(_) => "map",
            DynamicValue::Empty => "empty",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DynamicValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DynamicValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            DynamicValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Int and Float widened to f64; everything else is not a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DynamicValue::Int(i) => Some(*i as f64),
            DynamicValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, DynamicValue::List(_) | DynamicValue::Map(_))
    }

    /// Zero value of its type: Empty, "", false, 0, 0.0, [] or {}.
    pub fn is_blank(&self) -> bool {
        match self {
            DynamicValue::Empty => true,
            DynamicValue::Bool(b) => !*b,
            DynamicValue::Int(i) => *i == 0,
            DynamicValue::Float(f) => *f == 0.0,
            DynamicValue::String(s) => s.is_empty(),
            DynamicValue::List(l) => l.is_empty(),
            DynamicValue::Map(m) => m.is_empty(),
        }
    }

    /// Compact JSON text, the canonical form of lists and maps.
    pub fn to_json_string(&self) -> String {
        // Keys are strings and non-finite floats serialize as null, so this cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Natural string form: scalars print bare, Empty prints nothing, lists and
/// maps print as compact JSON.
impl fmt::Display for DynamicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DynamicValue::Bool(b) => write!(f, "{b}"),
            DynamicValue::Int(i) => write!(f, "{i}"),
            DynamicValue::Float(x) => write!(f, "{x}"),
            DynamicValue::String(s) => f.write_str(s),
            DynamicValue::Empty => Ok(()),
            DynamicValue::List(_) | DynamicValue::Map(_) => f.write_str(&self.to_json_string()),
        }
    }
}

/// Structural equality, spelled out per variant.
///
/// Int and Float compare numerically. Empty equals Empty and the empty string.
/// Lists compare element-wise, maps key by key. Any other pair of variants is
/// unequal.
impl PartialEq for DynamicValue {
    fn eq(&self, other: &Self) -> bool {
        use DynamicValue::*;
        match (self, other) {
            (Bool(a), Bool(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (Int(a), Float(b)) | (Float(b), Int(a)) => (*a as f64) == *b,
            (String(a), String(b)) => a == b,
            (Empty, Empty) => true,
            (Empty, String(s)) | (String(s), Empty) => s.is_empty(),
            (List(a), List(b)) => a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x == y),
            (Map(a), Map(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(k, v)| b.get(k).map_or(false, |w| v == w))
            }
            _ => false,
        }
    }
}

impl From<Value> for DynamicValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => DynamicValue::Empty,
            Value::Bool(b) => DynamicValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => DynamicValue::Int(i),
                None => DynamicValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => DynamicValue::String(s),
            Value::Array(items) => DynamicValue::List(items.into_iter().map(Into::into).collect()),
            Value::Object(map) => {
                DynamicValue::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<&DynamicValue> for Value {
    fn from(value: &DynamicValue) -> Self {
        match value {
            DynamicValue::Empty => Value::Null,
            DynamicValue::Bool(b) => Value::Bool(*b),
            DynamicValue::Int(i) => Value::from(*i),
            DynamicValue::Float(f) => Value::from(*f),
            DynamicValue::String(s) => Value::String(s.clone()),
            DynamicValue::List(items) => Value::Array(items.iter().map(Into::into).collect()),
            DynamicValue::Map(map) => {
                Value::Object(map.iter().map(|(k, v)| (k.clone(), v.into())).collect())
            }
        }
    }
}

impl From<bool> for DynamicValue {
    fn from(b: bool) -> Self {
        DynamicValue::Bool(b)
    }
}

impl From<i64> for DynamicValue {
    fn from(i: i64) -> Self {
        DynamicValue::Int(i)
    }
}

impl From<f64> for DynamicValue {
    fn from(f: f64) -> Self {
        DynamicValue::Float(f)
    }
}

impl From<&str> for DynamicValue {
    fn from(s: &str) -> Self {
        DynamicValue::String(s.to_string())
    }
}

impl From<String> for DynamicValue {
    fn from(s: String) -> Self {
        DynamicValue::String(s)
    }
}

impl From<Vec<DynamicValue>> for DynamicValue {
    fn from(items: Vec<DynamicValue>) -> Self {
        DynamicValue::List(items)
    }
}

impl From<BTreeMap<String, DynamicValue>> for DynamicValue {
    fn from(map: BTreeMap<String, DynamicValue>) -> Self {
        DynamicValue::Map(map)
    }
}
