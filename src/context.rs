use std::borrow::Cow;
use std::collections::BTreeMap;

use serde_json::Value;
use tracing::trace;

use crate::errors::{EvalError, Result};
use crate::value::DynamicValue;

/// Read-only store of named scopes (`git`, `job`, `steps`, ...) an evaluator
/// resolves variables against.
#[derive(Debug, Clone, Default)]
pub struct Context {
    scopes: BTreeMap<String, DynamicValue>,
}

/// One resolved path step. Index expressions are already reduced to integers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step<'a> {
    Key(&'a str),
    Index(i64),
    Filter,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scope(mut self, name: impl Into<String>, value: impl Into<DynamicValue>) -> Self {
        self.scopes.insert(name.into(), value.into());
        self
    }

    /// Build a context from a JSON object whose top-level keys are scopes.
    pub fn from_json(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self {
                scopes: map.into_iter().map(|(k, v)| (k, v.into())).collect(),
            }),
            other => Err(EvalError::invalid(format!(
                "context must be a JSON object, got {}",
                json_type(&other)
            ))),
        }
    }

    pub fn get(&self, name: &str) -> Option<&DynamicValue> {
        self.scopes.get(name)
    }

    pub fn scope(&self, name: &str) -> Result<&DynamicValue> {
        self.scopes
            .get(name)
            .ok_or_else(|| EvalError::UnknownScope(name.to_string()))
    }

    pub fn scope_names(&self) -> impl Iterator<Item = &str> {
        self.scopes.keys().map(String::as_str)
    }

    /// Walk `steps` starting from scope `root`.
    ///
    /// A missing scope is an error, a missing key below it is `Empty`. A filter
    /// step makes the next key a projection over a list of maps.
    pub fn resolve(&self, root: &str, steps: &[Step<'_>]) -> Result<DynamicValue> {
        let mut current = Cow::Borrowed(self.scope(root)?);
        let mut is_filter = false;
        let mut previous = None;
        for step in steps {
            trace!(?step, is_filter, "resolving path step");
            current = match *step {
                Step::Filter if previous == Some(Step::Filter) => {
                    return Err(EvalError::invalid("unable to filter a filtered object"));
                }
                Step::Filter => {
                    is_filter = true;
                    previous = Some(Step::Filter);
                    continue;
                }
                Step::Key(key) if is_filter => {
                    is_filter = false;
                    Cow::Owned(project(&current, key)?)
                }
                Step::Key(key) => select_key(current, key),
                Step::Index(index) => select_index(current, index)?,
            };
            previous = Some(*step);
        }
        Ok(current.into_owned())
    }
}

fn select_key<'v>(current: Cow<'v, DynamicValue>, key: &str) -> Cow<'v, DynamicValue> {
    match current {
        Cow::Borrowed(DynamicValue::Map(map)) => match map.get(key) {
            Some(v) => Cow::Borrowed(v),
            None => Cow::Owned(DynamicValue::Empty),
        },
        Cow::Owned(DynamicValue::Map(mut map)) => {
            Cow::Owned(map.remove(key).unwrap_or(DynamicValue::Empty))
        }
        other => {
            trace!(key, kind = other.type_name(), "key lookup on a non-map value");
            Cow::Owned(DynamicValue::Empty)
        }
    }
}

fn select_index(current: Cow<'_, DynamicValue>, index: i64) -> Result<Cow<'_, DynamicValue>> {
    let len = match current.as_ref() {
        DynamicValue::List(items) => items.len(),
        other => {
            return Err(EvalError::type_mismatch(format!(
                "object is not an array, got {} [{other}]",
                other.type_name()
            )))
        }
    };
    let position = usize::try_from(index).ok().filter(|i| *i < len).ok_or_else(|| {
        EvalError::IndexOutOfRange(format!("index {index} out of range for list of length {len}"))
    })?;
    Ok(match current {
        Cow::Borrowed(DynamicValue::List(items)) => Cow::Borrowed(&items[position]),
        Cow::Owned(DynamicValue::List(mut items)) => Cow::Owned(items.swap_remove(position)),
        _ => Cow::Owned(DynamicValue::Empty),
    })
}

fn project(current: &DynamicValue, key: &str) -> Result<DynamicValue> {
    let DynamicValue::List(items) = current else {
        return Err(EvalError::type_mismatch(format!(
            "unable to filter a non array object, got {}",
            current.type_name()
        )));
    };
    items
        .iter()
        .map(|item| match item {
            DynamicValue::Map(map) => Ok(map.get(key).cloned().unwrap_or(DynamicValue::Empty)),
            other => Err(EvalError::type_mismatch(format!(
                "unable to filter a list holding a {}, every element must be a map",
                other.type_name()
            ))),
        })
        .collect::<Result<Vec<_>>>()
        .map(DynamicValue::List)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
