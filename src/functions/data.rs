//! Structured data helpers: JSON conversion, list building, fallbacks and
//! dynamic context lookup.

use std::ops::RangeInclusive;

use itertools::Itertools;

use super::{string_arg, CallContext, Function, Registry};
use crate::errors::{EvalError, Result};
use crate::value::DynamicValue;
use crate::Evaluator;

static EMPTY: DynamicValue = DynamicValue::Empty;

pub(super) fn register(registry: &mut Registry) {
    registry.register(ToJson);
    registry.register(FromJson);
    registry.register(ToArray);
    registry.register(DefaultValue);
    registry.register(Coalesce);
    registry.register(ContextValue);
}

pub struct ToJson;
impl Function for ToJson {
    fn name(&self) -> &'static str { "toJSON" }
    fn arity(&self) -> RangeInclusive<usize> { 1..=1 }
    fn call(&self, _: &CallContext<'_>, _: &Evaluator, args: &[DynamicValue]) -> Result<DynamicValue> {
        if args.len() != 1 {
            return Err(EvalError::arity("toJSON: you must have one argument"));
        }
        Ok(DynamicValue::String(args[0].to_json_pretty()))
    }
}

pub struct FromJson;
impl Function for FromJson {
    fn name(&self) -> &'static str { "fromJSON" }
    fn arity(&self) -> RangeInclusive<usize> { 1..=1 }
    fn call(&self, _: &CallContext<'_>, _: &Evaluator, args: &[DynamicValue]) -> Result<DynamicValue> {
        if args.len() != 1 {
            return Err(EvalError::arity("fromJSON: you must have one argument"));
        }
        let text = string_arg(self.name(), args, 0, "input")?;
        serde_json::from_str::<serde_json::Value>(text)
            .map(DynamicValue::from)
            .map_err(|e| EvalError::invalid(format!("fromJSON: given input is not a valid json: {e}")))
    }
}

/// No argument gives `[]`, one list is returned as is, one scalar is wrapped,
/// several arguments become the list.
pub struct ToArray;
impl Function for ToArray {
    fn name(&self) -> &'static str { "toArray" }
    fn arity(&self) -> RangeInclusive<usize> { 0..=usize::MAX }
    fn call(&self, _: &CallContext<'_>, _: &Evaluator, args: &[DynamicValue]) -> Result<DynamicValue> {
        Ok(match args {
            [] | [DynamicValue::Empty] => DynamicValue::List(Vec::new()),
            [list @ DynamicValue::List(_)] => list.clone(),
            [single] => DynamicValue::List(vec![single.clone()]),
            many => DynamicValue::List(many.to_vec()),
        })
    }
}

/// `default(value, fallback)`
pub struct DefaultValue;
impl Function for DefaultValue {
    fn name(&self) -> &'static str { "default" }
    fn arity(&self) -> RangeInclusive<usize> { 0..=2 }
    fn call(&self, _: &CallContext<'_>, _: &Evaluator, args: &[DynamicValue]) -> Result<DynamicValue> {
        match args {
            [] => Ok(DynamicValue::Empty),
            [value] => Ok(value.clone()),
            [value, fallback] if value.is_blank() => Ok(fallback.clone()),
            [value, _] => Ok(value.clone()),
            _ => Err(EvalError::arity("default: wrong number of arguments")),
        }
    }
}

/// First argument that is not blank, else `Empty`.
pub struct Coalesce;
impl Function for Coalesce {
    fn name(&self) -> &'static str { "coalesce" }
    fn arity(&self) -> RangeInclusive<usize> { 0..=usize::MAX }
    fn call(&self, _: &CallContext<'_>, _: &Evaluator, args: &[DynamicValue]) -> Result<DynamicValue> {
        Ok(args
            .iter()
            .find(|v| !v.is_blank())
            .cloned()
            .unwrap_or(DynamicValue::Empty))
    }
}

/// `contextValue(scope, key-or-index, ...)`: path lookup with computed keys.
pub struct ContextValue;
impl Function for ContextValue {
    fn name(&self) -> &'static str { "contextValue" }
    fn arity(&self) -> RangeInclusive<usize> { 1..=usize::MAX }
    fn call(&self, _: &CallContext<'_>, evaluator: &Evaluator, args: &[DynamicValue]) -> Result<DynamicValue> {
        if args.is_empty() {
            return Err(EvalError::arity("contextValue: wrong number of arguments"));
        }
        let scope = args[0].as_str().ok_or_else(|| {
            EvalError::type_mismatch("contextValue: first argument must be a context name")
        })?;
        let mut current = evaluator.context().get(scope).ok_or_else(|| {
            EvalError::invalid(format!("contextValue: unable to find context {scope}"))
        })?;
        for (i, index) in args.iter().enumerate().skip(1) {
            if matches!(current, DynamicValue::Empty) {
                return Err(EvalError::invalid(format!(
                    "contextValue: object [{}] doesn't exist",
                    args[..i].iter().join(" ")
                )));
            }
            current = match (index, current) {
                (DynamicValue::String(key), DynamicValue::Map(map)) => {
                    map.get(key).unwrap_or(&EMPTY)
                }
                (DynamicValue::Int(n), DynamicValue::List(items)) => usize::try_from(*n)
                    .ok()
                    .and_then(|n| items.get(n))
                    .ok_or_else(|| {
                        EvalError::IndexOutOfRange(format!(
                            "contextValue: index {n} out of range for list of length {}",
                            items.len()
                        ))
                    })?,
                (DynamicValue::String(_) | DynamicValue::Int(_), other) => {
                    return Err(EvalError::type_mismatch(format!(
                        "contextValue: cannot get value at index {index} in object of type {}",
                        other.type_name()
                    )))
                }
                (other, _) => {
                    return Err(EvalError::type_mismatch(format!(
                        "contextValue: wrong type of argument, got {}, need string or integer",
                        other.type_name()
                    )))
                }
            };
        }
        Ok(current.clone())
    }
}
