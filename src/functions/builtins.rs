//! Core built-ins: `contains`, `startsWith`, `endsWith`, `format` and `join`.

use std::ops::RangeInclusive;
use std::sync::OnceLock;

use itertools::Itertools;
use regex::{Captures, Regex};

use super::{string_arg, CallContext, Function, Registry};
use crate::errors::{EvalError, Result};
use crate::value::DynamicValue;
use crate::Evaluator;

pub(super) fn register(registry: &mut Registry) {
    registry.register(Contains);
    registry.register(StartsWith);
    registry.register(EndsWith);
    registry.register(Format);
    registry.register(Join);
}

/// `contains(search, item)`: case-insensitive substring test on a string, or
/// exact membership test of `item` against the string form of each list element.
pub struct Contains;
impl Function for Contains {
    fn name(&self) -> &'static str { "contains" }
    fn arity(&self) -> RangeInclusive<usize> { 2..=2 }
    fn call(&self, _: &CallContext<'_>, _: &Evaluator, args: &[DynamicValue]) -> Result<DynamicValue> {
        self.check_arity(args)?;
        let item = string_arg(self.name(), args, 1, "item")?;
        match &args[0] {
            DynamicValue::String(search) => Ok(DynamicValue::Bool(
                search.to_lowercase().contains(&item.to_lowercase()),
            )),
            DynamicValue::Empty => Ok(DynamicValue::Bool(item.is_empty())),
            DynamicValue::List(items) => Ok(DynamicValue::Bool(
                items.iter().any(|candidate| candidate.to_string() == item),
            )),
            other => Err(EvalError::type_mismatch(format!(
                "contains: search argument must be a string or an array, got {}",
                other.type_name()
            ))),
        }
    }
}

pub struct StartsWith;
impl Function for StartsWith {
    fn name(&self) -> &'static str { "startsWith" }
    fn arity(&self) -> RangeInclusive<usize> { 2..=2 }
    fn call(&self, _: &CallContext<'_>, _: &Evaluator, args: &[DynamicValue]) -> Result<DynamicValue> {
        self.check_arity(args)?;
        let s = string_arg(self.name(), args, 0, "searchString")?;
        let prefix = string_arg(self.name(), args, 1, "searchValue")?;
        Ok(DynamicValue::Bool(s.to_lowercase().starts_with(&prefix.to_lowercase())))
    }
}

pub struct EndsWith;
impl Function for EndsWith {
    fn name(&self) -> &'static str { "endsWith" }
    fn arity(&self) -> RangeInclusive<usize> { 2..=2 }
    fn call(&self, _: &CallContext<'_>, _: &Evaluator, args: &[DynamicValue]) -> Result<DynamicValue> {
        self.check_arity(args)?;
        let s = string_arg(self.name(), args, 0, "searchString")?;
        let suffix = string_arg(self.name(), args, 1, "searchValue")?;
        Ok(DynamicValue::Bool(s.to_lowercase().ends_with(&suffix.to_lowercase())))
    }
}

/// `format(template, args...)`: replaces `{0}`, `{1}`, ... in one pass, so
/// substituted text is never rescanned. Tokens without a matching argument stay.
pub struct Format;
impl Function for Format {
    fn name(&self) -> &'static str { "format" }
    fn arity(&self) -> RangeInclusive<usize> { 2..=usize::MAX }
    fn call(&self, _: &CallContext<'_>, _: &Evaluator, args: &[DynamicValue]) -> Result<DynamicValue> {
        if args.len() < 2 {
            return Err(EvalError::arity("format: you must specify at least one replace value"));
        }
        let template = string_arg(self.name(), args, 0, "first")?;
        let values = &args[1..];
        let out = placeholder_regex().replace_all(template, |caps: &Captures<'_>| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|i| values.get(i))
                .map_or_else(|| caps[0].to_string(), ToString::to_string)
        });
        Ok(DynamicValue::String(out.into_owned()))
    }
}

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{(0|[1-9]\d*)\}").expect("placeholder pattern is valid"))
}

/// `join(list, separator = ",")`; a string first argument comes back unchanged.
pub struct Join;
impl Function for Join {
    fn name(&self) -> &'static str { "join" }
    fn arity(&self) -> RangeInclusive<usize> { 1..=2 }
    fn call(&self, _: &CallContext<'_>, _: &Evaluator, args: &[DynamicValue]) -> Result<DynamicValue> {
        if !self.arity().contains(&args.len()) {
            return Err(EvalError::arity(
                "join: you must specify an array as first argument, and an optional separator",
            ));
        }
        let separator = args.get(1).map_or_else(|| ",".to_string(), ToString::to_string);
        match &args[0] {
            DynamicValue::List(items) => Ok(DynamicValue::String(items.iter().join(&separator))),
            DynamicValue::String(s) => Ok(DynamicValue::String(s.clone())),
            DynamicValue::Empty => Ok(DynamicValue::String(String::new())),
            other => Err(EvalError::type_mismatch(format!(
                "join: first argument must be an array or a string, got {}",
                other.type_name()
            ))),
        }
    }
}
