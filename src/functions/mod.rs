use std::collections::HashMap;
use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;

use crate::errors::{EvalError, Result};
use crate::value::DynamicValue;
use crate::Evaluator;

pub mod builtins;
pub mod data;
pub mod status;
pub mod strings;

/// What a function learns about the call site.
#[derive(Debug, Clone, Copy)]
pub struct CallContext<'a> {
    /// Name the function was invoked under.
    pub name: &'a str,
    /// The `${{ ... }}` span being evaluated.
    pub source: &'a str,
}

/// Trait for pluggable functions used by the expression evaluator.
///
/// Functions check their own arity and argument types; [`Function::check_arity`]
/// covers the common case.
pub trait Function: Send + Sync {
    fn name(&self) -> &'static str;
    fn arity(&self) -> RangeInclusive<usize>;
    fn call(
        &self,
        ctx: &CallContext<'_>,
        evaluator: &Evaluator,
        args: &[DynamicValue],
    ) -> Result<DynamicValue>;

    fn check_arity(&self, args: &[DynamicValue]) -> Result<()> {
        let arity = self.arity();
        if arity.contains(&args.len()) {
            return Ok(());
        }
        let expected = match (*arity.start(), *arity.end()) {
            (lo, hi) if lo == hi => format!("{lo}"),
            (lo, usize::MAX) => format!("at least {lo}"),
            (lo, hi) => format!("{lo} to {hi}"),
        };
        Err(EvalError::arity(format!(
            "{}: wrong number of arguments, expected {expected}, got {}",
            self.name(),
            args.len()
        )))
    }
}

/// Thread-safe function registry.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<HashMap<&'static str, Arc<dyn Function>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtins::register(&mut registry);
        strings::register(&mut registry);
        data::register(&mut registry);
        status::register(&mut registry);
        registry
    }

    pub fn register<F: Function + 'static>(&mut self, f: F) {
        let mut_map = Arc::make_mut(&mut self.inner);
        mut_map.insert(f.name(), Arc::new(f));
    }

    /// Register a closure under `name`. The closure does its own arity checks.
    pub fn register_fn<F>(&mut self, name: &'static str, f: F)
    where
        F: Fn(&CallContext<'_>, &Evaluator, &[DynamicValue]) -> Result<DynamicValue>
            + Send
            + Sync
            + 'static,
    {
        self.register(FnFunction { name, f });
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Function>> {
        self.inner.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.inner.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

struct FnFunction<F> {
    name: &'static str,
    f: F,
}

impl<F> Function for FnFunction<F>
where
    F: Fn(&CallContext<'_>, &Evaluator, &[DynamicValue]) -> Result<DynamicValue> + Send + Sync,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn arity(&self) -> RangeInclusive<usize> {
        0..=usize::MAX
    }

    fn call(
        &self,
        ctx: &CallContext<'_>,
        evaluator: &Evaluator,
        args: &[DynamicValue],
    ) -> Result<DynamicValue> {
        (self.f)(ctx, evaluator, args)
    }
}

/// The `index`-th argument as a string, or a type error naming `label`.
/// `Empty` reads as the empty string.
pub(crate) fn string_arg<'v>(
    name: &str,
    args: &'v [DynamicValue],
    index: usize,
    label: &str,
) -> Result<&'v str> {
    match args.get(index) {
        Some(DynamicValue::String(s)) => Ok(s),
        Some(DynamicValue::Empty) => Ok(""),
        _ => Err(EvalError::type_mismatch(format!(
            "{name}: {label} argument must be a string"
        ))),
    }
}
