pub mod errors;
pub mod context;
pub mod functions;  // plugin model
pub mod value;
mod comparison;
mod engine;
mod expression;
mod interpolate;
mod parser;

use tracing::debug;

pub use context::Context;
pub use errors::{ErrorKind, EvalError, Result, SyntaxError};
pub use functions::{CallContext, Function, Registry};
pub use value::DynamicValue;

/// Evaluates `${{ ... }}` expressions against a fixed context with a fixed set
/// of functions. Both are immutable once built, so one evaluator can be shared
/// across threads.
#[derive(Debug, Clone)]
pub struct Evaluator {
    context: Context,
    registry: Registry,
}

impl Evaluator {
    pub fn new(context: Context, registry: Registry) -> Self {
        Self { context, registry }
    }

    /// Evaluator over `context` with every built-in function.
    pub fn with_builtins(context: Context) -> Self {
        Self::new(context, Registry::with_builtins())
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Evaluate a single span such as `${{ git.branch == 'master' }}`.
    pub fn evaluate(&self, span: &str) -> Result<DynamicValue> {
        let expr = expression::parse_expr(span).map_err(EvalError::Syntax)?;
        debug!(span, "evaluating");
        engine::eval_expression(self, &expr)
    }

    /// Replace every span in `text` by its value.
    ///
    /// When `text` is a single span (surrounding whitespace aside) whose value
    /// is a list or a map, that value is returned as is. Otherwise the result
    /// is a string with lists and maps rendered as compact JSON.
    pub fn interpolate(&self, text: &str) -> Result<DynamicValue> {
        interpolate::interpolate(self, text)
    }

    pub fn interpolate_to_string(&self, text: &str) -> Result<String> {
        interpolate::interpolate_to_string(self, text)
    }

    /// Interpolate, then read the text as `true`/`false`/`1`/`0`/`t`/`f` in any
    /// of the usual casings.
    pub fn interpolate_to_bool(&self, text: &str) -> Result<bool> {
        interpolate::interpolate_to_bool(self, text)
    }

    pub fn validate(&self, text: &str) -> Result<()> {
        interpolate::validate(text)
    }
}

/// Check the syntax of every span in `text`, collecting all diagnostics.
pub fn validate(text: &str) -> Result<()> {
    interpolate::validate(text)
}

/// Convenience: interpolate with the built-in registry.
pub fn interpolate(context: Context, text: &str) -> Result<DynamicValue> {
    Evaluator::with_builtins(context).interpolate(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn evaluator_is_shareable() {
        assert_send_sync::<Evaluator>();
    }

    #[test]
    fn evaluate_single_span() {
        let ctx = Context::new().with_scope("git", DynamicValue::from(json!({"branch": "master"})));
        let ev = Evaluator::with_builtins(ctx);
        assert_eq!(ev.evaluate("${{ git.branch == 'master' }}").unwrap(), DynamicValue::Bool(true));
        assert_eq!(ev.evaluate("${{ git.branch == }}").unwrap_err().kind(), ErrorKind::Syntax);
    }
}
