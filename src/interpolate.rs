use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::engine::eval_expression;
use crate::errors::{EvalError, Result};
use crate::expression::parse_expr;
use crate::value::DynamicValue;
use crate::Evaluator;

/// `${{ ... }}` spans: lazy, non-overlapping, single line.
fn span_regex() -> &'static Regex {
    static SPAN: OnceLock<Regex> = OnceLock::new();
    SPAN.get_or_init(|| Regex::new(r"\$\{\{.+?\}\}").expect("span pattern is valid"))
}

/// Parse every span of `text` without evaluating anything.
pub fn validate(text: &str) -> Result<()> {
    let errors: Vec<_> = span_regex()
        .find_iter(text)
        .filter_map(|m| parse_expr(m.as_str()).err())
        .flatten()
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(EvalError::Syntax(errors))
    }
}

pub(crate) fn interpolate(evaluator: &Evaluator, text: &str) -> Result<DynamicValue> {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for m in span_regex().find_iter(text) {
        let expr = parse_expr(m.as_str()).map_err(EvalError::Syntax)?;
        let value = eval_expression(evaluator, &expr)?;
        debug!(span = m.as_str(), %value, "interpolated span");
        if value.is_composite() && text.trim() == m.as_str() {
            return Ok(value);
        }
        out.push_str(&text[last..m.start()]);
        out.push_str(&value.to_string());
        last = m.end();
    }
    out.push_str(&text[last..]);
    Ok(DynamicValue::String(out))
}

pub(crate) fn interpolate_to_string(evaluator: &Evaluator, text: &str) -> Result<String> {
    match interpolate(evaluator, text)? {
        DynamicValue::String(s) => Ok(s),
        other => Err(EvalError::type_mismatch(format!(
            "interpolation of {text} returned {}, not a string",
            other.type_name()
        ))),
    }
}

pub(crate) fn interpolate_to_bool(evaluator: &Evaluator, text: &str) -> Result<bool> {
    let s = interpolate_to_string(evaluator, text)?;
    parse_bool(&s).ok_or_else(|| EvalError::invalid(format!("unable to parse {s} as a boolean")))
}

fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::errors::ErrorKind;
    use crate::functions::Registry;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn evaluator() -> Evaluator {
        let ctx = Context::from_json(json!({
            "git": {"branch": "master", "ids": [1, 2]},
            "vars": {"enabled": "true", "zero": 0}
        }))
        .unwrap();
        Evaluator::new(ctx, Registry::with_builtins())
    }

    #[test]
    fn spans_are_lazy_and_non_overlapping() {
        let spans: Vec<_> = span_regex()
            .find_iter("a ${{ x }} b ${{ y }}}} c ${{\n z }}")
            .map(|m| m.as_str())
            .collect();
        assert_eq!(spans, vec!["${{ x }}", "${{ y }}"]);
    }

    #[test]
    fn text_is_reassembled_by_position() {
        let out = interpolate(&evaluator(), "[${{ git.branch }}|${{ git.branch }}] ").unwrap();
        assert_eq!(out, DynamicValue::from("[master|master] "));
        assert_eq!(
            interpolate(&evaluator(), "no spans {{ here }}").unwrap(),
            DynamicValue::from("no spans {{ here }}")
        );
    }

    #[test]
    fn lone_structured_span_keeps_its_shape() {
        let ev = evaluator();
        assert_eq!(interpolate(&ev, "  ${{ git.ids }}\n").unwrap(), DynamicValue::from(json!([1, 2])));
        assert_eq!(interpolate(&ev, "ids=${{ git.ids }}").unwrap(), DynamicValue::from("ids=[1,2]"));
    }

    #[test]
    fn validate_collects_every_diagnostic() {
        validate("${{ a.b }} and ${{ f(a, 'b') }}").unwrap();
        let err = validate("${{ a.b == }} ok ${{ f(g()) }}").unwrap_err();
        match err {
            EvalError::Syntax(errors) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn typed_helpers() {
        let ev = evaluator();
        assert_eq!(interpolate_to_string(&ev, "${{ git.branch }}").unwrap(), "master");
        assert!(interpolate_to_string(&ev, "${{ git.ids }}").is_err());
        assert!(interpolate_to_bool(&ev, "${{ vars.enabled }}").unwrap());
        assert!(!interpolate_to_bool(&ev, "${{ vars.zero }}").unwrap());
        let err = interpolate_to_bool(&ev, "${{ git.branch }}").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }
}
