use action_expr as ax;
use ax::{Context, DynamicValue, Evaluator};
use pretty_assertions::assert_eq;
use serde_json::json;

fn evaluator() -> Evaluator {
    let ctx = Context::from_json(json!({
        "git": {
            "branch": "master",
            "changes": [
                {"hash": "a1", "author": {"name": "Alice", "email": "alice@example.com"}, "files": {"count": 1}},
                {"hash": "b2", "author": {"name": "Bob"}, "files": {"count": 2}},
                {"hash": "c3", "files": {"count": 0}}
            ]
        },
        "job": {"attempt": 1, "ratio": 0.5, "tags": ["x", "y"]},
        "vars": {"a": "x", "b": "z"},
        "steps": {"build-linux": {"outputs": {"artifact": "app.tar.gz"}}}
    }))
    .unwrap();
    Evaluator::with_builtins(ctx)
}

#[test]
fn test_index_then_key() {
    let ev = evaluator();
    assert_eq!(ev.evaluate("${{ git.changes[0].hash }}").unwrap(), DynamicValue::from("a1"));
    assert_eq!(
        ev.evaluate("${{ git.changes[job.attempt].author.name }}").unwrap(),
        DynamicValue::from("Bob")
    );
}

#[test]
fn test_filter_applies_to_the_next_key() {
    let ev = evaluator();
    assert_eq!(
        ev.evaluate("${{ git.changes[*].hash }}").unwrap(),
        DynamicValue::from(json!(["a1", "b2", "c3"]))
    );
    assert_eq!(
        ev.evaluate("${{ git.changes.*.author }}").unwrap(),
        DynamicValue::from(json!([{"name": "Alice", "email": "alice@example.com"}, {"name": "Bob"}, null]))
    );
    // `name` is read from the projected list, which has no keys
    assert_eq!(ev.evaluate("${{ git.changes.*.author.name }}").unwrap(), DynamicValue::Empty);
}

#[test]
fn test_filter_after_projection() {
    let ev = evaluator();
    assert_eq!(
        ev.evaluate("${{ git.changes[*].files[*].count }}").unwrap(),
        DynamicValue::from(json!([1, 2, 0]))
    );
}

#[test]
fn test_filter_over_scalars_is_an_error() {
    let err = evaluator().evaluate("${{ job.tags[*].x }}").unwrap_err();
    assert_eq!(err.kind(), ax::ErrorKind::TypeMismatch);
}

#[test]
fn test_hyphenated_keys() {
    let ev = evaluator();
    assert_eq!(
        ev.evaluate("${{ steps.build-linux.outputs.artifact }}").unwrap(),
        DynamicValue::from("app.tar.gz")
    );
}

#[test]
fn test_missing_keys_are_empty() {
    let ev = evaluator();
    assert_eq!(ev.evaluate("${{ git.tag }}").unwrap(), DynamicValue::Empty);
    assert_eq!(ev.evaluate("${{ git.branch.deeper }}").unwrap(), DynamicValue::Empty);
    assert_eq!(ev.evaluate("${{ git.tag == '' }}").unwrap(), DynamicValue::Bool(true));
    assert_eq!(ev.evaluate("${{ git.tag == null }}").unwrap(), DynamicValue::Bool(true));
}

#[test]
fn test_numeric_comparisons() {
    let ev = evaluator();
    for (span, expected) in [
        ("${{ 5 > 1 }}", true),
        ("${{ 5 >= 5 }}", true),
        ("${{ job.ratio < job.attempt }}", true),
        ("${{ job.attempt <= 0.5 }}", false),
        ("${{ job.attempt == 1.0 }}", true),
        ("${{ 'a' == 'a' }}", true),
        ("${{ 'a' != 'b' }}", true),
        ("${{ job.tags == job.tags }}", true),
    ] {
        assert_eq!(ev.evaluate(span).unwrap(), DynamicValue::Bool(expected), "{span}");
    }
}

#[test]
fn test_grouping_overrides_precedence() {
    let ev = evaluator();
    // && binds tighter than ||
    assert_eq!(ev.evaluate("${{ true || false && false }}").unwrap(), DynamicValue::Bool(true));
    assert_eq!(ev.evaluate("${{ (true || false) && false }}").unwrap(), DynamicValue::Bool(false));
}

#[test]
fn test_grouped_conditions_over_variables() {
    let ev = evaluator();
    assert_eq!(
        ev.evaluate("${{ (vars.a == 'x' && vars.b == 'y') }}").unwrap(),
        DynamicValue::Bool(false)
    );
    assert_eq!(
        ev.evaluate("${{ (vars.a == 'x' && vars.b == 'y') || (vars.a == 'x' && vars.b == 'z') }}").unwrap(),
        DynamicValue::Bool(true)
    );
    assert_eq!(
        ev.evaluate("${{ vars.a == 'x' && vars.b == 'y' || vars.a == 'x' && vars.b == 'z' }}").unwrap(),
        DynamicValue::Bool(true)
    );

    assert_eq!(
        ev.evaluate("${{ (vars.a == 'x' || vars.b == 'x') && vars.b == 'y' }}").unwrap(),
        DynamicValue::Bool(false)
    );
    assert_eq!(
        ev.evaluate("${{ vars.a == 'x' || vars.b == 'x' && vars.b == 'y' }}").unwrap(),
        DynamicValue::Bool(true)
    );
}
