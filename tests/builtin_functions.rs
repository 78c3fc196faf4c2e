use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use action_expr as ax;
use ax::{Context, DynamicValue, ErrorKind, Evaluator, Registry};
use pretty_assertions::assert_eq;
use serde_json::json;

fn eval_with(ctx: serde_json::Value, span: &str) -> ax::Result<DynamicValue> {
    Evaluator::with_builtins(Context::from_json(ctx).unwrap()).evaluate(span)
}

#[test]
fn test_contains() {
    let ctx = json!({"git": {
        "branch": "master",
        "changes": [{"message": "not me"}, {"message": "foo"}, {"message": 2}]
    }});
    for (span, expected) in [
        ("${{ contains(git.branch, 'ast') }}", true),
        ("${{ contains('Hello World', 'world') }}", true),
        ("${{ contains(git.changes.*.message, 'foo') }}", true),
        ("${{ contains(git.changes[*].message, '2') }}", true),
        ("${{ contains(git.changes.*.message, 'FOO') }}", false),
    ] {
        assert_eq!(eval_with(ctx.clone(), span).unwrap(), DynamicValue::Bool(expected), "{span}");
    }
    let err = eval_with(ctx, "${{ contains(git.branch, 1) }}").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);
}

#[test]
fn test_starts_and_ends_with() {
    let ctx = json!({"git": {"branch": "Release/1.2"}});
    assert_eq!(
        eval_with(ctx.clone(), "${{ startsWith(git.branch, 'release/') }}").unwrap(),
        DynamicValue::Bool(true)
    );
    assert_eq!(
        eval_with(ctx, "${{ endsWith(git.branch, '.3') }}").unwrap(),
        DynamicValue::Bool(false)
    );
}

#[test]
fn test_format_and_join() {
    let ctx = json!({"git": {"branch": "master", "ids": ["a", "b"]}, "job": {"n": 3}});
    assert_eq!(
        eval_with(ctx.clone(), "${{ format('{0}-{1}-{0}', git.branch, job.n) }}").unwrap(),
        DynamicValue::from("master-3-master")
    );
    assert_eq!(
        eval_with(ctx.clone(), "${{ join(git.ids, ' + ') }}").unwrap(),
        DynamicValue::from("a + b")
    );
    assert_eq!(eval_with(ctx, "${{ join(git.ids) }}").unwrap(), DynamicValue::from("a,b"));
}

#[test]
fn test_json_helpers() {
    let ctx = json!({"vars": {"raw": "{\"x\": [1, 2]}"}});
    assert_eq!(
        eval_with(ctx, "${{ fromJSON(vars.raw) }}").unwrap(),
        DynamicValue::from(json!({"x": [1, 2]}))
    );
}

#[test]
fn test_unknown_function() {
    let err = eval_with(json!({}), "${{ hashFiles('**/*.lock') }}").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownFunction);
    assert_eq!(err.to_string(), "function hashFiles does not exist");
}

fn spy_evaluator(calls: Arc<AtomicUsize>) -> Evaluator {
    let mut registry = Registry::with_builtins();
    registry.register_fn("spy", move |_, _, _| {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(DynamicValue::Bool(true))
    });
    Evaluator::new(Context::new(), registry)
}

#[test]
fn test_logical_operators_short_circuit() {
    let calls = Arc::new(AtomicUsize::new(0));
    let ev = spy_evaluator(calls.clone());
    assert_eq!(ev.evaluate("${{ false && spy() }}").unwrap(), DynamicValue::Bool(false));
    assert_eq!(ev.evaluate("${{ true || spy() }}").unwrap(), DynamicValue::Bool(true));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    assert_eq!(ev.evaluate("${{ true && spy() }}").unwrap(), DynamicValue::Bool(true));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_functions_see_the_call_site_and_evaluator() {
    let mut registry = Registry::new();
    registry.register_fn("branchOf", |call, ev, args| {
        assert_eq!(call.name, "branchOf");
        assert_eq!(call.source, "${{ branchOf('git') }}");
        let scope = args[0].as_str().unwrap_or_default();
        ev.evaluate(&format!("${{{{ {scope}.branch }}}}"))
    });
    let ctx = Context::new().with_scope("git", DynamicValue::from(json!({"branch": "dev"})));
    let ev = Evaluator::new(ctx, registry);
    assert_eq!(ev.evaluate("${{ branchOf('git') }}").unwrap(), DynamicValue::from("dev"));
}

#[test]
fn test_result_and_cancelled() {
    let ctx = json!({"jobs": {"build": {"results": {"JobRunResults": {
        "generic:app.tgz": "https://artifacts/app.tgz"
    }}}}});
    assert_eq!(
        eval_with(ctx.clone(), "${{ result('generic', '*.tgz') }}").unwrap(),
        DynamicValue::from("https://artifacts/app.tgz")
    );
    assert_eq!(eval_with(ctx.clone(), "${{ result('generic', '*.deb') }}").unwrap(), DynamicValue::Empty);
    assert_eq!(eval_with(ctx.clone(), "${{ result('generic') }}").unwrap_err().kind(), ErrorKind::Arity);

    let err = eval_with(ctx.clone(), "${{ cancelled() }}").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidData);
    assert_eq!(eval_with(ctx, "${{ cancelled(1) }}").unwrap_err().kind(), ErrorKind::Arity);
}
