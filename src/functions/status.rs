//! Job status predicates. `success()` and `failure()` read the `steps` scope
//! when present, the `needs` scope otherwise. `result()` reads the run results
//! recorded under `jobs`.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use super::strings::glob_regex;
use super::{string_arg, CallContext, Function, Registry};
use crate::context::Context;
use crate::errors::{EvalError, Result};
use crate::value::DynamicValue;
use crate::Evaluator;

const SUCCESS: &str = "Success";
const SKIPPED: &str = "Skipped";
const FAIL: &str = "Fail";

pub(super) fn register(registry: &mut Registry) {
    registry.register(Always);
    registry.register(Success);
    registry.register(Failure);
    registry.register(Cancelled);
    registry.register(JobResult);
}

fn no_arguments(name: &str, args: &[DynamicValue]) -> Result<()> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(EvalError::arity(format!("{name} function must not have arguments")))
    }
}

enum Statuses<'a> {
    /// `conclusion` of every step.
    Steps(Vec<&'a str>),
    /// `result` of every needed job.
    Needs(Vec<&'a str>),
}

fn statuses<'a>(evaluator: &'a Evaluator, name: &str) -> Result<Statuses<'a>> {
    let ctx = evaluator.context();
    if let Some(steps) = present(ctx, "steps") {
        return Ok(Statuses::Steps(field_of_each(steps, "conclusion", name, "steps")?));
    }
    if let Some(needs) = present(ctx, "needs") {
        return Ok(Statuses::Needs(field_of_each(needs, "result", name, "needs")?));
    }
    Err(EvalError::invalid("missing steps and needs context"))
}

fn present<'a>(ctx: &'a Context, scope: &str) -> Option<&'a DynamicValue> {
    ctx.get(scope).filter(|v| !matches!(v, DynamicValue::Empty))
}

fn field_of_each<'a>(
    scope: &'a DynamicValue,
    field: &str,
    name: &str,
    scope_name: &str,
) -> Result<Vec<&'a str>> {
    let DynamicValue::Map(entries) = scope else {
        return Err(EvalError::invalid(format!("{name}: unable to read {scope_name} context")));
    };
    entries
        .values()
        .map(|entry| match entry {
            DynamicValue::Map(m) => Ok(m.get(field).and_then(DynamicValue::as_str).unwrap_or("")),
            _ => Err(EvalError::invalid(format!("{name}: unable to read {scope_name} context"))),
        })
        .collect()
}

pub struct Always;
impl Function for Always {
    fn name(&self) -> &'static str { "always" }
    fn arity(&self) -> RangeInclusive<usize> { 0..=0 }
    fn call(&self, _: &CallContext<'_>, _: &Evaluator, args: &[DynamicValue]) -> Result<DynamicValue> {
        no_arguments(self.name(), args)?;
        Ok(DynamicValue::Bool(true))
    }
}

/// Every step succeeded or was skipped; with no `steps`, every needed job succeeded.
pub struct Success;
impl Function for Success {
    fn name(&self) -> &'static str { "success" }
    fn arity(&self) -> RangeInclusive<usize> { 0..=0 }
    fn call(&self, _: &CallContext<'_>, evaluator: &Evaluator, args: &[DynamicValue]) -> Result<DynamicValue> {
        no_arguments(self.name(), args)?;
        let ok = match statuses(evaluator, self.name())? {
            Statuses::Steps(all) => all.iter().all(|s| *s == SUCCESS || *s == SKIPPED),
            Statuses::Needs(all) => all.iter().all(|s| *s == SUCCESS),
        };
        Ok(DynamicValue::Bool(ok))
    }
}

pub struct Failure;
impl Function for Failure {
    fn name(&self) -> &'static str { "failure" }
    fn arity(&self) -> RangeInclusive<usize> { 0..=0 }
    fn call(&self, _: &CallContext<'_>, evaluator: &Evaluator, args: &[DynamicValue]) -> Result<DynamicValue> {
        no_arguments(self.name(), args)?;
        let failed = match statuses(evaluator, self.name())? {
            Statuses::Steps(all) | Statuses::Needs(all) => all.iter().any(|s| *s == FAIL),
        };
        Ok(DynamicValue::Bool(failed))
    }
}

pub struct Cancelled;
impl Function for Cancelled {
    fn name(&self) -> &'static str { "cancelled" }
    fn arity(&self) -> RangeInclusive<usize> { 0..=0 }
    fn call(&self, _: &CallContext<'_>, _: &Evaluator, args: &[DynamicValue]) -> Result<DynamicValue> {
        no_arguments(self.name(), args)?;
        Err(EvalError::invalid("cancelled is not implemented yet"))
    }
}

/// `result(type, name)`: run results of every job in `jobs` whose key is
/// `<type>:<name>`, with `name` matched as a glob. No match gives Empty, one
/// match the value itself, several a list.
pub struct JobResult;
impl Function for JobResult {
    fn name(&self) -> &'static str { "result" }
    fn arity(&self) -> RangeInclusive<usize> { 2..=2 }
    fn call(&self, _: &CallContext<'_>, evaluator: &Evaluator, args: &[DynamicValue]) -> Result<DynamicValue> {
        self.check_arity(args)?;
        let kind = string_arg(self.name(), args, 0, "type")?;
        let pattern = string_arg(self.name(), args, 1, "name")?;
        let glob = glob_regex(pattern).map_err(|e| {
            EvalError::invalid(format!("result: invalid name pattern {pattern}: {e}"))
        })?;
        let Some(DynamicValue::Map(jobs)) = present(evaluator.context(), "jobs") else {
            return Err(EvalError::invalid("result: map jobs not found in context"));
        };

        let prefix = format!("{kind}:");
        let mut found = Vec::new();
        for (job_name, job) in jobs {
            let DynamicValue::Map(job) = job else {
                return Err(EvalError::invalid(format!("result: job {job_name} is not a map")));
            };
            let Some(DynamicValue::Map(results)) = run_results(job) else {
                continue;
            };
            found.extend(
                results
                    .iter()
                    .filter(|(key, _)| {
                        key.strip_prefix(&prefix).is_some_and(|rest| glob.is_match(rest))
                    })
                    .map(|(_, value)| value.clone()),
            );
        }

        Ok(match found.len() {
            0 => DynamicValue::Empty,
            1 => found.swap_remove(0),
            _ => DynamicValue::List(found),
        })
    }
}

/// `results.JobRunResults` when the job carries a `results` map, `JobRunResults` otherwise.
fn run_results(job: &BTreeMap<String, DynamicValue>) -> Option<&DynamicValue> {
    match job.get("results") {
        Some(DynamicValue::Map(results)) => results.get("JobRunResults"),
        _ => job.get("JobRunResults"),
    }
}
