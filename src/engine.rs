use tracing::debug;

use crate::comparison::{compare, equal};
use crate::context::Step;
use crate::errors::{EvalError, Result};
use crate::expression::{
    AndExpr, Argument, ComparisonExpr, EqualityExpr, Expression, FunctionCall, OrExpr,
    PathSegment, Primary, Variable,
};
use crate::functions::CallContext;
use crate::value::DynamicValue;
use crate::Evaluator;

/// Reduce a parsed span to a value. The first error aborts the whole walk.
pub(crate) fn eval_expression(evaluator: &Evaluator, expr: &Expression) -> Result<DynamicValue> {
    Walker { evaluator, source: &expr.source }.or(&expr.root)
}

struct Walker<'e> {
    evaluator: &'e Evaluator,
    source: &'e str,
}

impl Walker<'_> {
    fn or(&self, node: &OrExpr) -> Result<DynamicValue> {
        match node.operands.as_slice() {
            [] => Ok(DynamicValue::Bool(false)),
            [single] => self.and(single),
            operands => {
                for operand in operands {
                    if self.require_bool(self.and(operand)?, "||")? {
                        return Ok(DynamicValue::Bool(true));
                    }
                }
                Ok(DynamicValue::Bool(false))
            }
        }
    }

    fn and(&self, node: &AndExpr) -> Result<DynamicValue> {
        match node.operands.as_slice() {
            [] => Ok(DynamicValue::Bool(false)),
            [single] => self.comparison(single),
            operands => {
                for operand in operands {
                    if !self.require_bool(self.comparison(operand)?, "&&")? {
                        return Ok(DynamicValue::Bool(false));
                    }
                }
                Ok(DynamicValue::Bool(true))
            }
        }
    }

    fn comparison(&self, node: &ComparisonExpr) -> Result<DynamicValue> {
        match node.rest.as_slice() {
            [] => self.equality(&node.first),
            [(op, rhs)] => {
                let lhs = self.equality(&node.first)?;
                let rhs = self.equality(rhs)?;
                let out = compare(&lhs, *op, &rhs)?;
                debug!(%lhs, %op, %rhs, out, "comparison");
                Ok(DynamicValue::Bool(out))
            }
            rest => Err(EvalError::arity(format!(
                "comparison expects exactly 2 operands, got {} in {node}",
                rest.len() + 1
            ))),
        }
    }

    fn equality(&self, node: &EqualityExpr) -> Result<DynamicValue> {
        match node.rest.as_slice() {
            [] => self.primary(&node.first),
            [(op, rhs)] => {
                let lhs = self.primary(&node.first)?;
                let rhs = self.primary(rhs)?;
                let out = equal(&lhs, *op, &rhs);
                debug!(%lhs, %op, %rhs, out, "equality");
                Ok(DynamicValue::Bool(out))
            }
            rest => Err(EvalError::arity(format!(
                "equality expects exactly 2 operands, got {} in {node}",
                rest.len() + 1
            ))),
        }
    }

    fn primary(&self, node: &Primary) -> Result<DynamicValue> {
        match node {
            Primary::Variable(v) => self.variable(v),
            Primary::FunctionCall(call) => self.call(call),
            Primary::Number(raw) => number(raw),
            Primary::String(raw) => Ok(DynamicValue::String(unquote(raw).to_string())),
            Primary::Boolean(b) => Ok(DynamicValue::Bool(*b)),
            Primary::Null => Ok(DynamicValue::Empty),
            Primary::Term(inner) => {
                let value = self.or(inner)?;
                Ok(DynamicValue::Bool(self.require_bool(value, "(...)")?))
            }
            Primary::Not(inner) => {
                let value = self.primary(inner)?;
                Ok(DynamicValue::Bool(!self.require_bool(value, "!")?))
            }
        }
    }

    fn variable(&self, v: &Variable) -> Result<DynamicValue> {
        let steps = v
            .path
            .iter()
            .map(|seg| match seg {
                PathSegment::Key(key) => Ok(Step::Key(key)),
                PathSegment::Filter => Ok(Step::Filter),
                PathSegment::Index(index) => {
                    let value = self.primary(index)?;
                    value.as_int().map(Step::Index).ok_or_else(|| {
                        EvalError::type_mismatch(format!(
                            "invalid int index {value} ({}) in {v}",
                            value.type_name()
                        ))
                    })
                }
            })
            .collect::<Result<Vec<_>>>()?;
        let value = self.evaluator.context().resolve(&v.root, &steps)?;
        debug!(variable = %v, %value, "resolved variable");
        Ok(value)
    }

    fn call(&self, call: &FunctionCall) -> Result<DynamicValue> {
        let function = self
            .evaluator
            .registry()
            .get(&call.name)
            .ok_or_else(|| EvalError::UnknownFunction(call.name.clone()))?;
        let args = call
            .args
            .iter()
            .map(|arg| self.argument(arg))
            .collect::<Result<Vec<_>>>()?;
        debug!(function = %call.name, ?args, "calling function");
        let ctx = CallContext { name: &call.name, source: self.source };
        function.call(&ctx, self.evaluator, &args)
    }

    fn argument(&self, arg: &Argument) -> Result<DynamicValue> {
        match arg {
            Argument::Variable(v) => self.variable(v),
            Argument::String(raw) => Ok(DynamicValue::String(unquote(raw).to_string())),
            Argument::Number(raw) => number(raw),
            Argument::Boolean(b) => Ok(DynamicValue::Bool(*b)),
            Argument::Null => Ok(DynamicValue::Empty),
        }
    }

    fn require_bool(&self, value: DynamicValue, operator: &str) -> Result<bool> {
        value.as_bool().ok_or_else(|| {
            EvalError::type_mismatch(format!(
                "{operator} operand must be a boolean, got {} [{value}] in {}",
                value.type_name(),
                self.source
            ))
        })
    }
}

fn number(raw: &str) -> Result<DynamicValue> {
    if let Ok(i) = raw.parse::<i64>() {
        return Ok(DynamicValue::Int(i));
    }
    raw.parse::<f64>()
        .map(DynamicValue::Float)
        .map_err(|_| EvalError::type_mismatch(format!("{raw} is not a number")))
}

/// Drop one quote at each end. Escapes are left as written.
fn unquote(raw: &str) -> &str {
    let s = raw.strip_prefix('\'').unwrap_or(raw);
    s.strip_suffix('\'').unwrap_or(s)
}
