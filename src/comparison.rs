use crate::errors::{EvalError, Result};
use crate::expression::{ComparisonOp, EqualityOp};
use crate::value::DynamicValue;

/// Ordered comparison. Both sides are widened to f64; anything that is not an
/// int or a float is rejected.
pub fn compare(a: &DynamicValue, op: ComparisonOp, b: &DynamicValue) -> Result<bool> {
    let lhs = numeric_operand(a)?;
    let rhs = numeric_operand(b)?;
    Ok(match op {
        ComparisonOp::Lt => lhs < rhs,
        ComparisonOp::Gt => lhs > rhs,
        ComparisonOp::Le => lhs <= rhs,
        ComparisonOp::Ge => lhs >= rhs,
    })
}

/// `==` / `!=` using the structural equality of [`DynamicValue`].
pub fn equal(a: &DynamicValue, op: EqualityOp, b: &DynamicValue) -> bool {
    match op {
        EqualityOp::Eq => a == b,
        EqualityOp::Ne => a != b,
    }
}

fn numeric_operand(v: &DynamicValue) -> Result<f64> {
    v.as_f64().ok_or_else(|| {
        EvalError::type_mismatch(format!(
            "{v} must be a float or an int, got [{}]",
            v.type_name()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixed_int_and_float() {
        let five = DynamicValue::Int(5);
        let half = DynamicValue::Float(0.5);
        assert!(compare(&five, ComparisonOp::Gt, &half).unwrap());
        assert!(compare(&five, ComparisonOp::Ge, &DynamicValue::Float(5.0)).unwrap());
        assert!(!compare(&half, ComparisonOp::Ge, &five).unwrap());
        assert!(compare(&half, ComparisonOp::Le, &half).unwrap());
    }

    #[test]
    fn strings_are_not_ordered() {
        let err = compare(&DynamicValue::from("5"), ComparisonOp::Lt, &DynamicValue::Int(6))
            .unwrap_err();
        assert!(err.to_string().contains("must be a float or an int"));
        assert!(compare(&DynamicValue::Empty, ComparisonOp::Lt, &DynamicValue::Int(6)).is_err());
    }

    #[test]
    fn equality_operators() {
        let a = DynamicValue::from("a");
        assert!(equal(&a, EqualityOp::Eq, &DynamicValue::from("a")));
        assert!(equal(&a, EqualityOp::Ne, &DynamicValue::from("b")));
        assert!(equal(&DynamicValue::Bool(true), EqualityOp::Ne, &DynamicValue::from("true")));
    }
}
