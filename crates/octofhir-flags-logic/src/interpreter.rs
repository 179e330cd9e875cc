//! Tree-walking interpreter for criteria expressions
//!
//! Null handling follows CQL: comparisons and arithmetic with a null operand yield
//! null, and the logical operators use three-valued truth tables.

use crate::ast::{BinaryOp, Expr, Literal, SpannedExpr, UnaryOp};
use crate::error::{LogicError, LogicResult};
use crate::functions::{self, CallContext};
use crate::record::PatientRecord;
use crate::value::LogicValue;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::cmp::Ordering;

/// Evaluates expressions against one patient record at a time
#[derive(Debug, Clone, Copy)]
pub struct Interpreter {
    as_of: NaiveDate,
}

impl Interpreter {
    /// `as_of` is the reference date for `Today()` and `AgeInYears()`
    pub fn new(as_of: NaiveDate) -> Self {
        Self { as_of }
    }

    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    /// Evaluate criteria to a truth value; `None` means indeterminate
    pub fn truth(&self, expr: &SpannedExpr, record: &PatientRecord) -> LogicResult<Option<bool>> {
        match self.evaluate(expr, record)? {
            LogicValue::Boolean(b) => Ok(Some(b)),
            LogicValue::Null => Ok(None),
            other => Err(LogicError::type_mismatch("criteria", "Boolean", other.type_name())),
        }
    }

    pub fn evaluate(&self, expr: &SpannedExpr, record: &PatientRecord) -> LogicResult<LogicValue> {
        match &expr.inner {
            Expr::Literal(literal) => Ok(literal_value(literal)),
            Expr::Attribute(name) => Ok(record.attribute(name)),
            Expr::List(items) => items
                .iter()
                .map(|item| self.evaluate(item, record))
                .collect::<LogicResult<Vec<_>>>()
                .map(LogicValue::List),
            Expr::Unary { op, operand } => {
                let value = self.evaluate(operand, record)?;
                match op {
                    UnaryOp::Not => eval_not(&value),
                    UnaryOp::Negate => eval_negate(&value),
                }
            }
            Expr::Binary { left, op, right } => {
                let left = self.evaluate(left, record)?;
                let right = self.evaluate(right, record)?;
                eval_binary(*op, &left, &right)
            }
            Expr::Between { operand, low, high } => {
                let value = self.evaluate(operand, record)?;
                let low = self.evaluate(low, record)?;
                let high = self.evaluate(high, record)?;
                let above = eval_binary(BinaryOp::GreaterOrEqual, &value, &low)?;
                let below = eval_binary(BinaryOp::LessOrEqual, &value, &high)?;
                eval_and(&above, &below)
            }
            Expr::IsNull { operand, negated } => {
                let value = self.evaluate(operand, record)?;
                Ok(LogicValue::Boolean(value.is_null() != *negated))
            }
            Expr::Call { name, args } => {
                let builtin = functions::lookup(name)
                    .ok_or_else(|| LogicError::UnknownFunction { name: name.clone() })?;
                let args = args
                    .iter()
                    .map(|arg| self.evaluate(arg, record))
                    .collect::<LogicResult<Vec<_>>>()?;
                let ctx = CallContext {
                    record,
                    as_of: self.as_of,
                };
                builtin.invoke(&args, &ctx)
            }
        }
    }
}

fn literal_value(literal: &Literal) -> LogicValue {
    match literal {
        Literal::Null => LogicValue::Null,
        Literal::Boolean(b) => LogicValue::Boolean(*b),
        Literal::Integer(i) => LogicValue::Integer(*i),
        Literal::Decimal(d) => LogicValue::Decimal(*d),
        Literal::String(s) => LogicValue::String(s.clone()),
        Literal::Date(d) => LogicValue::Date(*d),
    }
}

fn as_truth(op: &str, value: &LogicValue) -> LogicResult<Option<bool>> {
    match value {
        LogicValue::Boolean(b) => Ok(Some(*b)),
        LogicValue::Null => Ok(None),
        other => Err(LogicError::type_mismatch(op, "Boolean", other.type_name())),
    }
}

fn from_truth(truth: Option<bool>) -> LogicValue {
    truth.map(LogicValue::Boolean).unwrap_or(LogicValue::Null)
}

fn eval_not(value: &LogicValue) -> LogicResult<LogicValue> {
    Ok(from_truth(as_truth("not", value)?.map(|b| !b)))
}

/// Three-valued `and`
///
/// | A     | B     | A and B |
/// |-------|-------|---------|
/// | true  | true  | true    |
/// | true  | false | false   |
/// | true  | null  | null    |
/// | false | any   | false   |
/// | null  | false | false   |
/// | null  | null  | null    |
fn eval_and(left: &LogicValue, right: &LogicValue) -> LogicResult<LogicValue> {
    let result = match (as_truth("and", left)?, as_truth("and", right)?) {
        (Some(false), _) | (_, Some(false)) => Some(false),
        (Some(true), Some(true)) => Some(true),
        _ => None,
    };
    Ok(from_truth(result))
}

/// Three-valued `or`
///
/// | A     | B     | A or B |
/// |-------|-------|--------|
/// | true  | any   | true   |
/// | false | false | false  |
/// | false | null  | null   |
/// | null  | true  | true   |
/// | null  | null  | null   |
fn eval_or(left: &LogicValue, right: &LogicValue) -> LogicResult<LogicValue> {
    let result = match (as_truth("or", left)?, as_truth("or", right)?) {
        (Some(true), _) | (_, Some(true)) => Some(true),
        (Some(false), Some(false)) => Some(false),
        _ => None,
    };
    Ok(from_truth(result))
}

/// `xor` is null whenever either side is null
fn eval_xor(left: &LogicValue, right: &LogicValue) -> LogicResult<LogicValue> {
    let result = match (as_truth("xor", left)?, as_truth("xor", right)?) {
        (Some(a), Some(b)) => Some(a != b),
        _ => None,
    };
    Ok(from_truth(result))
}

/// Three-valued `implies`
///
/// | A     | B     | A implies B |
/// |-------|-------|-------------|
/// | false | any   | true        |
/// | true  | B     | B           |
/// | null  | true  | true        |
/// | null  | other | null        |
fn eval_implies(left: &LogicValue, right: &LogicValue) -> LogicResult<LogicValue> {
    let result = match (as_truth("implies", left)?, as_truth("implies", right)?) {
        (Some(false), _) => Some(true),
        (Some(true), b) => b,
        (None, Some(true)) => Some(true),
        (None, _) => None,
    };
    Ok(from_truth(result))
}

fn eval_negate(value: &LogicValue) -> LogicResult<LogicValue> {
    match value {
        LogicValue::Null => Ok(LogicValue::Null),
        LogicValue::Integer(i) => i
            .checked_neg()
            .map(LogicValue::Integer)
            .ok_or_else(|| LogicError::overflow("negation")),
        LogicValue::Decimal(d) => Ok(LogicValue::Decimal(-*d)),
        other => Err(LogicError::type_mismatch("-", "Integer or Decimal", other.type_name())),
    }
}

fn eval_binary(op: BinaryOp, left: &LogicValue, right: &LogicValue) -> LogicResult<LogicValue> {
    match op {
        BinaryOp::And => eval_and(left, right),
        BinaryOp::Or => eval_or(left, right),
        BinaryOp::Xor => eval_xor(left, right),
        BinaryOp::Implies => eval_implies(left, right),
        BinaryOp::In => eval_in(left, right),
        op if op.is_comparison() => eval_comparison(op, left, right),
        op => eval_arithmetic(op, left, right),
    }
}

/// Compare two non-null values; Integer and Decimal compare numerically
fn compare(op: BinaryOp, left: &LogicValue, right: &LogicValue) -> LogicResult<Ordering> {
    let ordering = match (left, right) {
        (LogicValue::Integer(a), LogicValue::Integer(b)) => a.cmp(b),
        (LogicValue::String(a), LogicValue::String(b)) => a.cmp(b),
        (LogicValue::Date(a), LogicValue::Date(b)) => a.cmp(b),
        (LogicValue::Boolean(a), LogicValue::Boolean(b)) if matches!(op, BinaryOp::Equal | BinaryOp::NotEqual) => a.cmp(b),
        _ => match (left.as_decimal(), right.as_decimal()) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ => {
                return Err(LogicError::type_mismatch(
                    op.symbol(),
                    left.type_name(),
                    right.type_name(),
                ));
            }
        },
    };
    Ok(ordering)
}

/// Equality with null propagation; lists compare element-wise
fn equals(left: &LogicValue, right: &LogicValue) -> LogicResult<Option<bool>> {
    match (left, right) {
        (LogicValue::Null, _) | (_, LogicValue::Null) => Ok(None),
        (LogicValue::List(a), LogicValue::List(b)) => {
            if a.len() != b.len() {
                return Ok(Some(false));
            }
            let mut result = Some(true);
            for (x, y) in a.iter().zip(b) {
                match equals(x, y)? {
                    Some(false) => return Ok(Some(false)),
                    None => result = None,
                    Some(true) => {}
                }
            }
            Ok(result)
        }
        _ => compare(BinaryOp::Equal, left, right).map(|o| Some(o == Ordering::Equal)),
    }
}

fn eval_comparison(op: BinaryOp, left: &LogicValue, right: &LogicValue) -> LogicResult<LogicValue> {
    if left.is_null() || right.is_null() {
        return Ok(LogicValue::Null);
    }
    let result = match op {
        BinaryOp::Equal => equals(left, right)?,
        BinaryOp::NotEqual => equals(left, right)?.map(|b| !b),
        _ => {
            let ordering = compare(op, left, right)?;
            Some(match op {
                BinaryOp::Less => ordering == Ordering::Less,
                BinaryOp::LessOrEqual => ordering != Ordering::Greater,
                BinaryOp::Greater => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            })
        }
    };
    Ok(from_truth(result))
}

/// Membership: true when any element equals the operand
fn eval_in(left: &LogicValue, right: &LogicValue) -> LogicResult<LogicValue> {
    match right {
        _ if left.is_null() => Ok(LogicValue::Null),
        LogicValue::Null => Ok(LogicValue::Null),
        LogicValue::List(items) => {
            for item in items {
                if equals(left, item)? == Some(true) {
                    return Ok(LogicValue::Boolean(true));
                }
            }
            Ok(LogicValue::Boolean(false))
        }
        other => Err(LogicError::type_mismatch("in", "List", other.type_name())),
    }
}

fn eval_arithmetic(op: BinaryOp, left: &LogicValue, right: &LogicValue) -> LogicResult<LogicValue> {
    if left.is_null() || right.is_null() {
        return Ok(LogicValue::Null);
    }
    let name = op.symbol();

    if let (LogicValue::Integer(a), LogicValue::Integer(b), false) =
        (left, right, op == BinaryOp::Divide)
    {
        let result = match op {
            BinaryOp::Add => a.checked_add(*b),
            BinaryOp::Subtract => a.checked_sub(*b),
            _ => a.checked_mul(*b),
        };
        return result
            .map(LogicValue::Integer)
            .ok_or_else(|| LogicError::overflow(name));
    }

    let (Some(a), Some(b)) = (left.as_decimal(), right.as_decimal()) else {
        let offending = if left.as_decimal().is_none() { left } else { right };
        return Err(LogicError::type_mismatch(
            name,
            "Integer or Decimal",
            offending.type_name(),
        ));
    };

    let result = match op {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Subtract => a.checked_sub(b),
        BinaryOp::Multiply => a.checked_mul(b),
        _ => {
            if b == Decimal::ZERO {
                return Ok(LogicValue::Null);
            }
            a.checked_div(b)
        }
    };
    result
        .map(LogicValue::Decimal)
        .ok_or_else(|| LogicError::overflow(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn interpreter() -> Interpreter {
        Interpreter::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
    }

    fn eval(source: &str, record: &PatientRecord) -> LogicResult<LogicValue> {
        interpreter().evaluate(&parse(source).unwrap(), record)
    }

    fn truth(source: &str) -> Option<bool> {
        interpreter()
            .truth(&parse(source).unwrap(), &PatientRecord::new(1))
            .unwrap()
    }

    #[test]
    fn test_and_truth_table() {
        assert_eq!(truth("true and true"), Some(true));
        assert_eq!(truth("true and false"), Some(false));
        assert_eq!(truth("true and null"), None);
        assert_eq!(truth("false and null"), Some(false));
        assert_eq!(truth("null and false"), Some(false));
        assert_eq!(truth("null and null"), None);
    }

    #[test]
    fn test_or_truth_table() {
        assert_eq!(truth("true or null"), Some(true));
        assert_eq!(truth("null or true"), Some(true));
        assert_eq!(truth("false or null"), None);
        assert_eq!(truth("false or false"), Some(false));
    }

    #[test]
    fn test_implies_and_xor() {
        assert_eq!(truth("false implies null"), Some(true));
        assert_eq!(truth("true implies null"), None);
        assert_eq!(truth("null implies true"), Some(true));
        assert_eq!(truth("null implies false"), None);
        assert_eq!(truth("true xor false"), Some(true));
        assert_eq!(truth("true xor null"), None);
    }

    #[test]
    fn test_missing_attribute_is_indeterminate() {
        let record = PatientRecord::new(1);
        assert_eq!(eval("age > 18", &record).unwrap(), LogicValue::Null);
        assert_eq!(eval("age is null", &record).unwrap(), LogicValue::Boolean(true));
        assert_eq!(eval("age is not null", &record).unwrap(), LogicValue::Boolean(false));
    }

    #[test]
    fn test_numeric_promotion() {
        let record = PatientRecord::new(1).with("weight", Decimal::new(805, 1));
        assert_eq!(eval("weight > 80", &record).unwrap(), LogicValue::Boolean(true));
        assert_eq!(eval("1 = 1.0", &record).unwrap(), LogicValue::Boolean(true));
        assert_eq!(
            eval("7 / 2", &record).unwrap(),
            LogicValue::Decimal(Decimal::new(35, 1))
        );
    }

    #[test]
    fn test_division_by_zero_is_null() {
        let record = PatientRecord::new(1);
        assert_eq!(eval("1 / 0", &record).unwrap(), LogicValue::Null);
    }

    #[test]
    fn test_integer_overflow() {
        let record = PatientRecord::new(1).with("big", i64::MAX);
        assert!(matches!(eval("big + 1 > 0", &record), Err(LogicError::Overflow { .. })));
    }

    #[test]
    fn test_membership_and_between() {
        let record = PatientRecord::new(1).with("code", "B20").with("cd4", 150i64);
        assert_eq!(
            eval("code in {'B20', 'B24'}", &record).unwrap(),
            LogicValue::Boolean(true)
        );
        assert_eq!(eval("cd4 between 100 and 200", &record).unwrap(), LogicValue::Boolean(true));
        assert_eq!(eval("cd4 between 200 and 500", &record).unwrap(), LogicValue::Boolean(false));
        assert_eq!(eval("missing in {1, 2}", &record).unwrap(), LogicValue::Null);
    }

    #[test]
    fn test_date_comparison() {
        let record =
            PatientRecord::new(1).with("enrolled", NaiveDate::from_ymd_opt(2023, 5, 1).unwrap());
        assert_eq!(eval("enrolled < @2023-06-01", &record).unwrap(), LogicValue::Boolean(true));
        assert_eq!(eval("enrolled < Today()", &record).unwrap(), LogicValue::Boolean(true));
    }

    #[test]
    fn test_type_mismatch() {
        let record = PatientRecord::new(1).with("gender", "F");
        assert!(matches!(eval("gender > 3", &record), Err(LogicError::TypeMismatch { .. })));
        assert!(matches!(
            interpreter().truth(&parse("gender").unwrap(), &record),
            Err(LogicError::TypeMismatch { .. })
        ));
    }
}
