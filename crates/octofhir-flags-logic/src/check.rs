//! Semantic checks run after parsing
//!
//! Rejects unknown functions, wrong argument counts, attributes outside the data
//! source schema, obviously ill-typed operands, and criteria whose result cannot be
//! a boolean. Types that depend on patient data are `Any` and always pass.

use crate::ast::{BinaryOp, Expr, Literal, SpannedExpr, UnaryOp};
use crate::functions;
use octofhir_flags_diagnostics::{Diagnostic, Span, FLG0100, FLG0101, FLG0102, FLG0103, FLG0201};
use std::fmt;

/// Statically inferred type of an expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Boolean,
    Integer,
    Decimal,
    String,
    Date,
    List,
    /// Unknown until evaluation (attributes, null, polymorphic functions)
    Any,
}

impl ValueType {
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Decimal | Self::Any)
    }

    fn admits(self, expected: ValueType) -> bool {
        self == expected || self == ValueType::Any
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Boolean => "Boolean",
            Self::Integer => "Integer",
            Self::Decimal => "Decimal",
            Self::String => "String",
            Self::Date => "Date",
            Self::List => "List",
            Self::Any => "Any",
        };
        f.write_str(name)
    }
}

/// Check a parsed criteria
///
/// `attributes` restricts attribute references to a known schema.
pub fn check(expr: &SpannedExpr, source: &str, attributes: Option<&[String]>) -> Result<(), Diagnostic> {
    let checker = Checker { source, attributes };
    let ty = checker.infer(expr)?;
    if !ty.admits(ValueType::Boolean) {
        return Err(Diagnostic::error(
            FLG0103,
            format!("Criteria evaluates to {}, expected Boolean", ty),
        )
        .with_span(expr.span, source));
    }
    Ok(())
}

struct Checker<'a> {
    source: &'a str,
    attributes: Option<&'a [String]>,
}

impl Checker<'_> {
    fn mismatch(&self, span: Span, what: &str, expected: &str, found: ValueType) -> Diagnostic {
        Diagnostic::error(
            FLG0201,
            format!("Type mismatch for {}: expected {}, found {}", what, expected, found),
        )
        .with_span(span, self.source)
    }

    fn infer(&self, expr: &SpannedExpr) -> Result<ValueType, Diagnostic> {
        match &expr.inner {
            Expr::Literal(literal) => Ok(match literal {
                Literal::Null => ValueType::Any,
                Literal::Boolean(_) => ValueType::Boolean,
                Literal::Integer(_) => ValueType::Integer,
                Literal::Decimal(_) => ValueType::Decimal,
                Literal::String(_) => ValueType::String,
                Literal::Date(_) => ValueType::Date,
            }),

            Expr::Attribute(name) => {
                if let Some(known) = self.attributes {
                    if !known.iter().any(|a| a == name) {
                        return Err(Diagnostic::error(FLG0100, format!("Unknown attribute '{}'", name))
                            .with_span(expr.span, self.source));
                    }
                }
                Ok(ValueType::Any)
            }

            Expr::List(items) => {
                for item in items {
                    self.infer(item)?;
                }
                Ok(ValueType::List)
            }

            Expr::Unary { op, operand } => {
                let ty = self.infer(operand)?;
                match op {
                    UnaryOp::Not if ty.admits(ValueType::Boolean) => Ok(ValueType::Boolean),
                    UnaryOp::Not => Err(self.mismatch(operand.span, "not", "Boolean", ty)),
                    UnaryOp::Negate if ty.is_numeric() => Ok(ty),
                    UnaryOp::Negate => Err(self.mismatch(operand.span, "-", "Integer or Decimal", ty)),
                }
            }

            Expr::Binary { left, op, right } => {
                let lt = self.infer(left)?;
                let rt = self.infer(right)?;
                self.binary(*op, (left.as_ref(), lt), (right.as_ref(), rt))
            }

            Expr::Between { operand, low, high } => {
                self.infer(operand)?;
                self.infer(low)?;
                self.infer(high)?;
                Ok(ValueType::Boolean)
            }

            Expr::IsNull { operand, .. } => {
                self.infer(operand)?;
                Ok(ValueType::Boolean)
            }

            Expr::Call { name, args } => {
                let Some(builtin) = functions::lookup(name) else {
                    return Err(Diagnostic::error(FLG0101, format!("Unknown function '{}'", name))
                        .with_span(expr.span, self.source));
                };
                if !builtin.arity.accepts(args.len()) {
                    return Err(Diagnostic::error(
                        FLG0102,
                        format!("{} expects {}, got {}", builtin.name, builtin.arity, args.len()),
                    )
                    .with_span(expr.span, self.source));
                }
                for arg in args {
                    self.infer(arg)?;
                }
                Ok(builtin.returns)
            }
        }
    }

    fn binary(
        &self,
        op: BinaryOp,
        (left, lt): (&SpannedExpr, ValueType),
        (right, rt): (&SpannedExpr, ValueType),
    ) -> Result<ValueType, Diagnostic> {
        let what = op.symbol();
        if op.is_logical() {
            if !lt.admits(ValueType::Boolean) {
                return Err(self.mismatch(left.span, what, "Boolean", lt));
            }
            if !rt.admits(ValueType::Boolean) {
                return Err(self.mismatch(right.span, what, "Boolean", rt));
            }
            return Ok(ValueType::Boolean);
        }

        if op.is_arithmetic() {
            if !lt.is_numeric() {
                return Err(self.mismatch(left.span, what, "Integer or Decimal", lt));
            }
            if !rt.is_numeric() {
                return Err(self.mismatch(right.span, what, "Integer or Decimal", rt));
            }
            return Ok(match (op, lt, rt) {
                (BinaryOp::Divide, _, _) => ValueType::Decimal,
                (_, ValueType::Integer, ValueType::Integer) => ValueType::Integer,
                (_, ValueType::Any, _) | (_, _, ValueType::Any) => ValueType::Any,
                _ => ValueType::Decimal,
            });
        }

        if op == BinaryOp::In && !rt.admits(ValueType::List) {
            return Err(self.mismatch(right.span, what, "List", rt));
        }
        Ok(ValueType::Boolean)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn check_str(source: &str, attributes: Option<&[String]>) -> Result<(), Diagnostic> {
        let expr = parse(source).unwrap();
        check(&expr, source, attributes)
    }

    #[test]
    fn test_boolean_criteria_pass() {
        assert!(check_str("age > 18 and gender = 'F'", None).is_ok());
        assert!(check_str("Exists(diagnosis)", None).is_ok());
        // Attribute alone may hold a boolean
        assert!(check_str("pregnant", None).is_ok());
    }

    #[test]
    fn test_non_boolean_criteria_rejected() {
        let err = check_str("age + 1", None).unwrap_err();
        assert_eq!(err.code, FLG0103);
        let err = check_str("AgeInYears()", None).unwrap_err();
        assert_eq!(err.code, FLG0103);
    }

    #[test]
    fn test_function_errors() {
        assert_eq!(check_str("Frobnicate(age)", None).unwrap_err().code, FLG0101);
        assert_eq!(check_str("Lower() = 'x'", None).unwrap_err().code, FLG0102);
    }

    #[test]
    fn test_schema_attributes() {
        let schema = vec!["age".to_string(), "gender".to_string()];
        assert!(check_str("age > 18", Some(&schema)).is_ok());
        let err = check_str("weight > 80", Some(&schema)).unwrap_err();
        assert_eq!(err.code, FLG0100);
        assert_eq!(err.location.unwrap().column, 1);
    }

    #[test]
    fn test_literal_type_mismatch() {
        assert_eq!(check_str("'a' and true", None).unwrap_err().code, FLG0201);
        assert_eq!(check_str("age + 'x' > 1", None).unwrap_err().code, FLG0201);
        assert_eq!(check_str("age in 5", None).unwrap_err().code, FLG0201);
    }
}
