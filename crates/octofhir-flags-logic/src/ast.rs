//! Abstract syntax tree for logic criteria

use chrono::NaiveDate;
use octofhir_flags_diagnostics::Spanned;
use rust_decimal::Decimal;
use std::fmt;

/// Expression with its source span
pub type SpannedExpr = Spanned<Expr>;

/// Literal values
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Boolean(bool),
    Integer(i64),
    Decimal(Decimal),
    String(String),
    /// `@YYYY-MM-DD`
    Date(NaiveDate),
}

/// Criteria expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    /// Reference to a patient attribute
    Attribute(String),
    /// `{a, b, c}`
    List(Vec<SpannedExpr>),
    Unary {
        op: UnaryOp,
        operand: Box<SpannedExpr>,
    },
    Binary {
        left: Box<SpannedExpr>,
        op: BinaryOp,
        right: Box<SpannedExpr>,
    },
    /// `operand between low and high` (inclusive)
    Between {
        operand: Box<SpannedExpr>,
        low: Box<SpannedExpr>,
        high: Box<SpannedExpr>,
    },
    /// `operand is null` / `operand is not null`
    IsNull {
        operand: Box<SpannedExpr>,
        negated: bool,
    },
    /// Built-in function call
    Call {
        name: String,
        args: Vec<SpannedExpr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    // Logical
    And,
    Or,
    Xor,
    Implies,
    // Comparison
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    // Membership
    In,
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl BinaryOp {
    pub fn is_logical(self) -> bool {
        matches!(self, Self::And | Self::Or | Self::Xor | Self::Implies)
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Equal
                | Self::NotEqual
                | Self::Less
                | Self::LessOrEqual
                | Self::Greater
                | Self::GreaterOrEqual
        )
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(self, Self::Add | Self::Subtract | Self::Multiply | Self::Divide)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
            Self::Xor => "xor",
            Self::Implies => "implies",
            Self::Equal => "=",
            Self::NotEqual => "!=",
            Self::Less => "<",
            Self::LessOrEqual => "<=",
            Self::Greater => ">",
            Self::GreaterOrEqual => ">=",
            Self::In => "in",
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl Expr {
    /// Attribute names referenced anywhere in the expression, in source order
    pub fn attributes(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_attributes(&mut names);
        names
    }

    fn collect_attributes<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Attribute(name) => names.push(name),
            Expr::List(items) => items.iter().for_each(|e| e.collect_attributes(names)),
            Expr::Call { args, .. } => args.iter().for_each(|e| e.collect_attributes(names)),
            Expr::Unary { operand, .. } | Expr::IsNull { operand, .. } => {
                operand.collect_attributes(names)
            }
            Expr::Binary { left, right, .. } => {
                left.collect_attributes(names);
                right.collect_attributes(names);
            }
            Expr::Between { operand, low, high } => {
                operand.collect_attributes(names);
                low.collect_attributes(names);
                high.collect_attributes(names);
            }
        }
    }
}
