//! Criteria parser using winnow
//!
//! Recursive descent with precedence climbing. Lowest to highest precedence:
//! `implies`, `or`/`xor`, `and`, `not`, membership (`in`, `between`, `is null`),
//! equality, relational, additive, multiplicative, unary minus, atoms.

use crate::ast::{BinaryOp, Expr, Literal, SpannedExpr, UnaryOp};
use chrono::NaiveDate;
use octofhir_flags_diagnostics::{
    Diagnostic, Span, Spanned, FLG0001, FLG0002, FLG0003, FLG0004, FLG0005, FLG0006, FLG0007,
};
use rust_decimal::Decimal;
use std::cell::{Cell, RefCell};
use std::str::FromStr;
use winnow::ascii::{digit1, multispace0};
use winnow::combinator::opt;
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::{one_of, take_while};

type Input<'a> = &'a str;
type PResult<T> = winnow::ModalResult<T>;

/// Nesting levels allowed in one criteria
///
/// Groups, list items, call arguments, `not`, unary minus and every chained
/// binary operator each take one level, so this also bounds the height of
/// the tree handed to the checker and the interpreter.
pub const MAX_DEPTH: usize = 64;

const KEYWORDS: &[&str] = &[
    "and", "or", "xor", "implies", "not", "in", "between", "is", "null", "true", "false",
];

/// Parse criteria text into an expression tree
pub fn parse(source: &str) -> Result<SpannedExpr, Diagnostic> {
    CriteriaParser::new(source).parse_all()
}

struct CriteriaParser<'a> {
    source: &'a str,
    /// First hard failure; generic errors are derived from the stop position
    failure: RefCell<Option<Diagnostic>>,
    depth: Cell<usize>,
}

impl<'a> CriteriaParser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            failure: RefCell::new(None),
            depth: Cell::new(0),
        }
    }

    fn parse_all(&self) -> Result<SpannedExpr, Diagnostic> {
        let mut input: Input<'a> = self.source;
        skip_ws(&mut input);
        if input.is_empty() {
            return Err(Diagnostic::error(FLG0006, "Criteria is empty"));
        }

        match self.implies(&mut input) {
            Ok(expr) => {
                skip_ws(&mut input);
                if input.is_empty() {
                    Ok(expr)
                } else {
                    Err(self.unexpected(input))
                }
            }
            Err(_) => Err(self
                .failure
                .borrow_mut()
                .take()
                .unwrap_or_else(|| self.unexpected(input))),
        }
    }

    fn offset(&self, input: &Input<'a>) -> usize {
        self.source.len() - input.len()
    }

    fn spanned(&self, expr: Expr, start: usize, input: &Input<'a>) -> SpannedExpr {
        Spanned::new(expr, Span::new(start, self.offset(input)))
    }

    /// Record a hard failure and abort the parse
    fn fail(&self, diagnostic: Diagnostic) -> ErrMode<ContextError> {
        let mut slot = self.failure.borrow_mut();
        if slot.is_none() {
            *slot = Some(diagnostic);
        }
        ErrMode::Cut(ContextError::new())
    }

    /// Take one more nesting level
    ///
    /// Any error ends the whole parse, so levels are given back only on success.
    fn descend(&self, input: &Input<'a>) -> PResult<()> {
        let depth = self.depth.get() + 1;
        if depth > MAX_DEPTH {
            let offset = self.offset(input);
            return Err(self.fail(
                Diagnostic::error(
                    FLG0007,
                    format!("Criteria nested too deeply (limit {} levels)", MAX_DEPTH),
                )
                .with_span(Span::point(offset), self.source),
            ));
        }
        self.depth.set(depth);
        Ok(())
    }

    fn unexpected(&self, input: Input<'a>) -> Diagnostic {
        let offset = self.offset(&input);
        if input.is_empty() {
            return Diagnostic::error(FLG0002, "Unexpected end of criteria")
                .with_span(Span::point(offset), self.source);
        }
        let token = next_token(input);
        Diagnostic::error(FLG0001, format!("Unexpected token '{}'", token))
            .with_span(Span::new(offset, offset + token.len()), self.source)
    }

    fn expected(&self, input: &Input<'a>, what: &str) -> ErrMode<ContextError> {
        let offset = self.offset(input);
        let diagnostic = if input.is_empty() {
            Diagnostic::error(FLG0002, format!("Unexpected end of criteria, expected {}", what))
                .with_span(Span::point(offset), self.source)
        } else {
            let token = next_token(input);
            Diagnostic::error(FLG0001, format!("Expected {}, found '{}'", what, token))
                .with_span(Span::new(offset, offset + token.len()), self.source)
        };
        self.fail(diagnostic)
    }

    /// implies (right-associative)
    fn implies(&self, input: &mut Input<'a>) -> PResult<SpannedExpr> {
        let depth = self.depth.get();
        self.descend(input)?;
        let mut expr = self.or(input)?;
        if padded_keyword(input, "implies") {
            let right = self.implies(input)?;
            expr = binary(expr, BinaryOp::Implies, right);
        }
        self.depth.set(depth);
        Ok(expr)
    }

    fn or(&self, input: &mut Input<'a>) -> PResult<SpannedExpr> {
        let depth = self.depth.get();
        let mut left = self.and(input)?;
        loop {
            let op = if padded_keyword(input, "or") {
                BinaryOp::Or
            } else if padded_keyword(input, "xor") {
                BinaryOp::Xor
            } else {
                break;
            };
            self.descend(input)?;
            let right = self.and(input)?;
            left = binary(left, op, right);
        }
        self.depth.set(depth);
        Ok(left)
    }

    fn and(&self, input: &mut Input<'a>) -> PResult<SpannedExpr> {
        let depth = self.depth.get();
        let mut left = self.not(input)?;
        while padded_keyword(input, "and") {
            self.descend(input)?;
            let right = self.not(input)?;
            left = binary(left, BinaryOp::And, right);
        }
        self.depth.set(depth);
        Ok(left)
    }

    fn not(&self, input: &mut Input<'a>) -> PResult<SpannedExpr> {
        ws(input)?;
        let start = self.offset(input);
        if keyword(input, "not") {
            let depth = self.depth.get();
            self.descend(input)?;
            let operand = self.not(input)?;
            self.depth.set(depth);
            return Ok(self.spanned(
                Expr::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                },
                start,
                input,
            ));
        }
        self.membership(input)
    }

    /// in, between, is [not] null
    fn membership(&self, input: &mut Input<'a>) -> PResult<SpannedExpr> {
        let depth = self.depth.get();
        let mut left = self.equality(input)?;
        loop {
            if padded_keyword(input, "between") {
                self.descend(input)?;
                let low = self.equality(input)?;
                if !padded_keyword(input, "and") {
                    skip_ws(input);
                    return Err(self.expected(input, "'and' in between expression"));
                }
                let high = self.equality(input)?;
                let span = left.span.merge(high.span);
                left = Spanned::new(
                    Expr::Between {
                        operand: Box::new(left),
                        low: Box::new(low),
                        high: Box::new(high),
                    },
                    span,
                );
            } else if padded_keyword(input, "is") {
                self.descend(input)?;
                let negated = padded_keyword(input, "not");
                if !padded_keyword(input, "null") {
                    skip_ws(input);
                    return Err(self.expected(input, "'null'"));
                }
                let span = Span::new(left.span.start, self.offset(input));
                left = Spanned::new(
                    Expr::IsNull {
                        operand: Box::new(left),
                        negated,
                    },
                    span,
                );
            } else if padded_keyword(input, "in") {
                self.descend(input)?;
                let right = self.equality(input)?;
                left = binary(left, BinaryOp::In, right);
            } else {
                break;
            }
        }
        self.depth.set(depth);
        Ok(left)
    }

    fn equality(&self, input: &mut Input<'a>) -> PResult<SpannedExpr> {
        let depth = self.depth.get();
        let mut left = self.relational(input)?;
        loop {
            let checkpoint = *input;
            ws(input)?;
            let op = if symbol(input, "!=") {
                BinaryOp::NotEqual
            } else if symbol(input, "=") {
                BinaryOp::Equal
            } else {
                *input = checkpoint;
                break;
            };
            self.descend(input)?;
            let right = self.relational(input)?;
            left = binary(left, op, right);
        }
        self.depth.set(depth);
        Ok(left)
    }

    fn relational(&self, input: &mut Input<'a>) -> PResult<SpannedExpr> {
        let depth = self.depth.get();
        let mut left = self.additive(input)?;
        loop {
            let checkpoint = *input;
            ws(input)?;
            let op = if symbol(input, "<=") {
                BinaryOp::LessOrEqual
            } else if symbol(input, ">=") {
                BinaryOp::GreaterOrEqual
            } else if symbol(input, "<") {
                BinaryOp::Less
            } else if symbol(input, ">") {
                BinaryOp::Greater
            } else {
                *input = checkpoint;
                break;
            };
            self.descend(input)?;
            let right = self.additive(input)?;
            left = binary(left, op, right);
        }
        self.depth.set(depth);
        Ok(left)
    }

    fn additive(&self, input: &mut Input<'a>) -> PResult<SpannedExpr> {
        let depth = self.depth.get();
        let mut left = self.multiplicative(input)?;
        loop {
            let checkpoint = *input;
            ws(input)?;
            let op = if symbol(input, "+") {
                BinaryOp::Add
            } else if symbol(input, "-") {
                BinaryOp::Subtract
            } else {
                *input = checkpoint;
                break;
            };
            self.descend(input)?;
            let right = self.multiplicative(input)?;
            left = binary(left, op, right);
        }
        self.depth.set(depth);
        Ok(left)
    }

    fn multiplicative(&self, input: &mut Input<'a>) -> PResult<SpannedExpr> {
        let depth = self.depth.get();
        let mut left = self.unary(input)?;
        loop {
            let checkpoint = *input;
            ws(input)?;
            let op = if symbol(input, "*") {
                BinaryOp::Multiply
            } else if symbol(input, "/") {
                BinaryOp::Divide
            } else {
                *input = checkpoint;
                break;
            };
            self.descend(input)?;
            let right = self.unary(input)?;
            left = binary(left, op, right);
        }
        self.depth.set(depth);
        Ok(left)
    }

    /// Unary minus, folded into numeric literals
    fn unary(&self, input: &mut Input<'a>) -> PResult<SpannedExpr> {
        ws(input)?;
        let start = self.offset(input);
        if !symbol(input, "-") {
            return self.atom(input);
        }

        let depth = self.depth.get();
        self.descend(input)?;
        let operand = self.unary(input)?;
        self.depth.set(depth);
        let expr = match operand.inner {
            Expr::Literal(Literal::Integer(i)) => Expr::Literal(Literal::Integer(-i)),
            Expr::Literal(Literal::Decimal(d)) => Expr::Literal(Literal::Decimal(-d)),
            other => Expr::Unary {
                op: UnaryOp::Negate,
                operand: Box::new(Spanned::new(other, operand.span)),
            },
        };
        Ok(self.spanned(expr, start, input))
    }

    fn atom(&self, input: &mut Input<'a>) -> PResult<SpannedExpr> {
        ws(input)?;
        let start = self.offset(input);
        let Some(first) = input.chars().next() else {
            return backtrack();
        };

        match first {
            '(' => {
                symbol(input, "(");
                let inner = self.implies(input)?;
                skip_ws(input);
                if !symbol(input, ")") {
                    return Err(self.expected(input, "')'"));
                }
                Ok(self.spanned(inner.inner, start, input))
            }
            '{' => self.list(input),
            '@' => self.date(input),
            '\'' => {
                let text = self.quoted(input, '\'')?;
                Ok(self.spanned(Expr::Literal(Literal::String(text)), start, input))
            }
            '"' => {
                let name = self.quoted(input, '"')?;
                Ok(self.spanned(Expr::Attribute(name), start, input))
            }
            c if c.is_ascii_digit() => self.number(input),
            c if c.is_ascii_alphabetic() || c == '_' => self.word_atom(input),
            _ => backtrack(),
        }
    }

    fn list(&self, input: &mut Input<'a>) -> PResult<SpannedExpr> {
        let start = self.offset(input);
        symbol(input, "{");
        skip_ws(input);
        let mut items = Vec::new();
        if !symbol(input, "}") {
            loop {
                items.push(self.implies(input)?);
                skip_ws(input);
                if symbol(input, ",") {
                    continue;
                }
                if symbol(input, "}") {
                    break;
                }
                return Err(self.expected(input, "',' or '}'"));
            }
        }
        Ok(self.spanned(Expr::List(items), start, input))
    }

    fn date(&self, input: &mut Input<'a>) -> PResult<SpannedExpr> {
        let start = self.offset(input);
        symbol(input, "@");
        let text: &str = take_while(1.., |c: char| c.is_ascii_digit() || c == '-')
            .parse_next(input)
            .map_err(|_: ErrMode<ContextError>| {
                self.fail(
                    Diagnostic::error(FLG0005, "Expected a date after '@'")
                        .with_span(Span::point(start), self.source),
                )
            })?;
        let date = NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|e| {
            self.fail(
                Diagnostic::error(FLG0005, format!("Invalid date literal '@{}': {}", text, e))
                    .with_span(Span::new(start, self.offset(input)), self.source),
            )
        })?;
        Ok(self.spanned(Expr::Literal(Literal::Date(date)), start, input))
    }

    fn number(&self, input: &mut Input<'a>) -> PResult<SpannedExpr> {
        let start = self.offset(input);
        let text = numeral(input)?;
        let invalid = |e: String| {
            self.fail(
                Diagnostic::error(FLG0004, format!("Invalid number '{}': {}", text, e))
                    .with_span(Span::new(start, start + text.len()), self.source),
            )
        };
        let literal = if text.contains('.') {
            Decimal::from_str(text)
                .map(Literal::Decimal)
                .map_err(|e| invalid(e.to_string()))?
        } else {
            text.parse::<i64>()
                .map(Literal::Integer)
                .map_err(|e| invalid(e.to_string()))?
        };
        Ok(self.spanned(Expr::Literal(literal), start, input))
    }

    /// Quoted text with the quote character doubled as its escape
    fn quoted(&self, input: &mut Input<'a>, quote: char) -> PResult<String> {
        let start = self.offset(input);
        *input = &input[quote.len_utf8()..];
        let mut text = String::new();
        loop {
            let Some(pos) = input.find(quote) else {
                let message = if quote == '\'' {
                    "Unterminated string literal"
                } else {
                    "Unterminated quoted identifier"
                };
                return Err(self.fail(
                    Diagnostic::error(FLG0003, message)
                        .with_span(Span::new(start, self.source.len()), self.source),
                ));
            };
            text.push_str(&input[..pos]);
            *input = &input[pos + quote.len_utf8()..];
            if input.starts_with(quote) {
                text.push(quote);
                *input = &input[quote.len_utf8()..];
            } else {
                return Ok(text);
            }
        }
    }

    /// Keyword literal, attribute reference or function call
    fn word_atom(&self, input: &mut Input<'a>) -> PResult<SpannedExpr> {
        let start = self.offset(input);
        let checkpoint = *input;
        let name = word(input)?;

        let literal = match name {
            "null" => Some(Literal::Null),
            "true" => Some(Literal::Boolean(true)),
            "false" => Some(Literal::Boolean(false)),
            _ => None,
        };
        if let Some(literal) = literal {
            return Ok(self.spanned(Expr::Literal(literal), start, input));
        }
        if KEYWORDS.contains(&name) {
            *input = checkpoint;
            return backtrack();
        }

        let before_args = *input;
        skip_ws(input);
        if !symbol(input, "(") {
            *input = before_args;
            return Ok(self.spanned(Expr::Attribute(name.to_string()), start, input));
        }

        skip_ws(input);
        let mut args = Vec::new();
        if !symbol(input, ")") {
            loop {
                args.push(self.implies(input)?);
                skip_ws(input);
                if symbol(input, ",") {
                    continue;
                }
                if symbol(input, ")") {
                    break;
                }
                return Err(self.expected(input, "',' or ')'"));
            }
        }
        Ok(self.spanned(
            Expr::Call {
                name: name.to_string(),
                args,
            },
            start,
            input,
        ))
    }
}

fn binary(left: SpannedExpr, op: BinaryOp, right: SpannedExpr) -> SpannedExpr {
    let span = left.span.merge(right.span);
    Spanned::new(
        Expr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        },
        span,
    )
}

fn backtrack<T>() -> PResult<T> {
    Err(ErrMode::Backtrack(ContextError::new()))
}

fn ws(input: &mut Input<'_>) -> PResult<()> {
    multispace0.void().parse_next(input)
}

fn skip_ws(input: &mut Input<'_>) {
    *input = input.trim_start();
}

fn word<'a>(input: &mut Input<'a>) -> PResult<&'a str> {
    (
        one_of(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., |c: char| c.is_ascii_alphanumeric() || c == '_'),
    )
        .take()
        .parse_next(input)
}

fn numeral<'a>(input: &mut Input<'a>) -> PResult<&'a str> {
    (digit1, opt(('.', digit1))).take().parse_next(input)
}

fn symbol(input: &mut Input<'_>, text: &str) -> bool {
    match input.strip_prefix(text) {
        Some(rest) => {
            *input = rest;
            true
        }
        None => false,
    }
}

fn keyword(input: &mut Input<'_>, kw: &str) -> bool {
    let checkpoint = *input;
    match word(input) {
        Ok(w) if w == kw => true,
        _ => {
            *input = checkpoint;
            false
        }
    }
}

/// Keyword preceded by optional whitespace; consumes nothing on mismatch
fn padded_keyword(input: &mut Input<'_>, kw: &str) -> bool {
    let checkpoint = *input;
    skip_ws(input);
    if keyword(input, kw) {
        true
    } else {
        *input = checkpoint;
        false
    }
}

fn next_token(input: &str) -> &str {
    let first_len = input.chars().next().map(char::len_utf8).unwrap_or(0);
    let end = if input.starts_with(|c: char| c.is_ascii_alphanumeric() || c == '_') {
        input
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(input.len())
    } else {
        first_len
    };
    &input[..end]
}
