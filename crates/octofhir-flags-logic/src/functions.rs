//! Built-in functions of the criteria language
//!
//! Function names are matched case-insensitively. Every function except `Exists`,
//! `Count` and `Coalesce` returns null when a required argument is null.

use crate::check::ValueType;
use crate::error::{LogicError, LogicResult};
use crate::record::PatientRecord;
use crate::value::LogicValue;
use chrono::{Datelike, NaiveDate};
use regex::Regex;

/// Attribute consulted by the age functions
pub const BIRTH_DATE_ATTRIBUTE: &str = "birthDate";

/// Accepted argument counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exact(n) => count == n,
            Arity::AtLeast(n) => count >= n,
        }
    }
}

impl std::fmt::Display for Arity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Arity::Exact(1) => write!(f, "1 argument"),
            Arity::Exact(n) => write!(f, "{} arguments", n),
            Arity::AtLeast(n) => write!(f, "at least {} arguments", n),
        }
    }
}

/// Values a function may read besides its arguments
pub struct CallContext<'a> {
    pub record: &'a PatientRecord,
    pub as_of: NaiveDate,
}

type BuiltinFn = fn(&[LogicValue], &CallContext<'_>) -> LogicResult<LogicValue>;

/// A built-in function signature and implementation
pub struct Builtin {
    pub name: &'static str,
    pub arity: Arity,
    pub returns: ValueType,
    call: BuiltinFn,
}

impl std::fmt::Debug for Builtin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builtin")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("returns", &self.returns)
            .finish()
    }
}

impl Builtin {
    pub fn invoke(&self, args: &[LogicValue], ctx: &CallContext<'_>) -> LogicResult<LogicValue> {
        if !self.arity.accepts(args.len()) {
            return Err(LogicError::ArgumentCount {
                name: self.name.to_string(),
                expected: self.arity.to_string(),
                found: args.len(),
            });
        }
        (self.call)(args, ctx)
    }
}

static BUILTINS: &[Builtin] = &[
    Builtin { name: "Exists", arity: Arity::Exact(1), returns: ValueType::Boolean, call: exists },
    Builtin { name: "Count", arity: Arity::Exact(1), returns: ValueType::Integer, call: count },
    Builtin { name: "Coalesce", arity: Arity::AtLeast(1), returns: ValueType::Any, call: coalesce },
    Builtin { name: "AgeInYears", arity: Arity::Exact(0), returns: ValueType::Integer, call: age_in_years },
    Builtin { name: "AgeInYearsAt", arity: Arity::Exact(1), returns: ValueType::Integer, call: age_in_years_at },
    Builtin { name: "Today", arity: Arity::Exact(0), returns: ValueType::Date, call: today },
    Builtin { name: "Length", arity: Arity::Exact(1), returns: ValueType::Integer, call: length },
    Builtin { name: "Lower", arity: Arity::Exact(1), returns: ValueType::String, call: lower },
    Builtin { name: "Upper", arity: Arity::Exact(1), returns: ValueType::String, call: upper },
    Builtin { name: "Matches", arity: Arity::Exact(2), returns: ValueType::Boolean, call: matches },
    Builtin { name: "Abs", arity: Arity::Exact(1), returns: ValueType::Any, call: abs },
];

/// Look up a built-in by name, ignoring case
pub fn lookup(name: &str) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|b| b.name.eq_ignore_ascii_case(name))
}

/// All built-in functions
pub fn builtins() -> &'static [Builtin] {
    BUILTINS
}

fn exists(args: &[LogicValue], _ctx: &CallContext<'_>) -> LogicResult<LogicValue> {
    Ok(LogicValue::Boolean(match &args[0] {
        LogicValue::Null => false,
        LogicValue::List(items) => items.iter().any(|v| !v.is_null()),
        _ => true,
    }))
}

fn count(args: &[LogicValue], _ctx: &CallContext<'_>) -> LogicResult<LogicValue> {
    let n = match &args[0] {
        LogicValue::Null => 0,
        LogicValue::List(items) => items.iter().filter(|v| !v.is_null()).count(),
        _ => 1,
    };
    Ok(LogicValue::Integer(n as i64))
}

fn coalesce(args: &[LogicValue], _ctx: &CallContext<'_>) -> LogicResult<LogicValue> {
    Ok(args
        .iter()
        .find(|v| !v.is_null())
        .cloned()
        .unwrap_or(LogicValue::Null))
}

/// Whole years from `birth` to `at`
pub fn years_between(birth: NaiveDate, at: NaiveDate) -> i64 {
    let mut years = i64::from(at.year() - birth.year());
    if (at.month(), at.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }
    years
}

fn age_at(ctx: &CallContext<'_>, at: NaiveDate) -> LogicResult<LogicValue> {
    match ctx.record.attribute(BIRTH_DATE_ATTRIBUTE) {
        LogicValue::Null => Ok(LogicValue::Null),
        LogicValue::Date(birth) => Ok(LogicValue::Integer(years_between(birth, at))),
        other => Err(LogicError::type_mismatch(
            BIRTH_DATE_ATTRIBUTE,
            "Date",
            other.type_name(),
        )),
    }
}

fn age_in_years(_args: &[LogicValue], ctx: &CallContext<'_>) -> LogicResult<LogicValue> {
    age_at(ctx, ctx.as_of)
}

fn age_in_years_at(args: &[LogicValue], ctx: &CallContext<'_>) -> LogicResult<LogicValue> {
    match &args[0] {
        LogicValue::Null => Ok(LogicValue::Null),
        LogicValue::Date(at) => age_at(ctx, *at),
        other => Err(LogicError::type_mismatch("AgeInYearsAt", "Date", other.type_name())),
    }
}

fn today(_args: &[LogicValue], ctx: &CallContext<'_>) -> LogicResult<LogicValue> {
    Ok(LogicValue::Date(ctx.as_of))
}

fn length(args: &[LogicValue], _ctx: &CallContext<'_>) -> LogicResult<LogicValue> {
    match &args[0] {
        LogicValue::Null => Ok(LogicValue::Null),
        LogicValue::String(s) => Ok(LogicValue::Integer(s.chars().count() as i64)),
        LogicValue::List(items) => Ok(LogicValue::Integer(items.len() as i64)),
        other => Err(LogicError::type_mismatch("Length", "String or List", other.type_name())),
    }
}

fn map_string(
    name: &str,
    value: &LogicValue,
    f: impl FnOnce(&str) -> String,
) -> LogicResult<LogicValue> {
    match value {
        LogicValue::Null => Ok(LogicValue::Null),
        LogicValue::String(s) => Ok(LogicValue::String(f(s))),
        other => Err(LogicError::type_mismatch(name, "String", other.type_name())),
    }
}

fn lower(args: &[LogicValue], _ctx: &CallContext<'_>) -> LogicResult<LogicValue> {
    map_string("Lower", &args[0], str::to_lowercase)
}

fn upper(args: &[LogicValue], _ctx: &CallContext<'_>) -> LogicResult<LogicValue> {
    map_string("Upper", &args[0], str::to_uppercase)
}

/// Full-string regex match
fn matches(args: &[LogicValue], _ctx: &CallContext<'_>) -> LogicResult<LogicValue> {
    match (&args[0], &args[1]) {
        (LogicValue::Null, _) | (_, LogicValue::Null) => Ok(LogicValue::Null),
        (LogicValue::String(s), LogicValue::String(pattern)) => {
            let regex = Regex::new(&format!("^(?:{})$", pattern)).map_err(|_| {
                LogicError::InvalidRegex {
                    pattern: pattern.clone(),
                }
            })?;
            Ok(LogicValue::Boolean(regex.is_match(s)))
        }
        (LogicValue::String(_), other) | (other, _) => {
            Err(LogicError::type_mismatch("Matches", "String", other.type_name()))
        }
    }
}

fn abs(args: &[LogicValue], _ctx: &CallContext<'_>) -> LogicResult<LogicValue> {
    match &args[0] {
        LogicValue::Null => Ok(LogicValue::Null),
        LogicValue::Integer(i) => i
            .checked_abs()
            .map(LogicValue::Integer)
            .ok_or_else(|| LogicError::overflow("Abs")),
        LogicValue::Decimal(d) => Ok(LogicValue::Decimal(d.abs())),
        other => Err(LogicError::type_mismatch("Abs", "Integer or Decimal", other.type_name())),
    }
}
