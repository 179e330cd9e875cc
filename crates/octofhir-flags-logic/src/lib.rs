//! Clinical logic criteria language
//!
//! A small CQL-flavoured expression language used by the `logic` flag evaluator.
//! Criteria are boolean expressions over the attributes of a single patient record:
//!
//! ```text
//! AgeInYears() >= 18 and gender = 'F' and lastCd4 < 200
//! diagnosis in {'TB', 'MDR-TB'} or exists(tbTreatmentStart)
//! ```
//!
//! # Architecture
//!
//! - `parser`: winnow recursive descent with precedence climbing, producing [`ast::Expr`]
//! - `check`: semantic validation (functions, arity, attributes, boolean result)
//! - `interpreter`: three-valued evaluation against a [`PatientRecord`]
//! - `source`: the [`PatientDataSource`] capability and an in-memory implementation
//!
//! # Three-Valued Logic
//!
//! Missing attributes evaluate to null and null propagates through comparisons and
//! arithmetic. `and` is false-dominant, `or` is true-dominant. A criteria that ends in null
//! is indeterminate for the patient, never silently false.

pub mod ast;
pub mod check;
pub mod error;
pub mod functions;
pub mod interpreter;
pub mod parser;
pub mod record;
pub mod source;
pub mod value;

pub use ast::{BinaryOp, Expr, Literal, SpannedExpr, UnaryOp};
pub use check::{check, ValueType};
pub use error::{DataSourceError, LogicError, LogicResult};
pub use interpreter::Interpreter;
pub use parser::{parse, MAX_DEPTH};
pub use record::{PatientId, PatientRecord};
pub use source::{InMemoryDataSource, PatientDataSource};
pub use value::LogicValue;

use octofhir_flags_diagnostics::Diagnostic;

/// Criteria that parsed and passed semantic checks
#[derive(Debug, Clone)]
pub struct CompiledCriteria {
    expr: SpannedExpr,
}

impl CompiledCriteria {
    pub fn expr(&self) -> &SpannedExpr {
        &self.expr
    }
}

/// Parse and check criteria text
///
/// `attributes` is the schema advertised by the data source; `None` skips the
/// attribute-name check.
pub fn compile(source: &str, attributes: Option<&[String]>) -> Result<CompiledCriteria, Diagnostic> {
    let expr = parse(source)?;
    check(&expr, source, attributes)?;
    Ok(CompiledCriteria { expr })
}
