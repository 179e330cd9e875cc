//! Evaluator for relational query criteria
//!
//! Criteria is either a boolean SQL predicate over the patient table
//! (`age > 18 AND gender = 'F'`) or a full `SELECT` returning patient ids
//! (`SELECT patient_id FROM encounter WHERE ...`). Both forms are wrapped in one
//! statement restricted to the requested id set:
//!
//! ```sql
//! SELECT "patient_id", (
//! <predicate>
//! ) FROM "patient" WHERE "patient_id" IN rarray(?1)
//! ```
//!
//! The criteria sits on its own lines, so a trailing `--` comment ends with it.

use crate::error::EvalResult;
use crate::evaluator::{Evaluator, EvaluatorKind};
use crate::types::{Cohort, Truth, ValidationResult};
use octofhir_flags_diagnostics::{Diagnostic, FLG0104};
use octofhir_flags_logic::PatientId;
use std::sync::Arc;

pub const DEFAULT_TABLE: &str = "patient";
pub const DEFAULT_ID_COLUMN: &str = "patient_id";

/// Query-execution capability
///
/// Statements carry one parameter, `?1`, consumed by `rarray(?1)`: the id set bound
/// as a table-valued array.
#[cfg_attr(test, mockall::automock)]
pub trait QueryExecutor: Send + Sync {
    /// Compile a statement without running it
    fn prepare(&self, sql: &str) -> EvalResult<()>;

    /// Run a statement and read `(id, predicate)` rows
    fn verdicts(&self, sql: &str, ids: &[PatientId]) -> EvalResult<Vec<(PatientId, Truth)>>;
}

/// Runs SQL criteria through a [`QueryExecutor`]
pub struct QueryEvaluator {
    executor: Arc<dyn QueryExecutor>,
    table: String,
    id_column: String,
}

impl QueryEvaluator {
    pub fn new(executor: Arc<dyn QueryExecutor>) -> Self {
        Self::with_table(executor, DEFAULT_TABLE, DEFAULT_ID_COLUMN)
    }

    pub fn with_table(
        executor: Arc<dyn QueryExecutor>,
        table: impl Into<String>,
        id_column: impl Into<String>,
    ) -> Self {
        Self {
            executor,
            table: table.into(),
            id_column: id_column.into(),
        }
    }

    /// The statement executed for `criteria`
    pub fn statement(&self, criteria: &str) -> String {
        let criteria = criteria.trim().trim_end_matches(';').trim_end();
        let id = quote_identifier(&self.id_column);
        let predicate = if is_select(criteria) {
            format!("{} IN (\n{}\n)", id, criteria)
        } else {
            criteria.to_string()
        };
        format!(
            "SELECT {id}, (\n{predicate}\n) FROM {table} WHERE {id} IN rarray(?1)",
            id = id,
            predicate = predicate,
            table = quote_identifier(&self.table),
        )
    }
}

fn is_select(criteria: &str) -> bool {
    criteria
        .get(..6)
        .is_some_and(|head| head.eq_ignore_ascii_case("select"))
        && criteria[6..].starts_with(char::is_whitespace)
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

impl Evaluator for QueryEvaluator {
    fn kind(&self) -> EvaluatorKind {
        EvaluatorKind::Query
    }

    fn validate(&self, criteria: &str) -> ValidationResult {
        if criteria.trim().is_empty() {
            return ValidationResult::invalid(
                Diagnostic::error(FLG0104, "Query criteria is empty").to_string(),
            );
        }
        match self.executor.prepare(&self.statement(criteria)) {
            Ok(()) => ValidationResult::valid(),
            Err(e) => ValidationResult::invalid(
                Diagnostic::error(FLG0104, format!("Invalid query criteria: {}", e)).to_string(),
            ),
        }
    }

    fn evaluate_one(&self, criteria: &str, patient: PatientId) -> EvalResult<Truth> {
        let rows = self.executor.verdicts(&self.statement(criteria), &[patient])?;
        Ok(rows
            .into_iter()
            .find(|(id, _)| *id == patient)
            .map(|(_, truth)| truth)
            .unwrap_or(Truth::Indeterminate))
    }

    fn evaluate_many(&self, criteria: &str, cohort: &Cohort) -> EvalResult<Cohort> {
        let rows = self.executor.verdicts(&self.statement(criteria), &cohort.to_vec())?;
        Ok(rows
            .into_iter()
            .filter(|(id, truth)| truth.is_true() && cohort.contains(*id))
            .map(|(id, _)| id)
            .collect())
    }
}
