//! Evaluator for the clinical logic criteria language

use crate::error::{EvalError, EvalResult};
use crate::evaluator::{Evaluator, EvaluatorKind};
use crate::types::{Cohort, Truth, ValidationResult};
use chrono::NaiveDate;
use octofhir_flags_logic::{compile, CompiledCriteria, Interpreter, PatientDataSource, PatientId};
use std::sync::Arc;

/// Parses, checks and interprets logic criteria against patient records
pub struct LogicEvaluator {
    source: Arc<dyn PatientDataSource>,
    interpreter: Interpreter,
}

impl LogicEvaluator {
    pub fn new(source: Arc<dyn PatientDataSource>, as_of: NaiveDate) -> Self {
        Self {
            source,
            interpreter: Interpreter::new(as_of),
        }
    }

    /// Evaluator whose reference date is today
    pub fn today(source: Arc<dyn PatientDataSource>) -> Self {
        Self::new(source, chrono::Local::now().date_naive())
    }

    fn compile(&self, criteria: &str) -> Result<CompiledCriteria, octofhir_flags_diagnostics::Diagnostic> {
        let schema = self.source.attributes();
        compile(criteria, schema.as_deref())
    }

    fn compile_for_execution(&self, criteria: &str) -> EvalResult<CompiledCriteria> {
        self.compile(criteria)
            .map_err(|d| EvalError::invalid_criteria(d.to_string()))
    }
}

impl Evaluator for LogicEvaluator {
    fn kind(&self) -> EvaluatorKind {
        EvaluatorKind::Logic
    }

    fn validate(&self, criteria: &str) -> ValidationResult {
        match self.compile(criteria) {
            Ok(_) => ValidationResult::valid(),
            Err(diagnostic) => ValidationResult::invalid(diagnostic.to_string()),
        }
    }

    fn evaluate_one(&self, criteria: &str, patient: PatientId) -> EvalResult<Truth> {
        let compiled = self.compile_for_execution(criteria)?;
        let records = self.source.fetch(&[patient])?;
        let Some(record) = records.iter().find(|r| r.id == patient) else {
            log::debug!("Patient {} unknown to data source", patient);
            return Ok(Truth::Indeterminate);
        };
        Ok(self.interpreter.truth(compiled.expr(), record)?.into())
    }

    fn evaluate_many(&self, criteria: &str, cohort: &Cohort) -> EvalResult<Cohort> {
        if cohort.is_empty() {
            return Ok(Cohort::new());
        }
        let compiled = self.compile_for_execution(criteria)?;
        let records = self.source.fetch(&cohort.to_vec())?;

        let mut matched = Cohort::new();
        for record in &records {
            if self.interpreter.truth(compiled.expr(), record)? == Some(true) {
                matched.insert(record.id);
            }
        }
        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use octofhir_flags_logic::{InMemoryDataSource, PatientRecord};

    fn evaluator() -> LogicEvaluator {
        let source: InMemoryDataSource = vec![
            PatientRecord::new(1).with("age", 30i64),
            PatientRecord::new(2).with("age", 12i64),
            PatientRecord::new(3),
        ]
        .into_iter()
        .collect();
        LogicEvaluator::new(Arc::new(source), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
    }

    #[test]
    fn test_evaluate_one() {
        let e = evaluator();
        assert_eq!(e.evaluate_one("age > 18", PatientId(1)).unwrap(), Truth::True);
        assert_eq!(e.evaluate_one("age > 18", PatientId(2)).unwrap(), Truth::False);
        assert_eq!(e.evaluate_one("age > 18", PatientId(3)).unwrap(), Truth::Indeterminate);
        assert_eq!(e.evaluate_one("age > 18", PatientId(99)).unwrap(), Truth::Indeterminate);
    }

    #[test]
    fn test_evaluate_many_skips_indeterminate() {
        let e = evaluator();
        let cohort = Cohort::from([1, 2, 3, 99]);
        assert_eq!(e.evaluate_many("age > 18", &cohort).unwrap(), Cohort::from([1]));
        assert_eq!(e.evaluate_many("age > 18", &Cohort::new()).unwrap(), Cohort::new());
    }

    #[test]
    fn test_invalid_criteria_is_recoverable() {
        let e = evaluator();
        let err = e.evaluate_one("age >", PatientId(1)).unwrap_err();
        assert!(matches!(err, EvalError::InvalidCriteria { .. }));
        assert!(!e.validate("age >").result());
        assert!(e.validate("age > 18").result());
    }

    #[test]
    fn test_deeply_nested_criteria_is_invalid() {
        let e = evaluator();
        let deep = format!("{}age > 18{}", "(".repeat(200), ")".repeat(200));

        let result = e.validate(&deep);
        assert!(!result.result());
        assert!(result.message().unwrap().contains("FLG0007"));

        let err = e.evaluate_many(&deep, &Cohort::from([1, 2])).unwrap_err();
        assert!(matches!(err, EvalError::InvalidCriteria { .. }));
    }
}
