//! Evaluator for script criteria
//!
//! Script execution sits behind [`ScriptEngine`] so that sandboxing or resource
//! limits can be added without touching flags or the registry.

use crate::error::{EvalError, EvalResult};
use crate::evaluator::{Evaluator, EvaluatorKind};
use crate::types::{Cohort, Truth, ValidationResult};
use octofhir_flags_diagnostics::{Diagnostic, FLG0105};
use octofhir_flags_logic::{PatientDataSource, PatientId, PatientRecord};
use std::sync::Arc;

/// Script-execution capability
pub trait ScriptEngine: Send + Sync {
    /// Compile `source` without running it
    fn check(&self, source: &str) -> Result<(), String>;

    /// Compile `source` once and run it for every record, in order
    fn run(&self, source: &str, records: &[PatientRecord]) -> EvalResult<Vec<Truth>>;
}

/// Runs script criteria with patient attributes bound as variables
pub struct ScriptEvaluator {
    engine: Arc<dyn ScriptEngine>,
    source: Arc<dyn PatientDataSource>,
}

impl ScriptEvaluator {
    pub fn new(engine: Arc<dyn ScriptEngine>, source: Arc<dyn PatientDataSource>) -> Self {
        Self { engine, source }
    }
}

impl Evaluator for ScriptEvaluator {
    fn kind(&self) -> EvaluatorKind {
        EvaluatorKind::Script
    }

    fn validate(&self, criteria: &str) -> ValidationResult {
        if criteria.trim().is_empty() {
            return ValidationResult::invalid(
                Diagnostic::error(FLG0105, "Script criteria is empty").to_string(),
            );
        }
        match self.engine.check(criteria) {
            Ok(()) => ValidationResult::valid(),
            Err(message) => ValidationResult::invalid(
                Diagnostic::error(FLG0105, format!("Invalid script criteria: {}", message))
                    .to_string(),
            ),
        }
    }

    fn evaluate_one(&self, criteria: &str, patient: PatientId) -> EvalResult<Truth> {
        let records = self.source.fetch(&[patient])?;
        if records.is_empty() {
            return Ok(Truth::Indeterminate);
        }
        let verdicts = self.engine.run(criteria, &records)?;
        Ok(verdicts.first().copied().unwrap_or(Truth::Indeterminate))
    }

    fn evaluate_many(&self, criteria: &str, cohort: &Cohort) -> EvalResult<Cohort> {
        if cohort.is_empty() {
            return Ok(Cohort::new());
        }
        let records = self.source.fetch(&cohort.to_vec())?;
        if records.is_empty() {
            return Ok(Cohort::new());
        }
        let verdicts = self.engine.run(criteria, &records)?;
        if verdicts.len() != records.len() {
            return Err(EvalError::script(format!(
                "engine returned {} verdicts for {} patients",
                verdicts.len(),
                records.len()
            )));
        }
        Ok(records
            .iter()
            .zip(verdicts)
            .filter(|(_, truth)| truth.is_true())
            .map(|(record, _)| record.id)
            .collect())
    }
}

#[cfg(feature = "script")]
pub use self::evalexpr_engine::{EvalexprEngine, PATIENT_ID_VARIABLE};

#[cfg(feature = "script")]
mod evalexpr_engine {
    use super::ScriptEngine;
    use crate::error::{EvalError, EvalResult};
    use crate::types::Truth;
    use evalexpr::{ContextWithMutableVariables, HashMapContext, Node, Value};
    use octofhir_flags_logic::{LogicValue, PatientRecord};
    use std::collections::HashSet;

    /// Variable bound to the patient id in every run
    pub const PATIENT_ID_VARIABLE: &str = "patient_id";

    /// [`ScriptEngine`] for `evalexpr` expressions
    ///
    /// Attributes are bound by name; attributes the script references but the record
    /// lacks are bound to the empty value `()`. A script that fails only because it
    /// touched such a missing attribute is indeterminate for that patient.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct EvalexprEngine;

    impl EvalexprEngine {
        pub fn new() -> Self {
            Self
        }

        fn compile(source: &str) -> Result<Node, String> {
            evalexpr::build_operator_tree(source).map_err(|e| e.to_string())
        }

        fn bindings(node: &Node, record: &PatientRecord) -> EvalResult<(HashMapContext, bool)> {
            let mut context = HashMapContext::new();
            let mut missing = false;
            let bind = |context: &mut HashMapContext, name: &str, value: Value| {
                context
                    .set_value(name.to_string(), value)
                    .map_err(|e| EvalError::script(e.to_string()))
            };

            bind(&mut context, PATIENT_ID_VARIABLE, Value::Int(record.id.value()))?;
            let referenced: HashSet<&str> = node.iter_variable_identifiers().collect();
            for name in referenced {
                if name == PATIENT_ID_VARIABLE {
                    continue;
                }
                let value = match record.get(name) {
                    Some(value) if !value.is_null() => script_value(value),
                    _ => {
                        missing = true;
                        Value::Empty
                    }
                };
                bind(&mut context, name, value)?;
            }
            Ok((context, missing))
        }
    }

    fn script_value(value: &LogicValue) -> Value {
        match value {
            LogicValue::Null => Value::Empty,
            LogicValue::Boolean(b) => Value::Boolean(*b),
            LogicValue::Integer(i) => Value::Int(*i),
            LogicValue::Decimal(d) => d
                .to_string()
                .parse::<f64>()
                .map(Value::Float)
                .unwrap_or(Value::Empty),
            LogicValue::String(s) => Value::String(s.clone()),
            LogicValue::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
            LogicValue::List(items) => Value::Tuple(items.iter().map(script_value).collect()),
        }
    }

    impl ScriptEngine for EvalexprEngine {
        fn check(&self, source: &str) -> Result<(), String> {
            Self::compile(source).map(|_| ())
        }

        fn run(&self, source: &str, records: &[PatientRecord]) -> EvalResult<Vec<Truth>> {
            let node = Self::compile(source).map_err(EvalError::script)?;
            let mut verdicts = Vec::with_capacity(records.len());

            for record in records {
                let (context, missing) = Self::bindings(&node, record)?;
                let verdict = match node.eval_with_context(&context) {
                    Ok(Value::Boolean(b)) => Truth::from(b),
                    Ok(Value::Empty) => Truth::Indeterminate,
                    Ok(other) => {
                        return Err(EvalError::NonBoolean {
                            patient: record.id.value(),
                            found: format!("{:?}", other),
                        });
                    }
                    Err(_) if missing => Truth::Indeterminate,
                    Err(e) => return Err(EvalError::script(format!("patient {}: {}", record.id, e))),
                };
                verdicts.push(verdict);
            }
            Ok(verdicts)
        }
    }

}
