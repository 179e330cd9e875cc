//! The evaluator capability and its closed set of variants

use crate::error::{EvalResult, RegistryError};
use crate::logic::LogicEvaluator;
use crate::query::QueryEvaluator;
use crate::script::ScriptEvaluator;
use crate::types::{Cohort, Truth, ValidationResult};
use octofhir_flags_logic::PatientId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Validates and executes criteria text
///
/// Implementations are stateless between calls and shared across flags and threads.
pub trait Evaluator: Send + Sync {
    fn kind(&self) -> EvaluatorKind;

    /// Syntax and semantic dry-run; never touches patient data
    fn validate(&self, criteria: &str) -> ValidationResult;

    /// Verdict for a single patient
    fn evaluate_one(&self, criteria: &str, patient: PatientId) -> EvalResult<Truth>;

    /// Patients of `cohort` that satisfy the criteria, in one backend operation
    fn evaluate_many(&self, criteria: &str, cohort: &Cohort) -> EvalResult<Cohort>;
}

/// Stable key identifying an evaluator variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EvaluatorKind {
    Logic,
    Query,
    Script,
}

impl EvaluatorKind {
    pub const ALL: [EvaluatorKind; 3] = [EvaluatorKind::Logic, EvaluatorKind::Query, EvaluatorKind::Script];

    /// Canonical registry key
    pub fn key(self) -> &'static str {
        match self {
            EvaluatorKind::Logic => "logic",
            EvaluatorKind::Query => "sql",
            EvaluatorKind::Script => "script",
        }
    }
}

impl fmt::Display for EvaluatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for EvaluatorKind {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "logic" => Ok(EvaluatorKind::Logic),
            "sql" => Ok(EvaluatorKind::Query),
            "script" | "groovy" => Ok(EvaluatorKind::Script),
            _ => Err(RegistryError::UnknownEvaluator { key: s.to_string() }),
        }
    }
}

impl TryFrom<String> for EvaluatorKind {
    type Error = RegistryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EvaluatorKind> for String {
    fn from(kind: EvaluatorKind) -> Self {
        kind.key().to_string()
    }
}

/// One of the three evaluator variants
pub enum FlagEvaluator {
    Logic(LogicEvaluator),
    Query(QueryEvaluator),
    Script(ScriptEvaluator),
}

impl FlagEvaluator {
    fn inner(&self) -> &dyn Evaluator {
        match self {
            FlagEvaluator::Logic(e) => e,
            FlagEvaluator::Query(e) => e,
            FlagEvaluator::Script(e) => e,
        }
    }
}

impl fmt::Debug for FlagEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FlagEvaluator").field(&self.kind()).finish()
    }
}

impl Evaluator for FlagEvaluator {
    fn kind(&self) -> EvaluatorKind {
        self.inner().kind()
    }

    fn validate(&self, criteria: &str) -> ValidationResult {
        let result = self.inner().validate(criteria);
        log::debug!("{} validate -> {}", self.kind(), result);
        result
    }

    fn evaluate_one(&self, criteria: &str, patient: PatientId) -> EvalResult<Truth> {
        log::debug!("{} evaluate patient {}", self.kind(), patient);
        self.inner().evaluate_one(criteria, patient)
    }

    fn evaluate_many(&self, criteria: &str, cohort: &Cohort) -> EvalResult<Cohort> {
        log::debug!("{} evaluate cohort of {}", self.kind(), cohort.len());
        let matched = self.inner().evaluate_many(criteria, cohort)?;
        // Backends may return ids outside the requested set
        Ok(matched.intersection(cohort))
    }
}

impl From<LogicEvaluator> for FlagEvaluator {
    fn from(e: LogicEvaluator) -> Self {
        FlagEvaluator::Logic(e)
    }
}

impl From<QueryEvaluator> for FlagEvaluator {
    fn from(e: QueryEvaluator) -> Self {
        FlagEvaluator::Query(e)
    }
}

impl From<ScriptEvaluator> for FlagEvaluator {
    fn from(e: ScriptEvaluator) -> Self {
        FlagEvaluator::Script(e)
    }
}
