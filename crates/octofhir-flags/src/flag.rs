//! Flags: named criteria bound to an evaluator

use crate::error::{FlagError, FlagResult};
use octofhir_flags_eval::{
    Cohort, Evaluator, EvaluatorKind, EvaluatorRegistry, FlagEvaluator, Truth, ValidationResult,
};
use octofhir_flags_logic::PatientId;
use std::sync::Arc;

/// A named rule pairing criteria text with a chosen evaluator
///
/// A new flag has empty criteria and no evaluator. Both may be reassigned any
/// number of times. Flags are plain values and are not synchronized: callers
/// sharing one flag across threads must serialize access to it.
#[derive(Debug, Clone)]
pub struct Flag {
    pub id: i64,
    pub name: String,
    pub criteria: String,
    /// Shown when the flag fires for a patient
    pub message: Option<String>,
    /// Lower values sort first; unranked flags sort last
    pub priority: Option<i32>,
    pub tags: Vec<String>,
    pub enabled: bool,
    evaluator: Option<Arc<FlagEvaluator>>,
}

impl Flag {
    /// Enabled flag with empty criteria and no evaluator
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            criteria: String::new(),
            message: None,
            priority: None,
            tags: Vec::new(),
            enabled: true,
            evaluator: None,
        }
    }

    /// Replace the criteria text
    pub fn with_criteria(mut self, criteria: impl Into<String>) -> Self {
        self.criteria = criteria.into();
        self
    }

    /// Message shown when the flag fires
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Rank among flags firing for the same patient
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Add a tag; tags may repeat
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Tag membership, ignoring ASCII case
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Assign the evaluator registered under `key`
    ///
    /// An unknown key fails with [`FlagError::InvalidEvaluator`] and leaves the
    /// current evaluator in place.
    pub fn set_evaluator(&mut self, registry: &EvaluatorRegistry, key: &str) -> FlagResult<()> {
        let evaluator = registry
            .lookup(key)
            .map_err(|source| FlagError::InvalidEvaluator {
                key: key.to_string(),
                source,
            })?;
        self.evaluator = Some(evaluator);
        Ok(())
    }

    /// Unassign the evaluator; `validate` and `eval` then return `None`
    pub fn clear_evaluator(&mut self) {
        self.evaluator = None;
    }

    /// The assigned evaluator, if any
    pub fn evaluator(&self) -> Option<&Arc<FlagEvaluator>> {
        self.evaluator.as_ref()
    }

    /// Kind of the assigned evaluator
    pub fn evaluator_kind(&self) -> Option<EvaluatorKind> {
        self.evaluator.as_ref().map(|e| e.kind())
    }

    /// Dry-run the criteria with the assigned evaluator
    ///
    /// `None` when no evaluator is assigned: validation is not applicable yet.
    pub fn validate(&self) -> Option<ValidationResult> {
        self.evaluator.as_ref().map(|e| e.validate(&self.criteria))
    }

    /// Evaluate the flag for one patient
    ///
    /// Returns `Ok(None)` when no evaluator is assigned or no patient is given.
    /// Unlike [`eval_cohort`](Self::eval_cohort), an absent target yields no result
    /// rather than an empty one.
    pub fn eval(&self, patient: Option<PatientId>) -> FlagResult<Option<Truth>> {
        let (Some(evaluator), Some(patient)) = (&self.evaluator, patient) else {
            return Ok(None);
        };
        evaluator
            .evaluate_one(&self.criteria, patient)
            .map(Some)
            .map_err(|source| self.failure(source))
    }

    /// Patients of `cohort` for which the flag fires
    ///
    /// Returns `Ok(None)` only when no evaluator is assigned. An absent or empty
    /// cohort yields an empty cohort without calling the evaluator.
    pub fn eval_cohort(&self, cohort: Option<&Cohort>) -> FlagResult<Option<Cohort>> {
        let Some(evaluator) = &self.evaluator else {
            return Ok(None);
        };
        let Some(cohort) = cohort.filter(|c| !c.is_empty()) else {
            return Ok(Some(Cohort::new()));
        };
        evaluator
            .evaluate_many(&self.criteria, cohort)
            .map(Some)
            .map_err(|source| self.failure(source))
    }

    fn failure(&self, source: octofhir_flags_eval::EvalError) -> FlagError {
        FlagError::Evaluation {
            flag: self.name.clone(),
            source,
        }
    }
}
