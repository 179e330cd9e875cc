//! Flag sets: evaluating many flags for a patient or a cohort
//!
//! A failing flag never aborts evaluation of the others; its error is logged and
//! reported next to the flags that fired.

use crate::error::{FlagError, FlagResult};
use crate::flag::Flag;
use indexmap::IndexMap;
use octofhir_flags_eval::{Cohort, Truth, ValidationResult};
use octofhir_flags_logic::PatientId;
use serde::Serialize;
use std::cmp::Ordering;

/// A flag that fired for a patient
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FiredFlag {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
}

/// A flag whose evaluation failed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagFailure {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub error: String,
}

impl FlagFailure {
    fn new(flag: &Flag, error: &FlagError) -> Self {
        Self {
            id: flag.id,
            name: flag.name.clone(),
            code: error.code().to_string(),
            error: error.to_string(),
        }
    }
}

/// Outcome of evaluating every enabled flag for one patient
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PatientFlags {
    pub patient: Option<PatientId>,
    pub fired: Vec<FiredFlag>,
    pub failures: Vec<FlagFailure>,
}

/// Validation verdict for one flag
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagValidation {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluator: Option<String>,
    /// `None` when the flag has no evaluator
    pub validation: Option<ValidationResult>,
}

impl FlagValidation {
    pub fn is_valid(&self) -> bool {
        self.validation.as_ref().is_some_and(ValidationResult::result)
    }
}

/// Flags keyed by id, in insertion order
#[derive(Debug, Clone, Default)]
pub struct FlagSet {
    flags: IndexMap<i64, Flag>,
}

impl FlagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `flag`
    ///
    /// Fails with [`FlagError::DuplicateFlag`] when its id is taken; the set is unchanged.
    pub fn add(&mut self, flag: Flag) -> FlagResult<()> {
        if self.flags.contains_key(&flag.id) {
            return Err(FlagError::DuplicateFlag(flag.id));
        }
        self.flags.insert(flag.id, flag);
        Ok(())
    }

    /// Flag with this id
    pub fn get(&self, id: i64) -> Option<&Flag> {
        self.flags.get(&id)
    }

    /// Flag with this id, for reassigning criteria or evaluator
    pub fn get_mut(&mut self, id: i64) -> Option<&mut Flag> {
        self.flags.get_mut(&id)
    }

    /// Remove and return a flag, keeping the order of the rest
    pub fn remove(&mut self, id: i64) -> Option<Flag> {
        self.flags.shift_remove(&id)
    }

    /// Number of flags
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Flags in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Flag> {
        self.flags.values()
    }

    /// Flags carrying `tag`, compared case-insensitively
    pub fn by_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Flag> + 'a {
        self.flags.values().filter(move |f| f.has_tag(tag))
    }

    /// Enabled flags that fire for `patient`, ordered by priority then name
    pub fn generate_for_patient(&self, patient: PatientId) -> PatientFlags {
        let mut report = PatientFlags {
            patient: Some(patient),
            ..PatientFlags::default()
        };

        for flag in self.flags.values().filter(|f| f.enabled) {
            match flag.eval(Some(patient)) {
                Ok(Some(Truth::True)) => report.fired.push(FiredFlag {
                    id: flag.id,
                    name: flag.name.clone(),
                    message: flag.message.clone(),
                    priority: flag.priority,
                }),
                Ok(_) => {}
                Err(error) => {
                    log::warn!("Flag {} ({}) failed for patient {}: {}", flag.id, flag.name, patient, error);
                    report.failures.push(FlagFailure::new(flag, &error));
                }
            }
        }

        report.fired.sort_by(|a, b| by_priority(a.priority, b.priority).then_with(|| a.name.cmp(&b.name)));
        report
    }

    /// Members of `cohort` for which flag `id` fires
    ///
    /// `Ok(None)` when the flag has no evaluator.
    pub fn flagged_patients(&self, id: i64, cohort: &Cohort) -> FlagResult<Option<Cohort>> {
        let flag = self.get(id).ok_or(FlagError::UnknownFlag(id))?;
        flag.eval_cohort(Some(cohort))
    }

    /// Validation verdict of every flag, enabled or not
    pub fn validate_all(&self) -> Vec<FlagValidation> {
        self.flags
            .values()
            .map(|flag| FlagValidation {
                id: flag.id,
                name: flag.name.clone(),
                evaluator: flag.evaluator_kind().map(|k| k.key().to_string()),
                validation: flag.validate(),
            })
            .collect()
    }
}

fn by_priority(a: Option<i32>, b: Option<i32>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl FromIterator<Flag> for FlagSet {
    /// Later flags replace earlier ones with the same id
    fn from_iter<T: IntoIterator<Item = Flag>>(iter: T) -> Self {
        Self {
            flags: iter.into_iter().map(|f| (f.id, f)).collect(),
        }
    }
}
