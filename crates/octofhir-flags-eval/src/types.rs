//! Result types shared by all evaluators

use octofhir_flags_logic::PatientId;
use serde::{Deserialize, Serialize};
use std::collections::btree_set;
use std::collections::BTreeSet;
use std::fmt;

/// Tri-state verdict of a criteria for one patient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Truth {
    True,
    False,
    /// Well-formed evaluation with no definite answer (missing data, null result)
    Indeterminate,
}

impl Truth {
    pub fn is_true(self) -> bool {
        self == Truth::True
    }
}

impl From<bool> for Truth {
    fn from(b: bool) -> Self {
        if b { Truth::True } else { Truth::False }
    }
}

impl From<Option<bool>> for Truth {
    fn from(b: Option<bool>) -> Self {
        b.map(Truth::from).unwrap_or(Truth::Indeterminate)
    }
}

impl fmt::Display for Truth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Truth::True => write!(f, "true"),
            Truth::False => write!(f, "false"),
            Truth::Indeterminate => write!(f, "indeterminate"),
        }
    }
}

/// Unordered, deduplicated set of patient ids
///
/// Iteration order is ascending by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cohort(BTreeSet<PatientId>);

impl Cohort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a patient; `false` if already a member
    pub fn insert(&mut self, id: PatientId) -> bool {
        self.0.insert(id)
    }

    /// Whether `id` is a member
    pub fn contains(&self, id: PatientId) -> bool {
        self.0.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = PatientId> + '_ {
        self.0.iter().copied()
    }

    /// Ids as a vector, ascending
    pub fn to_vec(&self) -> Vec<PatientId> {
        self.iter().collect()
    }

    /// Members present in both cohorts
    pub fn intersection(&self, other: &Cohort) -> Cohort {
        Cohort(self.0.intersection(&other.0).copied().collect())
    }
}

impl FromIterator<PatientId> for Cohort {
    fn from_iter<T: IntoIterator<Item = PatientId>>(iter: T) -> Self {
        Cohort(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[i64; N]> for Cohort {
    fn from(ids: [i64; N]) -> Self {
        ids.into_iter().map(PatientId).collect()
    }
}

impl IntoIterator for Cohort {
    type Item = PatientId;
    type IntoIter = btree_set::IntoIter<PatientId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Cohort {
    type Item = &'a PatientId;
    type IntoIter = btree_set::Iter<'a, PatientId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Outcome of a syntax and semantic dry-run of criteria
///
/// Produced fresh by every validation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    result: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self {
            result: true,
            message: None,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            result: false,
            message: Some(message.into()),
        }
    }

    pub fn result(&self) -> bool {
        self.result
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.result, &self.message) {
            (true, _) => write!(f, "valid"),
            (false, Some(message)) => write!(f, "invalid: {}", message),
            (false, None) => write!(f, "invalid"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truth_from_option() {
        assert_eq!(Truth::from(Some(true)), Truth::True);
        assert_eq!(Truth::from(Some(false)), Truth::False);
        assert_eq!(Truth::from(None), Truth::Indeterminate);
        assert_eq!(serde_json::to_string(&Truth::Indeterminate).unwrap(), "\"indeterminate\"");
    }

    #[test]
    fn test_cohort_dedup_and_order() {
        let cohort: Cohort = [3, 1, 3, 2].into_iter().map(PatientId).collect();
        assert_eq!(cohort.len(), 3);
        assert_eq!(cohort.to_vec(), vec![PatientId(1), PatientId(2), PatientId(3)]);
        assert_eq!(serde_json::to_string(&cohort).unwrap(), "[1,2,3]");
    }

    #[test]
    fn test_cohort_intersection() {
        let a = Cohort::from([1, 2, 3]);
        let b = Cohort::from([2, 3, 4]);
        assert_eq!(a.intersection(&b), Cohort::from([2, 3]));
    }

    #[test]
    fn test_validation_result() {
        let ok = ValidationResult::valid();
        assert!(ok.result());
        assert_eq!(ok.message(), None);

        let bad = ValidationResult::invalid("syntax error");
        assert!(!bad.result());
        assert_eq!(bad.message(), Some("syntax error"));
        assert_eq!(bad.to_string(), "invalid: syntax error");
    }
}
