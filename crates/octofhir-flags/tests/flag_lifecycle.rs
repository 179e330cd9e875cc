//! Flag lifecycle tests: evaluator assignment, validation and evaluation
//!
//! Covers:
//! - Assigning evaluators by key, including unknown keys
//! - Results when no evaluator is assigned or no target is given
//! - Valid and invalid criteria per evaluator
//! - Cohort evaluation agreeing with per-patient evaluation

use chrono::NaiveDate;
use octofhir_flags::eval::{Cohort, EvaluatorKind, EvaluatorRegistry, Truth};
use octofhir_flags::logic::{InMemoryDataSource, PatientId, PatientRecord};
use octofhir_flags::{EngineConfig, Flag, FlagError, LogicConfig};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::{fixture, rstest};
use std::sync::Arc;

fn patients() -> InMemoryDataSource {
    vec![
        PatientRecord::new(1).with("age", 34i64).with("gender", "F"),
        PatientRecord::new(2).with("age", 7i64).with("gender", "M"),
        PatientRecord::new(3).with("age", 61i64).with("gender", "M"),
        PatientRecord::new(4).with("age", 16i64).with("gender", "F"),
        PatientRecord::new(5).with("gender", "F"),
    ]
    .into_iter()
    .collect()
}

#[fixture]
fn registry() -> EvaluatorRegistry {
    let config = EngineConfig {
        logic: LogicConfig {
            as_of: NaiveDate::from_ymd_opt(2024, 1, 1),
        },
        ..EngineConfig::default()
    };
    config.build_registry(Arc::new(patients())).unwrap()
}

fn flag_with(registry: &EvaluatorRegistry, key: &str, criteria: &str) -> Flag {
    let mut flag = Flag::new(1, "Adult").with_criteria(criteria);
    flag.set_evaluator(registry, key).unwrap();
    flag
}

// === Evaluator assignment ===

#[rstest]
#[case("logic", EvaluatorKind::Logic)]
#[case("sql", EvaluatorKind::Query)]
#[case("groovy", EvaluatorKind::Script)]
#[case("script", EvaluatorKind::Script)]
fn test_set_evaluator(registry: EvaluatorRegistry, #[case] key: &str, #[case] kind: EvaluatorKind) {
    let mut flag = Flag::new(1, "Adult");
    flag.set_evaluator(&registry, key).unwrap();
    assert_eq!(flag.evaluator_kind(), Some(kind));
}

#[rstest]
fn test_set_evaluator_unknown_key(registry: EvaluatorRegistry) {
    let mut flag = Flag::new(1, "Adult");
    let err = flag.set_evaluator(&registry, "bogus").unwrap_err();
    assert!(matches!(err, FlagError::InvalidEvaluator { ref key, .. } if key == "bogus"));
    assert_eq!(flag.evaluator_kind(), None);

    // A failed assignment keeps the previous evaluator
    flag.set_evaluator(&registry, "sql").unwrap();
    assert!(flag.set_evaluator(&registry, "bogus").is_err());
    assert_eq!(flag.evaluator_kind(), Some(EvaluatorKind::Query));
}

// === No evaluator ===

#[test]
fn test_without_evaluator_nothing_is_evaluated() {
    let flag = Flag::new(1, "Adult").with_criteria("age > 18");
    assert_eq!(flag.validate(), None);
    assert_eq!(flag.eval(Some(PatientId(1))).unwrap(), None);
    assert_eq!(flag.eval_cohort(Some(&Cohort::from([1, 2]))).unwrap(), None);
    assert_eq!(flag.eval_cohort(None).unwrap(), None);
}

// === Validation ===

#[rstest]
#[case("logic", "age > 18 and gender = 'F'")]
#[case("sql", "SELECT patient_id FROM patient WHERE gender = 'M'")]
#[case("sql", "age > 18")]
#[case("groovy", "age > 18 && gender == \"F\"")]
fn test_validate_accepts(registry: EvaluatorRegistry, #[case] key: &str, #[case] criteria: &str) {
    let flag = flag_with(&registry, key, criteria);
    let result = flag.validate().unwrap();
    assert!(result.result(), "{} rejected {:?}: {}", key, criteria, result);
    assert_eq!(result.message(), None);
}

#[rstest]
#[case("logic", "age >")]
#[case("sql", "SELECT * FRM patient")]
#[case("sql", "this is not sql")]
#[case("groovy", "(age > 18")]
fn test_validate_rejects(registry: EvaluatorRegistry, #[case] key: &str, #[case] criteria: &str) {
    let flag = flag_with(&registry, key, criteria);
    let result = flag.validate().unwrap();
    assert!(!result.result(), "{} accepted {:?}", key, criteria);
    assert!(result.message().is_some_and(|m| !m.is_empty()));
}

#[rstest]
fn test_validation_message(registry: EvaluatorRegistry) {
    let flag = flag_with(&registry, "logic", "Frobnicate(age)");
    insta::assert_snapshot!(
        flag.validate().unwrap().to_string(),
        @"invalid: error: FLG0101 - Unknown function 'Frobnicate' at 1:1"
    );
}

#[rstest]
fn test_validate_has_no_side_effects(registry: EvaluatorRegistry) {
    let flag = flag_with(&registry, "sql", "age > 18");
    let first = flag.validate();
    assert_eq!(flag.validate(), first);
    assert_eq!(flag.eval(Some(PatientId(1))).unwrap(), Some(Truth::True));
}

// === Single-patient evaluation ===

#[rstest]
#[case("logic")]
#[case("sql")]
#[case("groovy")]
fn test_eval_single_patient(registry: EvaluatorRegistry, #[case] key: &str) {
    let flag = flag_with(&registry, key, "age > 18");
    assert_eq!(flag.eval(Some(PatientId(1))).unwrap(), Some(Truth::True));
    assert_eq!(flag.eval(Some(PatientId(2))).unwrap(), Some(Truth::False));
    assert_eq!(flag.eval(None).unwrap(), None);
}

#[rstest]
#[case("logic")]
#[case("sql")]
#[case("groovy")]
fn test_eval_missing_data_is_indeterminate(registry: EvaluatorRegistry, #[case] key: &str) {
    let flag = flag_with(&registry, key, "age > 18");
    assert_eq!(flag.eval(Some(PatientId(5))).unwrap(), Some(Truth::Indeterminate));
}

#[rstest]
fn test_eval_invalid_criteria_fails(registry: EvaluatorRegistry) {
    let flag = flag_with(&registry, "logic", "age >");
    let err = flag.eval(Some(PatientId(1))).unwrap_err();
    assert!(matches!(err, FlagError::Evaluation { ref flag, .. } if flag == "Adult"));
}

// === Cohort evaluation ===

#[rstest]
#[case("logic")]
#[case("sql")]
#[case("groovy")]
fn test_eval_cohort_adults(registry: EvaluatorRegistry, #[case] key: &str) {
    let flag = flag_with(&registry, key, "age > 18");
    let cohort = Cohort::from([1, 2, 3, 4, 5]);
    assert_eq!(flag.eval_cohort(Some(&cohort)).unwrap(), Some(Cohort::from([1, 3])));
    assert_eq!(flag.eval_cohort(Some(&Cohort::from([2, 4]))).unwrap(), Some(Cohort::new()));
}

#[rstest]
#[case("logic")]
#[case("sql")]
#[case("groovy")]
fn test_eval_cohort_empty_or_absent(registry: EvaluatorRegistry, #[case] key: &str) {
    let flag = flag_with(&registry, key, "age > 18");
    assert_eq!(flag.eval_cohort(Some(&Cohort::new())).unwrap(), Some(Cohort::new()));
    assert_eq!(flag.eval_cohort(None).unwrap(), Some(Cohort::new()));
}

#[rstest]
fn test_eval_cohort_empty_skips_invalid_criteria(registry: EvaluatorRegistry) {
    let flag = flag_with(&registry, "sql", "SELECT * FRM patient");
    assert_eq!(flag.eval_cohort(None).unwrap(), Some(Cohort::new()));
    assert!(flag.eval_cohort(Some(&Cohort::from([1]))).is_err());
}

fn adult_women(key: &str) -> &'static str {
    match key {
        "groovy" => "age > 18 && gender == \"F\"",
        _ => "age > 18 and gender = 'F'",
    }
}

proptest! {
    #[test]
    fn prop_cohort_matches_single_evaluation(
        ids in prop::collection::btree_set(1i64..=8, 0..8),
        key in prop::sample::select(vec!["logic", "sql", "groovy"]),
    ) {
        let registry = registry();
        let flag = flag_with(&registry, key, adult_women(key));
        let cohort: Cohort = ids.iter().copied().map(PatientId).collect();

        let batch = flag.eval_cohort(Some(&cohort)).unwrap().unwrap();
        let single: Cohort = cohort
            .iter()
            .filter(|&id| flag.eval(Some(id)).unwrap() == Some(Truth::True))
            .collect();
        prop_assert_eq!(batch, single);
    }
}
