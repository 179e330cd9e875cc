//! Flag set tests: configuration loading, per-patient reports and batching

use mockall::mock;
use octofhir_flags::eval::{
    Cohort, EvalError, EvalResult, EvaluatorRegistry, QueryEvaluator, QueryExecutor, Truth,
};
use octofhir_flags::logic::{InMemoryDataSource, PatientId, PatientRecord};
use octofhir_flags::{EngineConfig, Flag, FlagError, FlagSet};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::io::Write;
use std::sync::Arc;

mock! {
    Executor {}

    impl QueryExecutor for Executor {
        fn prepare(&self, sql: &str) -> EvalResult<()>;
        fn verdicts(&self, sql: &str, ids: &[PatientId]) -> EvalResult<Vec<(PatientId, Truth)>>;
    }
}

const CONFIG: &str = r#"{
    "flags": [
        {"id": 1, "name": "Adult", "criteria": "age > 18", "evaluator": "logic", "priority": 2},
        {"id": 2, "name": "Female", "criteria": "gender = 'F'", "evaluator": "sql", "priority": 1,
         "message": "Offer screening", "tags": ["screening"]},
        {"id": 3, "name": "Broken", "criteria": "no_such_column = 1", "evaluator": "sql"},
        {"id": 4, "name": "Disabled", "criteria": "true", "evaluator": "logic", "enabled": false},
        {"id": 5, "name": "Anyone", "criteria": "patient_id > 0", "evaluator": "groovy"},
        {"id": 6, "name": "Unassigned", "criteria": "age > 18"}
    ],
    "logic": {"asOf": "2024-01-01"}
}"#;

fn patients() -> InMemoryDataSource {
    vec![
        PatientRecord::new(1).with("age", 34i64).with("gender", "F"),
        PatientRecord::new(2).with("age", 7i64).with("gender", "M"),
        PatientRecord::new(3).with("age", 61i64).with("gender", "M"),
    ]
    .into_iter()
    .collect()
}

fn flag_set() -> FlagSet {
    let config = EngineConfig::from_json(CONFIG).unwrap();
    let registry = config.build_registry(Arc::new(patients())).unwrap();
    config.build_flag_set(&registry).unwrap()
}

#[test]
fn test_report_orders_by_priority_then_name() {
    let report = flag_set().generate_for_patient(PatientId(1));
    let fired: Vec<&str> = report.fired.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(fired, vec!["Female", "Adult", "Anyone"]);
    assert_eq!(report.fired[0].message.as_deref(), Some("Offer screening"));
}

#[test]
fn test_failing_flag_does_not_hide_others() {
    let report = flag_set().generate_for_patient(PatientId(3));
    let fired: Vec<i64> = report.fired.iter().map(|f| f.id).collect();
    assert_eq!(fired, vec![1, 5]);

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].id, 3);
    assert_eq!(report.failures[0].code, "FLG0204");
}

#[test]
fn test_report_serializes_camel_case() {
    let report = flag_set().generate_for_patient(PatientId(2));
    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["patient"], json!(2));
    assert_eq!(value["fired"], json!([{"id": 5, "name": "Anyone"}]));
}

#[test]
fn test_validate_all() {
    let results = flag_set().validate_all();
    let verdicts: Vec<(i64, Option<bool>)> = results
        .iter()
        .map(|r| (r.id, r.validation.as_ref().map(|v| v.result())))
        .collect();
    assert_eq!(
        verdicts,
        vec![
            (1, Some(true)),
            (2, Some(true)),
            (3, Some(false)),
            (4, Some(true)),
            (5, Some(true)),
            (6, None),
        ]
    );
}

#[test]
fn test_flagged_patients_and_tags() {
    let set = flag_set();
    let everyone = Cohort::from([1, 2, 3]);
    assert_eq!(set.flagged_patients(1, &everyone).unwrap(), Some(Cohort::from([1, 3])));
    assert_eq!(set.flagged_patients(6, &everyone).unwrap(), None);
    assert!(matches!(set.flagged_patients(3, &everyone), Err(FlagError::Evaluation { .. })));

    let tagged: Vec<i64> = set.by_tag("SCREENING").map(|f| f.id).collect();
    assert_eq!(tagged, vec![2]);
}

#[test]
fn test_config_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{}", CONFIG).unwrap();

    let config = EngineConfig::from_file(file.path()).unwrap();
    assert_eq!(config.flags.len(), 6);
    assert_eq!(config.flags[4].evaluator.as_deref(), Some("groovy"));

    let err = EngineConfig::from_file("/nonexistent/flags.json").unwrap_err();
    assert!(matches!(err, FlagError::Io(_)));
}

#[test]
fn test_cohort_runs_one_query() {
    let mut executor = MockExecutor::new();
    executor
        .expect_verdicts()
        .times(1)
        .returning(|_, ids| {
            assert_eq!(ids, &[PatientId(1), PatientId(2), PatientId(3)]);
            Ok(vec![
                (PatientId(1), Truth::True),
                (PatientId(2), Truth::Indeterminate),
                (PatientId(3), Truth::False),
            ])
        });
    let registry = EvaluatorRegistry::new().with(QueryEvaluator::new(Arc::new(executor)));

    let mut flag = Flag::new(1, "Adult").with_criteria("age > 18");
    flag.set_evaluator(&registry, "sql").unwrap();
    assert_eq!(
        flag.eval_cohort(Some(&Cohort::from([3, 1, 2]))).unwrap(),
        Some(Cohort::from([1]))
    );
    // Empty input never reaches the executor
    assert_eq!(flag.eval_cohort(Some(&Cohort::new())).unwrap(), Some(Cohort::new()));
}

#[test]
fn test_executor_error_is_reported() {
    let mut executor = MockExecutor::new();
    executor
        .expect_verdicts()
        .returning(|_, _| Err(EvalError::query("database is locked")));
    let registry = EvaluatorRegistry::new().with(QueryEvaluator::new(Arc::new(executor)));

    let mut flag = Flag::new(7, "Locked").with_criteria("1 = 1");
    flag.set_evaluator(&registry, "sql").unwrap();
    let err = flag.eval(Some(PatientId(1))).unwrap_err();
    assert_eq!(err.to_string(), "Flag 'Locked' failed: Query failed: database is locked");
}
