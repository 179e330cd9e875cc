//! End-to-end tests for compiling and evaluating criteria
//!
//! Covers:
//! - Syntax acceptance and rejection with error codes
//! - Nesting limits
//! - Schema-aware compilation
//! - Evaluation against patient records

use chrono::NaiveDate;
use octofhir_flags_diagnostics::{ErrorCode, FLG0001, FLG0002, FLG0003, FLG0004, FLG0005, FLG0006, FLG0007, FLG0100, FLG0101, FLG0102, FLG0103};
use octofhir_flags_logic::{compile, Interpreter, LogicValue, PatientRecord, MAX_DEPTH};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

fn evaluate(source: &str, record: &PatientRecord) -> Option<bool> {
    let compiled = compile(source, None).unwrap_or_else(|e| panic!("Failed to compile {:?}: {}", source, e));
    Interpreter::new(as_of())
        .truth(compiled.expr(), record)
        .unwrap_or_else(|e| panic!("Failed to evaluate {:?}: {}", source, e))
}

fn adult() -> PatientRecord {
    PatientRecord::new(1)
        .with("age", 42i64)
        .with("gender", "F")
        .with("birthDate", NaiveDate::from_ymd_opt(1982, 3, 2).unwrap())
        .with(
            "diagnoses",
            LogicValue::List(vec![LogicValue::from("B20"), LogicValue::from("A15.0")]),
        )
}

// === Accepted Syntax ===

#[rstest]
#[case("age > 18")]
#[case("age >= 18 and gender = 'F'")]
#[case("not (age < 18)")]
#[case("age between 15 and 49 and gender = 'F'")]
#[case("\"last viral load\" > 1000")]
#[case("gender in {'F', 'M'}")]
#[case("cd4 is null or cd4 < 200")]
#[case("pregnant implies age >= 12")]
#[case("enrolled < @2023-01-01")]
#[case("AgeInYears() >= 18")]
#[case("ageinyears() >= 18")]
#[case("Coalesce(weight, 0) > 40")]
#[case("Matches(Lower(code), 'b2[0-4]')")]
#[case("-age < -1.5")]
#[case("true")]
fn test_valid_criteria(#[case] source: &str) {
    assert!(compile(source, None).is_ok(), "expected {:?} to compile", source);
}

// === Rejected Syntax ===

#[rstest]
#[case("", FLG0006)]
#[case("age > ) 18", FLG0001)]
#[case("age > 18 18", FLG0001)]
#[case("age >", FLG0002)]
#[case("(age > 18", FLG0002)]
#[case("gender = 'F", FLG0003)]
#[case("\"last viral load > 1000", FLG0003)]
#[case("age > 99999999999999999999", FLG0004)]
#[case("enrolled < @2023-02-30", FLG0005)]
#[case("enrolled < @", FLG0005)]
#[case("Frobnicate(age)", FLG0101)]
#[case("AgeInYears(birthDate, 1) > 3", FLG0102)]
#[case("age + 1", FLG0103)]
#[case("'yes'", FLG0103)]
fn test_invalid_criteria(#[case] source: &str, #[case] code: ErrorCode) {
    let err = compile(source, None).unwrap_err();
    assert_eq!(err.code, code, "unexpected diagnostic for {:?}: {}", source, err);
}

// === Nesting Limit ===

fn repeated(open: &str, inner: &str, close: &str, levels: usize) -> String {
    format!("{}{}{}", open.repeat(levels), inner, close.repeat(levels))
}

#[rstest]
#[case::groups("(", "true", ")")]
#[case::negations("not ", "true", "")]
#[case::minus("-", "1 > 0", "")]
#[case::lists("1 in {", "1", "}")]
#[case::calls("Coalesce(", "true", ")")]
fn test_deep_nesting_is_rejected(#[case] open: &str, #[case] inner: &str, #[case] close: &str) {
    let source = repeated(open, inner, close, 200);
    let err = compile(&source, None).unwrap_err();
    assert_eq!(err.code, FLG0007, "unexpected diagnostic: {}", err);
    assert!(err.message.contains("nested too deeply"));
}

#[rstest]
#[case(" and ")]
#[case(" or ")]
#[case(" + ")]
fn test_long_operator_chain_is_rejected(#[case] op: &str) {
    let source = vec!["1"; 5000].join(op);
    assert_eq!(compile(&source, None).unwrap_err().code, FLG0007);
}

#[test]
fn test_nesting_within_limit_evaluates() {
    let record = PatientRecord::new(1);
    let levels = MAX_DEPTH - 4;

    assert_eq!(evaluate(&repeated("(", "true", ")", levels), &record), Some(true));
    assert_eq!(evaluate(&repeated("not ", "true", "", levels), &record), Some(true));
    assert_eq!(evaluate(&vec!["true"; levels].join(" and "), &record), Some(true));
    assert_eq!(evaluate(&repeated("-", "1 > 0", "", levels), &record), Some(true));
}

#[test]
fn test_unknown_attribute_with_schema() {
    let schema = vec!["age".to_string(), "gender".to_string()];

    assert!(compile("age > 18 and gender = 'F'", Some(&schema)).is_ok());

    let err = compile("age > 18 and weight > 80", Some(&schema)).unwrap_err();
    assert_eq!(err.code, FLG0100);
    assert_eq!(err.message, "Unknown attribute 'weight'");
    let location = err.location.unwrap();
    assert_eq!((location.line, location.column), (1, 14));
}

#[test]
fn test_multiline_error_location() {
    let err = compile("age > 18\nand gender = ", None).unwrap_err();
    assert_eq!(err.code, FLG0002);
    assert_eq!(err.location.unwrap().line, 2);
}

// === Evaluation ===

#[rstest]
#[case("age > 18", Some(true))]
#[case("age < 18", Some(false))]
#[case("AgeInYears() = 41", Some(true))]
#[case("AgeInYearsAt(@2030-01-01) = 47", Some(true))]
#[case("'B20' in diagnoses", Some(true))]
#[case("Count(diagnoses) = 2", Some(true))]
#[case("Exists(cd4)", Some(false))]
#[case("cd4 < 200", None)]
#[case("cd4 < 200 and gender = 'M'", Some(false))]
#[case("cd4 < 200 or gender = 'F'", Some(true))]
#[case("Coalesce(cd4, 500) >= 500", Some(true))]
#[case("Upper(gender) = 'F' and Length(gender) = 1", Some(true))]
fn test_evaluate_adult(#[case] source: &str, #[case] expected: Option<bool>) {
    assert_eq!(evaluate(source, &adult()), expected, "criteria {:?}", source);
}

#[test]
fn test_record_from_json_evaluates() {
    let record = PatientRecord::from_json(&serde_json::json!({
        "id": 12,
        "birthDate": "2010-07-15",
        "hivPositive": true
    }))
    .unwrap();

    assert_eq!(evaluate("hivPositive and AgeInYears() < 15", &record), Some(true));
    assert_eq!(evaluate("AgeInYears() >= 18", &record), Some(false));
}
