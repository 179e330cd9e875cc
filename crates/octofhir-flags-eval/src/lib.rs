//! Pluggable evaluators for patient flag criteria
//!
//! Three evaluator variants share the [`Evaluator`] capability:
//!
//! | Key | Evaluator | Criteria |
//! |-----|-----------|----------|
//! | `logic` | [`LogicEvaluator`] | clinical logic expression over patient attributes |
//! | `sql` | [`QueryEvaluator`] | SQL predicate or `SELECT` of patient ids |
//! | `script` / `groovy` | [`ScriptEvaluator`] | script with attributes bound as variables |
//!
//! Evaluators are registered once in an [`EvaluatorRegistry`] and shared by every flag.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use chrono::NaiveDate;
//! use octofhir_flags_eval::{Cohort, Evaluator, EvaluatorRegistry, LogicEvaluator, Truth};
//! use octofhir_flags_logic::{InMemoryDataSource, PatientId, PatientRecord};
//!
//! let patients: InMemoryDataSource = vec![
//!     PatientRecord::new(1).with("age", 42i64),
//!     PatientRecord::new(2).with("age", 9i64),
//! ]
//! .into_iter()
//! .collect();
//!
//! let registry = EvaluatorRegistry::new().with(LogicEvaluator::new(
//!     Arc::new(patients),
//!     NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
//! ));
//!
//! let logic = registry.lookup("logic").unwrap();
//! assert_eq!(logic.evaluate_one("age > 18", PatientId(1)).unwrap(), Truth::True);
//! assert_eq!(
//!     logic.evaluate_many("age > 18", &Cohort::from([1, 2])).unwrap(),
//!     Cohort::from([1])
//! );
//! ```

pub mod error;
pub mod evaluator;
pub mod logic;
pub mod query;
pub mod registry;
pub mod script;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod types;

pub use error::{EvalError, EvalResult, RegistryError};
pub use evaluator::{Evaluator, EvaluatorKind, FlagEvaluator};
pub use logic::LogicEvaluator;
pub use query::{QueryEvaluator, QueryExecutor, DEFAULT_ID_COLUMN, DEFAULT_TABLE};
pub use registry::EvaluatorRegistry;
#[cfg(feature = "script")]
pub use script::{EvalexprEngine, PATIENT_ID_VARIABLE};
pub use script::{ScriptEngine, ScriptEvaluator};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteQueryExecutor;
pub use types::{Cohort, Truth, ValidationResult};
