//! Patient flag evaluation engine
//!
//! A flag pairs criteria text with one of three evaluators (`logic`, `sql`,
//! `script`) and can be validated, evaluated for a single patient, or evaluated
//! over a cohort.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use octofhir_flags::{EngineConfig, Flag};
//! use octofhir_flags::eval::{Cohort, Truth};
//! use octofhir_flags::logic::{InMemoryDataSource, PatientId, PatientRecord};
//!
//! let patients: InMemoryDataSource = vec![
//!     PatientRecord::new(1).with("age", 42i64),
//!     PatientRecord::new(2).with("age", 9i64),
//! ]
//! .into_iter()
//! .collect();
//!
//! let registry = EngineConfig::default().build_registry(Arc::new(patients)).unwrap();
//!
//! let mut flag = Flag::new(1, "Adult").with_criteria("age > 18");
//! assert!(flag.validate().is_none());
//!
//! flag.set_evaluator(&registry, "sql").unwrap();
//! assert!(flag.validate().unwrap().result());
//! assert_eq!(flag.eval(Some(PatientId(1))).unwrap(), Some(Truth::True));
//! assert_eq!(
//!     flag.eval_cohort(Some(&Cohort::from([1, 2]))).unwrap(),
//!     Some(Cohort::from([1]))
//! );
//! ```

pub use octofhir_flags_diagnostics as diagnostics;
pub use octofhir_flags_eval as eval;
pub use octofhir_flags_logic as logic;

pub mod config;
pub mod error;
pub mod flag;
pub mod service;

pub use config::{EngineConfig, FlagDefinition, LogicConfig, QueryConfig};
pub use error::{FlagError, FlagResult};
pub use flag::Flag;
pub use service::{FiredFlag, FlagFailure, FlagSet, FlagValidation, PatientFlags};

// CLI module (only available with cli feature)
#[cfg(feature = "cli")]
pub mod cli;
