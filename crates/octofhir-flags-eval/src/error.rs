//! Evaluation and registry errors

use octofhir_flags_diagnostics::{
    ErrorCode, FLG0200, FLG0204, FLG0205, FLG0206, FLG0300, FLG0302,
};
use octofhir_flags_logic::{DataSourceError, LogicError};
use thiserror::Error;

/// Result type for evaluator operations
pub type EvalResult<T> = Result<T, EvalError>;

/// Execution-time failure of an evaluator
///
/// Recoverable: a failing flag never takes down evaluation of other flags.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    /// Criteria that does not compile reached execution
    #[error("Invalid criteria: {message}")]
    InvalidCriteria { message: String },

    #[error(transparent)]
    Logic(#[from] LogicError),

    #[error(transparent)]
    DataSource(#[from] DataSourceError),

    #[error("Query failed: {message}")]
    Query { message: String },

    #[error("Script failed: {message}")]
    Script { message: String },

    /// Backend produced something other than a truth value
    #[error("Criteria produced {found} for patient {patient}, expected a boolean")]
    NonBoolean { patient: i64, found: String },
}

impl EvalError {
    pub fn invalid_criteria(message: impl Into<String>) -> Self {
        Self::InvalidCriteria {
            message: message.into(),
        }
    }

    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }

    pub fn script(message: impl Into<String>) -> Self {
        Self::Script {
            message: message.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidCriteria { .. } => FLG0200,
            Self::Logic(e) => e.code(),
            Self::DataSource(e) => e.code(),
            Self::Query { .. } => FLG0204,
            Self::Script { .. } => FLG0205,
            Self::NonBoolean { .. } => FLG0206,
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for EvalError {
    fn from(err: rusqlite::Error) -> Self {
        Self::query(err.to_string())
    }
}

/// Registry configuration failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Unknown evaluator '{key}'")]
    UnknownEvaluator { key: String },

    #[error("Evaluator registry is already installed")]
    AlreadyInstalled,
}

impl RegistryError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UnknownEvaluator { .. } => FLG0300,
            Self::AlreadyInstalled => FLG0302,
        }
    }
}
