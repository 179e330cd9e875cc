//! Errors raised by flags, flag sets and engine configuration

use octofhir_flags_diagnostics::{ErrorCode, FLG0301, FLG0303, FLG0304, FLG0305, FLG0306};
use octofhir_flags_eval::{EvalError, RegistryError};
use octofhir_flags_logic::DataSourceError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FlagError {
    /// `set_evaluator` with a key the registry cannot resolve
    #[error("Invalid evaluator '{key}': {source}")]
    InvalidEvaluator {
        key: String,
        #[source]
        source: RegistryError,
    },

    #[error("Flag '{flag}' failed: {source}")]
    Evaluation {
        flag: String,
        #[source]
        source: EvalError,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    DataSource(#[from] DataSourceError),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Duplicate flag id {0}")]
    DuplicateFlag(i64),

    #[error("Unknown flag id {0}")]
    UnknownFlag(i64),
}

impl FlagError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidEvaluator { .. } => FLG0301,
            Self::Evaluation { source, .. } => source.code(),
            Self::Config(_) => FLG0303,
            Self::DataSource(e) => e.code(),
            Self::Io(_) => FLG0304,
            Self::DuplicateFlag(_) => FLG0305,
            Self::UnknownFlag(_) => FLG0306,
        }
    }
}

impl From<std::io::Error> for FlagError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

pub type FlagResult<T> = Result<T, FlagError>;
