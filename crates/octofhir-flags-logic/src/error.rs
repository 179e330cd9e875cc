//! Errors raised while interpreting criteria or loading patient data

use octofhir_flags_diagnostics::{ErrorCode, FLG0101, FLG0102, FLG0201, FLG0202, FLG0203, FLG0207};
use thiserror::Error;

/// Result type for interpretation
pub type LogicResult<T> = Result<T, LogicError>;

/// Runtime failures of a criteria expression
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LogicError {
    #[error("Type mismatch for {operator}: expected {expected}, found {found}")]
    TypeMismatch {
        operator: String,
        expected: String,
        found: String,
    },

    #[error("Arithmetic overflow in {operation}")]
    Overflow { operation: String },

    #[error("Invalid regex pattern: {pattern}")]
    InvalidRegex { pattern: String },

    /// Only reachable when criteria skipped the semantic check
    #[error("Unknown function: {name}")]
    UnknownFunction { name: String },

    #[error("{name} expects {expected}, got {found}")]
    ArgumentCount {
        name: String,
        expected: String,
        found: usize,
    },
}

impl LogicError {
    pub fn type_mismatch(
        operator: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            operator: operator.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn overflow(operation: impl Into<String>) -> Self {
        Self::Overflow {
            operation: operation.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::TypeMismatch { .. } => FLG0201,
            Self::Overflow { .. } => FLG0202,
            Self::InvalidRegex { .. } => FLG0207,
            Self::UnknownFunction { .. } => FLG0101,
            Self::ArgumentCount { .. } => FLG0102,
        }
    }
}

/// Failures of a [`PatientDataSource`](crate::PatientDataSource)
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DataSourceError {
    #[error("Patient data unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid patient data: {0}")]
    InvalidData(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl DataSourceError {
    pub fn code(&self) -> ErrorCode {
        FLG0203
    }
}
