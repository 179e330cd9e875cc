//! Flag error codes
//!
//! Error code ranges:
//! - FLG0001-FLG0099: Criteria syntax errors
//! - FLG0100-FLG0199: Criteria semantic errors
//! - FLG0200-FLG0299: Evaluation errors (runtime)
//! - FLG0300-FLG0399: Configuration and registry errors

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Error code identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErrorCode(u16);

impl ErrorCode {
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    pub const fn code(&self) -> u16 {
        self.0
    }

    /// Static description of this code
    pub fn info(&self) -> &'static ErrorInfo {
        ERROR_INFO.get(&self.0).unwrap_or(&UNKNOWN_ERROR)
    }

    pub const fn is_syntax_error(&self) -> bool {
        self.0 >= 1 && self.0 < 100
    }

    pub const fn is_semantic_error(&self) -> bool {
        self.0 >= 100 && self.0 < 200
    }

    pub const fn is_evaluation_error(&self) -> bool {
        self.0 >= 200 && self.0 < 300
    }

    pub const fn is_configuration_error(&self) -> bool {
        self.0 >= 300 && self.0 < 400
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FLG{:04}", self.0)
    }
}

/// Information about an error code
#[derive(Debug, Clone)]
pub struct ErrorInfo {
    pub description: &'static str,
    pub help: Option<&'static str>,
}

impl ErrorInfo {
    const fn new(description: &'static str) -> Self {
        Self {
            description,
            help: None,
        }
    }

    const fn with_help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }
}

static UNKNOWN_ERROR: ErrorInfo = ErrorInfo::new("Unknown error");

static ERROR_INFO: LazyLock<HashMap<u16, ErrorInfo>> = LazyLock::new(|| {
    let mut map = HashMap::new();

    // Criteria syntax (0001-0099)
    map.insert(1, ErrorInfo::new("Unexpected token"));
    map.insert(2, ErrorInfo::new("Unexpected end of criteria"));
    map.insert(3, ErrorInfo::new("Unterminated string literal"));
    map.insert(4, ErrorInfo::new("Invalid number literal"));
    map.insert(5, ErrorInfo::new("Invalid date literal")
        .with_help("Dates are written as @YYYY-MM-DD"));
    map.insert(6, ErrorInfo::new("Empty criteria"));
    map.insert(7, ErrorInfo::new("Criteria nested too deeply")
        .with_help("Flatten parenthesised groups or split the criteria into several flags"));

    // Criteria semantics (0100-0199)
    map.insert(100, ErrorInfo::new("Unknown attribute")
        .with_help("Check the attribute names exposed by the patient data source"));
    map.insert(101, ErrorInfo::new("Unknown function"));
    map.insert(102, ErrorInfo::new("Invalid argument count"));
    map.insert(103, ErrorInfo::new("Criteria is not a boolean expression"));
    map.insert(104, ErrorInfo::new("Invalid query criteria"));
    map.insert(105, ErrorInfo::new("Invalid script criteria"));

    // Evaluation (0200-0299)
    map.insert(200, ErrorInfo::new("Evaluation failed"));
    map.insert(201, ErrorInfo::new("Type mismatch"));
    map.insert(202, ErrorInfo::new("Arithmetic overflow"));
    map.insert(203, ErrorInfo::new("Patient data source failed"));
    map.insert(204, ErrorInfo::new("Query execution failed"));
    map.insert(205, ErrorInfo::new("Script execution failed"));
    map.insert(206, ErrorInfo::new("Criteria did not produce a boolean"));
    map.insert(207, ErrorInfo::new("Invalid regular expression"));

    // Configuration and registry (0300-0399)
    map.insert(300, ErrorInfo::new("Unknown evaluator")
        .with_help("Registered evaluator keys are listed by `flags evaluators`"));
    map.insert(301, ErrorInfo::new("Invalid evaluator for flag"));
    map.insert(302, ErrorInfo::new("Evaluator registry already installed"));
    map.insert(303, ErrorInfo::new("Invalid configuration"));
    map.insert(304, ErrorInfo::new("I/O error"));
    map.insert(305, ErrorInfo::new("Duplicate flag id"));
    map.insert(306, ErrorInfo::new("Unknown flag"));

    map
});

// Criteria syntax
pub const FLG0001: ErrorCode = ErrorCode::new(1);
pub const FLG0002: ErrorCode = ErrorCode::new(2);
pub const FLG0003: ErrorCode = ErrorCode::new(3);
pub const FLG0004: ErrorCode = ErrorCode::new(4);
pub const FLG0005: ErrorCode = ErrorCode::new(5);
pub const FLG0006: ErrorCode = ErrorCode::new(6);
pub const FLG0007: ErrorCode = ErrorCode::new(7);

// Criteria semantics
pub const FLG0100: ErrorCode = ErrorCode::new(100);
pub const FLG0101: ErrorCode = ErrorCode::new(101);
pub const FLG0102: ErrorCode = ErrorCode::new(102);
pub const FLG0103: ErrorCode = ErrorCode::new(103);
pub const FLG0104: ErrorCode = ErrorCode::new(104);
pub const FLG0105: ErrorCode = ErrorCode::new(105);

// Evaluation
pub const FLG0200: ErrorCode = ErrorCode::new(200);
pub const FLG0201: ErrorCode = ErrorCode::new(201);
pub const FLG0202: ErrorCode = ErrorCode::new(202);
pub const FLG0203: ErrorCode = ErrorCode::new(203);
pub const FLG0204: ErrorCode = ErrorCode::new(204);
pub const FLG0205: ErrorCode = ErrorCode::new(205);
pub const FLG0206: ErrorCode = ErrorCode::new(206);
pub const FLG0207: ErrorCode = ErrorCode::new(207);

// Configuration and registry
pub const FLG0300: ErrorCode = ErrorCode::new(300);
pub const FLG0301: ErrorCode = ErrorCode::new(301);
pub const FLG0302: ErrorCode = ErrorCode::new(302);
pub const FLG0303: ErrorCode = ErrorCode::new(303);
pub const FLG0304: ErrorCode = ErrorCode::new(304);
pub const FLG0305: ErrorCode = ErrorCode::new(305);
pub const FLG0306: ErrorCode = ErrorCode::new(306);
