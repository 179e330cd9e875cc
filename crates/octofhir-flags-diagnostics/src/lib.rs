//! Diagnostics for patient flag criteria
//!
//! Error codes, source locations and diagnostic messages shared by the criteria
//! parser, the evaluators and the flag orchestration layer.

mod error;
mod error_code;
mod span;

pub use error::*;
pub use error_code::*;
pub use span::*;
