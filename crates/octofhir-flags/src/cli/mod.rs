//! CLI functionality for the flags tool
//!
//! This module contains all CLI-related functionality including:
//! - Engine loading
//! - Flag validation
//! - Patient and cohort evaluation
//! - Output formatting

#[cfg(feature = "cli")]
pub mod cohort;
#[cfg(feature = "cli")]
pub mod engine;
#[cfg(feature = "cli")]
pub mod eval;
#[cfg(feature = "cli")]
pub mod evaluators;
#[cfg(feature = "cli")]
pub mod output;
#[cfg(feature = "cli")]
pub mod validate;
