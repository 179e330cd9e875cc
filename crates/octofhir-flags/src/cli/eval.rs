//! Eval command implementation

use super::engine;
use super::output::{self, OutputFormat};
use anyhow::Result;
use octofhir_flags_logic::PatientId;
use std::path::PathBuf;

/// Configuration for the eval command
pub struct EvalConfig {
    pub config: PathBuf,
    pub data: PathBuf,
    pub patient: i64,
    pub format: Option<String>,
    pub output: Option<PathBuf>,
    pub verbose: bool,
}

/// Run the eval command
pub fn run(config: EvalConfig) -> Result<()> {
    let engine = engine::load(&config.config, Some(&config.data), config.verbose)?;
    let report = engine.flags.generate_for_patient(PatientId(config.patient));

    for failure in &report.failures {
        eprintln!(
            "{}",
            output::format_warning(&format!(
                "flag {} ({}) failed: {} {}",
                failure.id, failure.name, failure.code, failure.error
            ))
        );
    }

    let format = OutputFormat::parse(config.format.as_deref().unwrap_or("pretty"));
    let value = match format {
        OutputFormat::Table => serde_json::to_value(&report.fired)?,
        _ => serde_json::to_value(&report)?,
    };
    output::print_output(&value, format, config.output.as_deref())
}
