//! Cohort command implementation

use super::engine;
use super::output::{self, OutputFormat};
use anyhow::{bail, Context, Result};
use octofhir_flags_eval::Cohort;
use octofhir_flags_logic::PatientId;
use serde_json::json;
use std::path::PathBuf;

/// Configuration for the cohort command
pub struct CohortConfig {
    pub config: PathBuf,
    pub data: PathBuf,
    pub flag: i64,
    /// Comma-separated patient ids; every loaded patient when absent
    pub patients: Option<String>,
    pub format: Option<String>,
    pub output: Option<PathBuf>,
    pub verbose: bool,
}

/// Parse a comma-separated id list
pub fn parse_patients(list: &str) -> Result<Cohort> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<PatientId>()
                .with_context(|| format!("Invalid patient id '{}'", s))
        })
        .collect()
}

/// Run the cohort command
pub fn run(config: CohortConfig) -> Result<()> {
    let engine = engine::load(&config.config, Some(&config.data), config.verbose)?;

    let cohort = match config.patients.as_deref() {
        Some(list) => parse_patients(list)?,
        None => engine.patients.ids().into_iter().collect(),
    };
    if config.verbose {
        eprintln!("Evaluating flag {} over {} patient(s)", config.flag, cohort.len());
    }

    let Some(flagged) = engine.flags.flagged_patients(config.flag, &cohort)? else {
        bail!("Flag {} has no evaluator assigned", config.flag);
    };

    let format = OutputFormat::parse(config.format.as_deref().unwrap_or("pretty"));
    let value = match format {
        OutputFormat::Table => json!(flagged.iter().map(|id| json!({"patient": id})).collect::<Vec<_>>()),
        _ => json!({
            "flag": config.flag,
            "evaluated": cohort.len(),
            "patients": flagged,
        }),
    };
    output::print_output(&value, format, config.output.as_deref())
}
