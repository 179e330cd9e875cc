//! Validate command implementation

use super::engine;
use super::output::{self, OutputFormat};
use anyhow::Result;
use colored::Colorize;
use std::path::PathBuf;

/// Configuration for the validate command
pub struct ValidateConfig {
    pub config: PathBuf,
    /// Patient data used to seed the query table; without it SQL criteria may
    /// only reference the id column
    pub data: Option<PathBuf>,
    pub format: Option<String>,
    pub output: Option<PathBuf>,
    pub verbose: bool,
}

/// Run the validate command
pub fn run(config: ValidateConfig) -> Result<()> {
    let engine = engine::load(&config.config, config.data.as_deref(), config.verbose)?;
    let results = engine.flags.validate_all();

    if let Some(format) = config.format.as_deref() {
        let value = serde_json::to_value(&results)?;
        output::print_output(&value, OutputFormat::parse(format), config.output.as_deref())?;
    } else {
        for result in &results {
            let label = format!("[{}] {}", result.id, result.name);
            match &result.validation {
                None => println!("{}", output::format_warning(&format!("{}: no evaluator assigned", label))),
                Some(v) if v.result() => {
                    let key = result.evaluator.as_deref().unwrap_or_default();
                    println!("  {} {} ({})", "✓".green(), label, key);
                }
                Some(v) => {
                    println!("  {} {}", "✗".red(), label);
                    if let Some(message) = v.message() {
                        println!("      {}", message.dimmed());
                    }
                }
            }
        }
    }

    let invalid = results
        .iter()
        .filter(|r| r.validation.is_some() && !r.is_valid())
        .count();
    let unassigned = results.iter().filter(|r| r.validation.is_none()).count();

    if config.verbose || config.format.is_none() {
        eprintln!();
        eprintln!(
            "Summary: {} flag(s), {} valid, {} invalid, {} without evaluator",
            results.len(),
            results.len() - invalid - unassigned,
            invalid,
            unassigned
        );
    }

    if invalid > 0 {
        std::process::exit(1);
    }
    if config.format.is_none() {
        println!("{}", output::format_success("All flags are valid"));
    }
    Ok(())
}
