//! Evaluators command implementation

use super::output::{self, OutputFormat};
use anyhow::Result;
use octofhir_flags_eval::EvaluatorKind;
use serde_json::json;
use std::path::PathBuf;

/// Configuration for the evaluators command
pub struct EvaluatorsConfig {
    pub format: Option<String>,
    pub output: Option<PathBuf>,
}

fn describe(kind: EvaluatorKind) -> (&'static str, &'static str) {
    match kind {
        EvaluatorKind::Logic => ("", "Boolean criteria language over patient attributes"),
        EvaluatorKind::Query => ("", "SQL predicate or SELECT of patient ids"),
        EvaluatorKind::Script => ("groovy", "Expression script run once per patient"),
    }
}

/// Run the evaluators command
pub fn run(config: EvaluatorsConfig) -> Result<()> {
    let rows: Vec<_> = EvaluatorKind::ALL
        .iter()
        .map(|&kind| {
            let (alias, description) = describe(kind);
            json!({
                "key": kind.key(),
                "alias": alias,
                "description": description,
            })
        })
        .collect();

    let format = OutputFormat::parse(config.format.as_deref().unwrap_or("table"));
    output::print_output(&json!(rows), format, config.output.as_deref())
}
