//! Loading the engine from configuration and patient data files

use crate::{EngineConfig, FlagSet};
use anyhow::{Context, Result};
use octofhir_flags_logic::InMemoryDataSource;
use std::path::Path;
use std::sync::Arc;

/// Everything a command needs to evaluate flags
pub struct Engine {
    pub patients: Arc<InMemoryDataSource>,
    pub flags: FlagSet,
}

/// Load configuration and optional patient data, then build registry and flags
pub fn load(config_path: &Path, data_path: Option<&Path>, verbose: bool) -> Result<Engine> {
    let config = EngineConfig::from_file(config_path)
        .with_context(|| format!("Failed to load configuration: {}", config_path.display()))?;

    let patients = match data_path {
        Some(path) => InMemoryDataSource::from_file(path)
            .with_context(|| format!("Failed to load patient data: {}", path.display()))?,
        None => InMemoryDataSource::new(),
    };
    if verbose {
        eprintln!(
            "Loaded {} flag(s) and {} patient(s)",
            config.flags.len(),
            patients.len()
        );
    }

    let patients = Arc::new(patients);
    let registry = config
        .build_registry(patients.clone())
        .context("Failed to build evaluator registry")?;
    let flags = config
        .build_flag_set(&registry)
        .context("Failed to build flags")?;

    Ok(Engine { patients, flags })
}
