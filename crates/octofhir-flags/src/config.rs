//! Engine configuration loaded from JSON
//!
//! ```json
//! {
//!   "flags": [
//!     { "id": 1, "name": "Adult", "criteria": "age > 18", "evaluator": "sql", "priority": 2 }
//!   ],
//!   "query": { "table": "patient", "idColumn": "patient_id" },
//!   "logic": { "asOf": "2024-01-01" }
//! }
//! ```

use crate::error::{FlagError, FlagResult};
use crate::flag::Flag;
use crate::service::FlagSet;
use chrono::NaiveDate;
use octofhir_flags_eval::{
    EvalexprEngine, EvaluatorRegistry, LogicEvaluator, QueryEvaluator, ScriptEvaluator,
    SqliteQueryExecutor, DEFAULT_ID_COLUMN, DEFAULT_TABLE,
};
use octofhir_flags_logic::{InMemoryDataSource, PatientDataSource};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Top-level engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default)]
    pub flags: Vec<FlagDefinition>,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub logic: LogicConfig,
}

/// Serialized form of a [`Flag`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FlagDefinition {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub criteria: String,
    /// Evaluator key; unset leaves the flag without an evaluator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl FlagDefinition {
    /// Build the flag, resolving its evaluator through `registry`
    pub fn build(&self, registry: &EvaluatorRegistry) -> FlagResult<Flag> {
        let mut flag = Flag::new(self.id, self.name.clone()).with_criteria(self.criteria.clone());
        flag.message = self.message.clone();
        flag.priority = self.priority;
        flag.tags = self.tags.clone();
        flag.enabled = self.enabled;
        if let Some(key) = &self.evaluator {
            flag.set_evaluator(registry, key)?;
        }
        Ok(flag)
    }
}

/// Settings of the `sql` evaluator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct QueryConfig {
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default = "default_id_column")]
    pub id_column: String,
    /// SQLite database file; without one an in-memory table is seeded from patient data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,
}

fn default_table() -> String {
    DEFAULT_TABLE.to_string()
}

fn default_id_column() -> String {
    DEFAULT_ID_COLUMN.to_string()
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            table: default_table(),
            id_column: default_id_column(),
            database: None,
        }
    }
}

/// Settings of the `logic` evaluator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LogicConfig {
    /// Reference date for age functions; today when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub as_of: Option<NaiveDate>,
}

impl EngineConfig {
    pub fn from_json(json: &str) -> FlagResult<Self> {
        serde_json::from_str(json).map_err(|e| FlagError::config(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> FlagResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| FlagError::Io(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&text)
            .map_err(|e| FlagError::config(format!("{}: {}", path.display(), e)))
    }

    /// Registry with all three evaluators over `patients`
    pub fn build_registry(&self, patients: Arc<InMemoryDataSource>) -> FlagResult<EvaluatorRegistry> {
        let executor = match &self.query.database {
            Some(path) => SqliteQueryExecutor::open(path),
            None => {
                let records = patients.fetch(&patients.ids())?;
                SqliteQueryExecutor::seeded(&self.query.table, &self.query.id_column, &records)
            }
        }
        .map_err(|e| FlagError::config(format!("query evaluator: {}", e)))?;

        let as_of = self
            .logic
            .as_of
            .unwrap_or_else(|| chrono::Local::now().date_naive());
        let source: Arc<dyn PatientDataSource> = patients;

        Ok(EvaluatorRegistry::new()
            .with(LogicEvaluator::new(source.clone(), as_of))
            .with(QueryEvaluator::with_table(
                Arc::new(executor),
                self.query.table.clone(),
                self.query.id_column.clone(),
            ))
            .with(ScriptEvaluator::new(Arc::new(EvalexprEngine::new()), source)))
    }

    /// Flags of this configuration bound to `registry`
    pub fn build_flag_set(&self, registry: &EvaluatorRegistry) -> FlagResult<FlagSet> {
        let mut set = FlagSet::new();
        for definition in &self.flags {
            set.add(definition.build(registry)?)?;
        }
        log::debug!("Loaded {} flags", set.len());
        Ok(set)
    }
}
