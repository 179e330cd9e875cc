//! Evaluator registry
//!
//! Maps evaluator keys to shared evaluator instances. Populated once at startup and
//! read-only afterwards, so lookups need no locking.

use crate::error::RegistryError;
use crate::evaluator::{Evaluator, EvaluatorKind, FlagEvaluator};
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::sync::Arc;

static GLOBAL: OnceCell<EvaluatorRegistry> = OnceCell::new();

/// Mapping from [`EvaluatorKind`] to its evaluator
#[derive(Debug, Default)]
pub struct EvaluatorRegistry {
    evaluators: HashMap<EvaluatorKind, Arc<FlagEvaluator>>,
}

impl EvaluatorRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an evaluator under its kind, returning the one it replaces
    pub fn register(&mut self, evaluator: impl Into<FlagEvaluator>) -> Option<Arc<FlagEvaluator>> {
        let evaluator = evaluator.into();
        let kind = evaluator.kind();
        log::debug!("Registering {} evaluator", kind);
        self.evaluators.insert(kind, Arc::new(evaluator))
    }

    /// Builder-style [`register`](Self::register)
    pub fn with(mut self, evaluator: impl Into<FlagEvaluator>) -> Self {
        self.register(evaluator);
        self
    }

    /// Resolve a key such as `"logic"`, `"sql"` or `"groovy"`
    pub fn lookup(&self, key: &str) -> Result<Arc<FlagEvaluator>, RegistryError> {
        let kind: EvaluatorKind = key.parse()?;
        self.get(kind).ok_or_else(|| RegistryError::UnknownEvaluator {
            key: key.to_string(),
        })
    }

    pub fn get(&self, kind: EvaluatorKind) -> Option<Arc<FlagEvaluator>> {
        self.evaluators.get(&kind).cloned()
    }

    pub fn contains(&self, kind: EvaluatorKind) -> bool {
        self.evaluators.contains_key(&kind)
    }

    /// Registered kinds in canonical order
    pub fn kinds(&self) -> Vec<EvaluatorKind> {
        let mut kinds: Vec<_> = self.evaluators.keys().copied().collect();
        kinds.sort();
        kinds
    }

    pub fn len(&self) -> usize {
        self.evaluators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.evaluators.is_empty()
    }

    /// Install as the process-wide registry; only the first install succeeds
    pub fn install(self) -> Result<&'static EvaluatorRegistry, RegistryError> {
        let kinds = self.kinds();
        GLOBAL.set(self).map_err(|_| RegistryError::AlreadyInstalled)?;
        log::info!(
            "Installed evaluator registry: {}",
            kinds.iter().map(|k| k.key()).collect::<Vec<_>>().join(", ")
        );
        GLOBAL.get().ok_or(RegistryError::AlreadyInstalled)
    }

    /// The installed process-wide registry
    pub fn global() -> Option<&'static EvaluatorRegistry> {
        GLOBAL.get()
    }
}
