//! Definition registry
//!
//! An explicit, owned collection of definitions. Create one, register into
//! it, hand it to the engine, drop it when done; there is no global state.

use crate::definition::BenchmarkDefinition;
use crate::error::{DefinitionError, InvalidDefinition};
use fxhash::FxHashMap;
use std::sync::Arc;

/// Ordered set of uniquely named definitions
#[derive(Debug, Default)]
pub struct Registry {
    definitions: Vec<Arc<BenchmarkDefinition>>,
    index: FxHashMap<String, usize>,
}

impl Registry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a definition; names must be unique within the registry
    pub fn register(
        &mut self,
        definition: BenchmarkDefinition,
    ) -> Result<Arc<BenchmarkDefinition>, InvalidDefinition> {
        if self.index.contains_key(definition.name()) {
            return Err(InvalidDefinition::new(
                definition.name(),
                DefinitionError::DuplicateDefinition,
            ));
        }

        let definition = Arc::new(definition);
        self.index
            .insert(definition.name().to_string(), self.definitions.len());
        self.definitions.push(Arc::clone(&definition));
        tracing::debug!(benchmark = definition.name(), "registered benchmark");
        Ok(definition)
    }

    /// Registered definitions, in registration order
    pub fn definitions(&self) -> &[Arc<BenchmarkDefinition>] {
        &self.definitions
    }

    /// Definition named `name`
    pub fn get(&self, name: &str) -> Option<&Arc<BenchmarkDefinition>> {
        self.index.get(name).map(|&i| &self.definitions[i])
    }

    /// Number of registered definitions
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
