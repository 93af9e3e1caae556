//! Definition errors
//!
//! Malformed definitions are rejected before any case is built; everything that
//! goes wrong while a case runs is scoped to that case and reported on its
//! result instead.

use thiserror::Error;

/// Reason a benchmark definition is malformed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    /// The definition has an empty name
    #[error("benchmark name must not be empty")]
    EmptyName,

    /// A declared parameter has no values to expand
    #[error("parameter `{parameter}` declares no values")]
    EmptyParameter {
        /// Offending parameter name
        parameter: String,
    },

    /// Two parameters share a name
    #[error("parameter `{parameter}` is declared more than once")]
    DuplicateParameter {
        /// Offending parameter name
        parameter: String,
    },

    /// The parameter grid has more combinations than can be addressed
    #[error("parameter grid has too many combinations")]
    TooManyCombinations,

    /// Nothing to measure
    #[error("no measured operations declared")]
    NoOperations,

    /// Two operations share a name
    #[error("operation `{operation}` is declared more than once")]
    DuplicateOperation {
        /// Offending operation name
        operation: String,
    },

    /// An explicit job list was given but it is empty
    #[error("an explicit job list must not be empty")]
    EmptyJobs,

    /// A definition with this name is already registered
    #[error("a benchmark with this name is already registered")]
    DuplicateDefinition,
}

/// A definition rejected at build or registration time
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid benchmark definition `{definition}`: {source}")]
pub struct InvalidDefinition {
    /// Name of the rejected definition
    pub definition: String,
    /// What is wrong with it
    #[source]
    pub source: DefinitionError,
}

impl InvalidDefinition {
    pub(crate) fn new(definition: impl Into<String>, source: DefinitionError) -> Self {
        Self {
            definition: definition.into(),
            source,
        }
    }
}
