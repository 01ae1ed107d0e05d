use thiserror::Error;

/// Custom error type for the NeuraGraph engine.
///
/// Every variant is raised synchronously at the point of violation and is
/// propagated unchanged to the caller of the triggering operation
/// (node construction, `Network::add`, `forward`/`backward`, `Solver::train`).
#[derive(Error, Debug, PartialEq, Clone)] // PartialEq for easier testing
pub enum NeuraGraphError {
    /// Absent or malformed argument, malformed upstream data.
    #[error("Input error: {0}")]
    Input(String),

    /// A block shape is incompatible with the arity/shape rules of an operation.
    #[error("Dimension mismatch during {operation}: expected {expected:?}, got {actual:?}")]
    Dimension {
        operation: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// A name already maps to a different object.
    #[error("Duplicity: a different {kind} named '{name}' is already present")]
    Duplicity { kind: String, name: String },

    /// No topological order exists.
    #[error("Topological order could not be created: cycle detected at vertex '{vertex}'")]
    Topological { vertex: String },

    /// An unrecognised configuration string.
    #[error("Unknown {kind} option '{option}'")]
    UnknownOption { kind: String, option: String },
}

impl NeuraGraphError {
    /// Shorthand for building a [`NeuraGraphError::Dimension`] from two shapes.
    pub fn dimension(operation: &str, expected: &[usize], actual: &[usize]) -> Self {
        NeuraGraphError::Dimension {
            operation: operation.to_string(),
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }

    pub(crate) fn unknown_option(kind: &str, option: &str) -> Self {
        NeuraGraphError::UnknownOption {
            kind: kind.to_string(),
            option: option.to_string(),
        }
    }
}
