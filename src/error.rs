//! Error types for semdoc.

use thiserror::Error;

/// Result type alias for semdoc operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while building or transforming a document tree.
#[derive(Error, Debug)]
pub enum Error {
    /// A property was asserted with a confidence outside `[0, 1]`.
    #[error("Invalid confidence: {0} (must be within [0, 1])")]
    InvalidConfidence(f64),

    /// No assertion exists for the requested property key.
    #[error("Property not found: {0}")]
    PropertyNotFound(String),

    /// Attaching the child would make a node its own ancestor.
    #[error("Attaching element {child} under {parent} would create a cycle")]
    CycleDetected {
        /// Index of the intended parent
        parent: usize,
        /// Index of the intended child
        child: usize,
    },

    /// A category name did not match any element type.
    #[error("Unknown element category: {0}")]
    InvalidCategory(String),

    /// Error (de)serializing the interchange form.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A pass configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// An analyzer stage failed.
    #[error("Analyzer '{stage}' failed: {message}")]
    Analyzer {
        /// Name of the failing stage
        stage: String,
        /// Failure description
        message: String,
    },
}

impl Error {
    /// Create an analyzer failure for the given stage.
    pub fn analyzer(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Analyzer {
            stage: stage.into(),
            message: message.into(),
        }
    }
}
