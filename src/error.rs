use std::fmt;

/// The result type used across the pipeline library.
pub type Result<T> = std::result::Result<T, StageError>;

/// All errors a stage can surface to the driver.
#[derive(Debug)]
pub enum StageError {
    /// An input is invalid for semantic or domain reasons.
    InvalidInput(&'static str),

    /// A shape invariant was violated (e.g. mismatched lengths).
    ShapeMismatch {
        /// Human-readable context for the mismatch (e.g. "params", "windows").
        what: &'static str,
        /// Observed value.
        got: usize,
        /// Expected value.
        expected: usize,
    },

    /// An underlying I/O error while loading or saving model weights.
    Io(std::io::Error),

    /// A persisted weights file could not be encoded or decoded.
    Persist(serde_json::Error),
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageError::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            StageError::ShapeMismatch { what, got, expected } => {
                write!(f, "shape mismatch for {what}: got {got}, expected {expected}")
            }
            StageError::Io(e) => write!(f, "io error: {e}"),
            StageError::Persist(e) => write!(f, "weights file error: {e}"),
        }
    }
}

impl std::error::Error for StageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StageError::Io(e) => Some(e),
            StageError::Persist(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StageError {
    fn from(e: std::io::Error) -> Self {
        StageError::Io(e)
    }
}

impl From<serde_json::Error> for StageError {
    fn from(e: serde_json::Error) -> Self {
        StageError::Persist(e)
    }
}
