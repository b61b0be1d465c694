use thiserror::Error;

/// Errors produced by value-model operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("shape {shape:?} holds {expected} elements, got {actual}")]
    ShapeMismatch {
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },

    #[error("shape {0:?} overflows the addressable element count")]
    ShapeOverflow(Vec<usize>),

    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("missing field: {0}")]
    MissingField(String),

    #[error("invalid data: {0}")]
    InvalidData(String),
}

/// Result alias for value-model operations.
pub type TypeResult<T> = Result<T, TypeError>;
