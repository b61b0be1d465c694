use std::path::PathBuf;

use mvpa_store::StoreError;
use mvpa_types::{TypeError, TypeName};

/// Errors from encoding, decoding and the save/load entry points.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The stored tree violates the codec's layout rules.
    #[error("malformed store node {path}: {reason}")]
    Malformed { path: String, reason: String },

    /// The value or node uses a feature the codec rejects.
    #[error("unsupported at {path}: {feature}")]
    Unsupported { path: String, feature: String },

    /// A class or factory named in the store is not registered.
    #[error("{path}: unresolved {kind} {name}")]
    Unresolved {
        path: String,
        kind: &'static str,
        name: TypeName,
    },

    /// A named object requested from a store file is absent.
    #[error("no object named {name:?} in {}", .location.display())]
    NotFound { name: String, location: PathBuf },

    /// Nesting exceeded the configured depth limit.
    #[error("{path}: nesting exceeds depth limit of {limit}")]
    DepthExceeded { path: String, limit: usize },

    /// A registered constructor or factory rejected its input.
    #[error("{path}: reconstruction failed: {source}")]
    Reconstruct {
        path: String,
        #[source]
        source: TypeError,
    },

    #[error("registration rejected: {0}")]
    Registration(String),

    #[error("invalid codec config: {0}")]
    Config(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CodecError {
    pub(crate) fn malformed(path: &str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unsupported(path: &str, feature: impl Into<String>) -> Self {
        Self::Unsupported {
            path: path.to_string(),
            feature: feature.into(),
        }
    }

    /// Structural damage in the stored tree.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }

    /// A requested name was absent; the store itself is fine.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }
}

/// Result alias for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;
