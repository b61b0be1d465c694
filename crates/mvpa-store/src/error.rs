use std::path::PathBuf;

use mvpa_types::TypeError;

/// Errors from hierarchical store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error from the underlying file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The store file does not exist.
    #[error("store not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Exclusive creation was requested but the file exists.
    #[error("store already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    /// A child with this name already exists in the group.
    #[error("{group}: child '{name}' already exists")]
    NameExists { group: String, name: String },

    /// The child or attribute name cannot be used.
    #[error("invalid name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    /// The open-mode string is not recognised.
    #[error("invalid open mode {0:?} (expected one of r, r+, w, w-, x, a)")]
    InvalidMode(String),

    /// A write was attempted through a read-only handle.
    #[error("store is read-only: {}", .0.display())]
    ReadOnly(PathBuf),

    /// Another handle holds the file in a conflicting mode.
    #[error("store is locked by another handle: {}", .0.display())]
    Locked(PathBuf),

    /// The root can only be replaced while it is still empty.
    #[error("store root is not empty")]
    RootNotEmpty,

    #[error("invalid store magic: expected {expected}, got {actual}")]
    InvalidMagic { expected: String, actual: String },

    #[error("unsupported store version: {0}")]
    UnsupportedVersion(u32),

    /// The container trailer does not match its contents.
    #[error("store checksum mismatch")]
    ChecksumMismatch,

    /// A leaf payload failed its CRC32 check.
    #[error("CRC32 mismatch for leaf {path}")]
    CrcMismatch { path: String },

    /// The container is structurally damaged.
    #[error("corrupt store: {0}")]
    Corrupt(String),

    /// The tree nests groups deeper than the container allows.
    #[error("store tree nests deeper than {limit} groups")]
    TooDeep { limit: usize },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("compression error: {0}")]
    Compression(String),

    /// A leaf was required but a group was found.
    #[error("not a leaf: {0}")]
    NotALeaf(String),

    /// A group was required but a leaf was found.
    #[error("not a group: {0}")]
    NotAGroup(String),

    /// A leaf payload could not be turned back into a value.
    #[error("leaf {path}: {source}")]
    Type {
        path: String,
        #[source]
        source: TypeError,
    },
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
