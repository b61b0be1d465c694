//! Hierarchical store for the MVPA persistence layer.
//!
//! A store is a tree of [`Group`]s and [`Leaf`]s held in a single file.
//! Groups carry small metadata attributes ([`AttrValue`]) and named
//! children; leaves carry a scalar or numeric array, optionally
//! zstd-compressed and always CRC32-checked.
//!
//! # File lifecycle
//!
//! [`StoreFile::open`] takes an [`OpenMode`]. The whole tree is loaded into
//! memory; writable handles persist it atomically on
//! [`StoreFile::close`]. Within one process a file can be held by many
//! readers or by a single writer; conflicting opens fail with
//! [`StoreError::Locked`].
//!
//! # Container format
//!
//! See [`format`]: magic `MVPH`, a big-endian version and body length, a
//! bincode node table and a BLAKE3 trailer. Reading never recurses over
//! the stored tree, and group nesting is capped at
//! [`format::MAX_NESTING`].

pub mod error;
pub mod file;
pub mod format;
pub mod mode;
pub mod node;
pub mod options;

pub use error::{StoreError, StoreResult};
pub use file::StoreFile;
pub use mode::OpenMode;
pub use node::{validate_name, AttrValue, Group, Leaf, LeafValue, Node};
pub use options::{Compression, LeafOptions};
