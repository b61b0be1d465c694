//! Object graph codec for the MVPA object store.
//!
//! [`encode`] turns a [`Value`](mvpa_types::Value) tree into store nodes
//! and [`decode`] rebuilds it. Scalars and numeric arrays become leaves;
//! everything else becomes a group carrying a reconstruction descriptor in
//! its attributes:
//!
//! - `class` + `module`: generic replay, with optional `state` (attribute
//!   map) and `items` (sequence or mapping elements) child groups
//! - `recon` + `module`: custom replay, with an `rcargs` child group of
//!   positional factory arguments
//!
//! Builtin containers use the module `builtins` with the classes
//! `NoneType`, `list`, `tuple` and `dict`. Object arrays are `list` groups
//! flagged with `is_objarray` and a `shape` attribute.
//!
//! User types are rebuilt only through an explicit [`Registry`]; names in
//! the store that the registry does not know fail with
//! [`CodecError::Unresolved`].
//!
//! [`save`] and [`load`] wrap the codec with the store file lifecycle and
//! always release the file handle, including on error.

pub mod config;
pub mod decode;
pub mod encode;
pub mod error;
pub mod io;
pub mod names;
pub mod registry;
pub mod verify;

pub use config::CodecConfig;
pub use decode::{decode, decode_structure};
pub use encode::encode;
pub use error::{CodecError, CodecResult};
pub use io::{load, load_object, load_with, save, save_object, save_with};
pub use registry::{BuildFn, ClassKind, FactoryFn, Persist, Registry, Replay};
pub use verify::{verify, Issue};
