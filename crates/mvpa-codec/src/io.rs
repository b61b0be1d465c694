use std::path::Path;

use mvpa_store::{validate_name, Node, OpenMode, StoreFile};
use mvpa_types::Value;
use tracing::debug;

use crate::config::CodecConfig;
use crate::decode::decode;
use crate::encode::{encode, leaf_value};
use crate::error::{CodecError, CodecResult};
use crate::registry::{Persist, Registry};

/// Open `path` in `mode`, encode `value` (under `name` if given) and close.
///
/// On any error the handle is released without writing, so a failed save
/// leaves the file as it was when opened.
pub fn save(
    path: impl AsRef<Path>,
    value: &Value,
    name: Option<&str>,
    mode: OpenMode,
    config: &CodecConfig,
) -> CodecResult<()> {
    let path = path.as_ref();
    debug!(path = %path.display(), name, %mode, "save");
    let mut file = StoreFile::open(path, mode)?;
    save_with(&mut file, value, name, config)?;
    file.close()?;
    Ok(())
}

/// Encode into an already open store. The caller closes it.
///
/// A scalar or array saved without a name becomes the whole file. A name
/// is a single child of the root: it must be non-empty and free of `/`.
pub fn save_with(
    file: &mut StoreFile,
    value: &Value,
    name: Option<&str>,
    config: &CodecConfig,
) -> CodecResult<()> {
    if name.is_none() {
        if let Some(leaf) = leaf_value(value) {
            file.set_root_leaf(&leaf, &config.leaf)?;
            return Ok(());
        }
    }
    encode(file.root_group_mut()?, value, name, config)
}

/// Open `path` read-only, decode the root or the object at `name`, and
/// release the handle.
pub fn load(
    path: impl AsRef<Path>,
    name: Option<&str>,
    registry: &Registry,
    config: &CodecConfig,
) -> CodecResult<Value> {
    let path = path.as_ref();
    debug!(path = %path.display(), name, "load");
    let file = StoreFile::open(path, OpenMode::Read)?;
    let value = load_with(&file, name, registry, config)?;
    file.close()?;
    Ok(value)
}

/// Decode from an already open store.
///
/// `name` follows the rules of [`save_with`]; a name no save could have
/// written (empty, or containing `/`) is reported as not found.
pub fn load_with(
    file: &StoreFile,
    name: Option<&str>,
    registry: &Registry,
    config: &CodecConfig,
) -> CodecResult<Value> {
    let node = match name {
        None => file.root(),
        Some(name) => named_object(file, name).ok_or_else(|| CodecError::NotFound {
            name: name.to_string(),
            location: file.path().to_path_buf(),
        })?,
    };
    decode(node, registry, config)
}

fn named_object<'a>(file: &'a StoreFile, name: &str) -> Option<&'a Node> {
    validate_name(name).ok()?;
    file.root().as_group()?.child(name)
}

/// Save a [`Persist`] type through its disassembly.
pub fn save_object<T: Persist>(
    path: impl AsRef<Path>,
    object: &T,
    name: Option<&str>,
    mode: OpenMode,
    config: &CodecConfig,
) -> CodecResult<()> {
    save(path, &object.to_value(), name, mode, config)
}

/// Load and rebuild a [`Persist`] type. `T` must be registered in
/// `registry` for the decode step to resolve it.
pub fn load_object<T: Persist>(
    path: impl AsRef<Path>,
    name: Option<&str>,
    registry: &Registry,
    config: &CodecConfig,
) -> CodecResult<T> {
    let value = load(path, name, registry, config)?;
    T::from_value(value).map_err(|source| CodecError::Reconstruct {
        path: name.unwrap_or("/").to_string(),
        source,
    })
}
