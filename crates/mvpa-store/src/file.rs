use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex, PoisonError};

use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::format::{read_container, write_container};
use crate::mode::OpenMode;
use crate::node::{Group, Leaf, LeafValue, Node};
use crate::options::LeafOptions;

#[derive(Default)]
struct HandleState {
    readers: usize,
    writer: bool,
}

/// Process-wide table of open store files: many readers or one writer.
static HANDLES: LazyLock<Mutex<HashMap<PathBuf, HandleState>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

struct HandleGuard {
    key: PathBuf,
    writer: bool,
}

impl HandleGuard {
    fn acquire(key: PathBuf, writer: bool) -> StoreResult<Self> {
        let mut table = HANDLES.lock().unwrap_or_else(PoisonError::into_inner);
        let state = table.entry(key.clone()).or_default();
        if state.writer || (writer && state.readers > 0) {
            return Err(StoreError::Locked(key));
        }
        if writer {
            state.writer = true;
        } else {
            state.readers += 1;
        }
        Ok(Self { key, writer })
    }
}

impl Drop for HandleGuard {
    fn drop(&mut self) {
        let mut table = HANDLES.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(state) = table.get_mut(&self.key) {
            if self.writer {
                state.writer = false;
            } else {
                state.readers = state.readers.saturating_sub(1);
            }
            if !state.writer && state.readers == 0 {
                table.remove(&self.key);
            }
        }
    }
}

/// Canonical table key for `path`, which may not exist yet.
fn handle_key(path: &Path) -> StoreResult<PathBuf> {
    if let Ok(canonical) = path.canonicalize() {
        return Ok(canonical);
    }
    let file_name = path
        .file_name()
        .ok_or_else(|| StoreError::NotFound(path.to_path_buf()))?;
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let parent = parent
        .canonicalize()
        .map_err(|_| StoreError::NotFound(path.to_path_buf()))?;
    Ok(parent.join(file_name))
}

/// An open store file.
///
/// The whole tree is held in memory. Writable handles persist it
/// atomically on [`flush`](Self::flush) and [`close`](Self::close);
/// dropping a handle without closing releases it and discards unflushed
/// changes.
pub struct StoreFile {
    path: PathBuf,
    mode: OpenMode,
    root: Node,
    dirty: bool,
    _guard: HandleGuard,
}

impl std::fmt::Debug for StoreFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreFile")
            .field("path", &self.path)
            .field("mode", &self.mode)
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl StoreFile {
    /// Open `path` in `mode`.
    ///
    /// Creating modes write an empty store immediately, so the file exists
    /// once this returns.
    pub fn open(path: impl AsRef<Path>, mode: OpenMode) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let key = handle_key(&path)?;
        let guard = HandleGuard::acquire(key, mode.is_writable())?;
        let exists = path.exists();

        let (root, fresh) = match mode {
            OpenMode::Read | OpenMode::ReadWrite => {
                if !exists {
                    return Err(StoreError::NotFound(path));
                }
                (read_container(&std::fs::read(&path)?)?, false)
            }
            OpenMode::Exclusive if exists => return Err(StoreError::AlreadyExists(path)),
            OpenMode::Append if exists => (read_container(&std::fs::read(&path)?)?, false),
            OpenMode::Truncate | OpenMode::Exclusive | OpenMode::Append => {
                (Node::Group(Group::root()), true)
            }
        };

        let file = Self {
            path,
            mode,
            root,
            dirty: false,
            _guard: guard,
        };
        if fresh {
            // Another process may have created the file since the check
            // above; exclusive creation must not replace it.
            file.write_out(mode == OpenMode::Exclusive)?;
        }
        debug!(path = %file.path.display(), mode = %mode, "opened store");
        Ok(file)
    }

    /// Open a path with a mode string (`r`, `r+`, `w`, `w-`, `x`, `a`).
    pub fn open_str(path: impl AsRef<Path>, mode: &str) -> StoreResult<Self> {
        Self::open(path, mode.parse()?)
    }

    /// Returns `true` while any handle on `path` is open in this process.
    pub fn is_open(path: impl AsRef<Path>) -> bool {
        let Ok(key) = handle_key(path.as_ref()) else {
            return false;
        };
        HANDLES
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&key)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// The root node.
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// The root as a group.
    pub fn root_group(&self) -> StoreResult<&Group> {
        self.root
            .as_group()
            .ok_or_else(|| StoreError::NotAGroup("/".into()))
    }

    /// Mutable access to the root group. Requires a writable handle.
    pub fn root_group_mut(&mut self) -> StoreResult<&mut Group> {
        self.ensure_writable()?;
        self.dirty = true;
        self.root
            .as_group_mut()
            .ok_or_else(|| StoreError::NotAGroup("/".into()))
    }

    /// Replace an empty root group with a single leaf.
    pub fn set_root_leaf(&mut self, value: &LeafValue, options: &LeafOptions) -> StoreResult<&Leaf> {
        self.ensure_writable()?;
        match &self.root {
            Node::Group(g) if g.is_empty() => {}
            _ => return Err(StoreError::RootNotEmpty),
        }
        self.root = Node::Leaf(Leaf::encode("/".into(), value, options)?);
        self.dirty = true;
        self.root
            .as_leaf()
            .ok_or_else(|| StoreError::NotALeaf("/".into()))
    }

    /// Look up a node by absolute or relative path; `""` and `"/"` give the
    /// root.
    pub fn get(&self, path: &str) -> Option<&Node> {
        if path.trim_matches('/').is_empty() {
            return Some(&self.root);
        }
        self.root.as_group()?.resolve(path)
    }

    /// Persist pending changes without closing.
    pub fn flush(&mut self) -> StoreResult<()> {
        self.ensure_writable()?;
        if self.dirty {
            self.write_out(false)?;
            self.dirty = false;
        }
        Ok(())
    }

    /// Persist pending changes and release the handle.
    pub fn close(mut self) -> StoreResult<()> {
        if self.mode.is_writable() {
            self.flush()?;
        }
        debug!(path = %self.path.display(), "closed store");
        Ok(())
    }

    fn ensure_writable(&self) -> StoreResult<()> {
        if self.mode.is_writable() {
            Ok(())
        } else {
            Err(StoreError::ReadOnly(self.path.clone()))
        }
    }

    fn write_out(&self, exclusive: bool) -> StoreResult<()> {
        publish(&self.path, &write_container(&self.root)?, exclusive)
    }
}

/// Atomically place `bytes` at `path` through a synced temporary file in
/// the same directory. With `exclusive`, an existing file is left alone
/// and reported as [`StoreError::AlreadyExists`].
fn publish(path: &Path, bytes: &[u8], exclusive: bool) -> StoreResult<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    let persisted = if exclusive {
        tmp.persist_noclobber(path)
    } else {
        tmp.persist(path)
    };
    match persisted {
        Ok(_) => Ok(()),
        Err(e) if exclusive && e.error.kind() == std::io::ErrorKind::AlreadyExists => {
            Err(StoreError::AlreadyExists(path.to_path_buf()))
        }
        Err(e) => Err(StoreError::Io(e.error)),
    }
}

impl Drop for StoreFile {
    fn drop(&mut self) {
        if self.dirty {
            warn!(path = %self.path.display(), "store handle dropped with unflushed changes");
        }
    }
}
