use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use mvpa_types::{shape_len, DType, NdArray, Scalar, Value};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::options::{Compression, LeafOptions};

/// Small metadata value attached to a group.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Str(String),
    IntList(Vec<i64>),
}

impl AttrValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int_list(&self) -> Option<&[i64]> {
        match self {
            Self::IntList(v) => Some(v),
            _ => None,
        }
    }
}

impl std::fmt::Display for AttrValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::IntList(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<Vec<i64>> for AttrValue {
    fn from(value: Vec<i64>) -> Self {
        Self::IntList(value)
    }
}

/// Content of a leaf: a scalar (zero-dimensional) or an n-dimensional
/// numeric array.
#[derive(Clone, Debug, PartialEq)]
pub enum LeafValue {
    Scalar(Scalar),
    Array(NdArray),
}

impl From<Scalar> for LeafValue {
    fn from(value: Scalar) -> Self {
        Self::Scalar(value)
    }
}

impl From<NdArray> for LeafValue {
    fn from(value: NdArray) -> Self {
        Self::Array(value)
    }
}

impl From<LeafValue> for Value {
    fn from(value: LeafValue) -> Self {
        match value {
            LeafValue::Scalar(s) => Value::Scalar(s),
            LeafValue::Array(a) => Value::Array(a),
        }
    }
}

/// Validate a child name: non-empty and free of the path separator.
pub fn validate_name(name: &str) -> StoreResult<()> {
    if name.is_empty() {
        return Err(StoreError::InvalidName {
            name: name.to_string(),
            reason: "name must not be empty".into(),
        });
    }
    if name.contains('/') {
        return Err(StoreError::InvalidName {
            name: name.to_string(),
            reason: "name must not contain '/'".into(),
        });
    }
    Ok(())
}

fn child_path(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}

/// A node of the store tree.
///
/// Trees are persisted as a flat node table (see [`crate::format`]), never
/// through a recursive serializer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    Group(Group),
    Leaf(Leaf),
}

impl Node {
    /// Absolute slash-separated location of this node.
    pub fn path(&self) -> &str {
        match self {
            Self::Group(g) => &g.path,
            Self::Leaf(l) => &l.path,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, Self::Group(_))
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf(_))
    }

    pub fn as_group(&self) -> Option<&Group> {
        match self {
            Self::Group(g) => Some(g),
            Self::Leaf(_) => None,
        }
    }

    pub fn as_group_mut(&mut self) -> Option<&mut Group> {
        match self {
            Self::Group(g) => Some(g),
            Self::Leaf(_) => None,
        }
    }

    pub fn as_leaf(&self) -> Option<&Leaf> {
        match self {
            Self::Leaf(l) => Some(l),
            Self::Group(_) => None,
        }
    }

    /// Reassign paths below `path`. Paths are not persisted.
    pub(crate) fn rebase(&mut self, path: String) {
        match self {
            Self::Group(g) => {
                for (name, child) in &mut g.children {
                    child.rebase(child_path(&path, name));
                }
                g.path = path;
            }
            Self::Leaf(l) => l.path = path,
        }
    }
}

/// A named container of child nodes and metadata attributes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Group {
    path: String,
    pub(crate) attrs: BTreeMap<String, AttrValue>,
    pub(crate) children: BTreeMap<String, Node>,
}

impl Default for Group {
    fn default() -> Self {
        Self::root()
    }
}

impl Group {
    /// An empty group at the root location.
    pub fn root() -> Self {
        Self::at("/".to_string())
    }

    fn at(path: String) -> Self {
        Self::with_attrs(path, BTreeMap::new())
    }

    pub(crate) fn with_attrs(path: String, attrs: BTreeMap<String, AttrValue>) -> Self {
        Self {
            path,
            attrs,
            children: BTreeMap::new(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns `true` if the group has neither attributes nor children.
    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty() && self.children.is_empty()
    }

    /// Number of children.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Create a new, empty child group.
    pub fn create_group(&mut self, name: &str) -> StoreResult<&mut Group> {
        validate_name(name)?;
        let path = child_path(&self.path, name);
        match self.children.entry(name.to_string()) {
            Entry::Occupied(_) => Err(StoreError::NameExists {
                group: self.path.clone(),
                name: name.to_string(),
            }),
            Entry::Vacant(slot) => slot
                .insert(Node::Group(Group::at(path.clone())))
                .as_group_mut()
                .ok_or(StoreError::NotAGroup(path)),
        }
    }

    /// Create a leaf holding `value`, encoded according to `options`.
    pub fn create_leaf(
        &mut self,
        name: &str,
        value: &LeafValue,
        options: &LeafOptions,
    ) -> StoreResult<&Leaf> {
        validate_name(name)?;
        let path = child_path(&self.path, name);
        match self.children.entry(name.to_string()) {
            Entry::Occupied(_) => Err(StoreError::NameExists {
                group: self.path.clone(),
                name: name.to_string(),
            }),
            Entry::Vacant(slot) => {
                let leaf = Leaf::encode(path.clone(), value, options)?;
                slot.insert(Node::Leaf(leaf))
                    .as_leaf()
                    .ok_or(StoreError::NotALeaf(path))
            }
        }
    }

    /// Set a metadata attribute, returning the previous value.
    pub fn set_attr(&mut self, key: &str, value: impl Into<AttrValue>) -> StoreResult<Option<AttrValue>> {
        validate_name(key)?;
        Ok(self.attrs.insert(key.to_string(), value.into()))
    }

    pub fn attr(&self, key: &str) -> Option<&AttrValue> {
        self.attrs.get(key)
    }

    pub fn has_attr(&self, key: &str) -> bool {
        self.attrs.contains_key(key)
    }

    pub fn attrs(&self) -> &BTreeMap<String, AttrValue> {
        &self.attrs
    }

    /// Children in name order.
    pub fn children(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.children.iter().map(|(name, node)| (name.as_str(), node))
    }

    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.children.contains_key(name)
    }

    /// Look up a descendant by slash-separated relative path.
    ///
    /// Empty components are ignored, so `"a//b"` and `"/a/b"` both reach
    /// `b` inside `a`. The empty path yields `None`; use the group itself.
    pub fn resolve(&self, path: &str) -> Option<&Node> {
        let mut parts = path.split('/').filter(|p| !p.is_empty());
        let mut node = self.children.get(parts.next()?)?;
        for part in parts {
            node = node.as_group()?.children.get(part)?;
        }
        Some(node)
    }
}

/// A stored scalar or array, with its payload kept in stored form until
/// read.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leaf {
    #[serde(skip)]
    path: String,
    dtype: DType,
    shape: Vec<u64>,
    compression: Compression,
    raw_len: u64,
    crc32: u32,
    payload: Vec<u8>,
}

impl Leaf {
    pub(crate) fn encode(path: String, value: &LeafValue, options: &LeafOptions) -> StoreResult<Self> {
        let (dtype, shape, raw) = match value {
            LeafValue::Scalar(s) => (s.dtype(), Vec::new(), s.to_le_bytes()),
            LeafValue::Array(a) => (
                a.dtype(),
                a.shape().iter().map(|&d| d as u64).collect(),
                a.data().to_le_bytes(),
            ),
        };
        let payload = options.compression.compress(&raw)?;
        Ok(Self {
            path,
            dtype,
            shape,
            compression: options.compression,
            raw_len: raw.len() as u64,
            crc32: crc32fast::hash(&payload),
            payload,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Dimensions; empty for scalars.
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Size of the payload as stored.
    pub fn stored_len(&self) -> u64 {
        self.payload.len() as u64
    }

    /// Size of the payload once decompressed.
    pub fn raw_len(&self) -> u64 {
        self.raw_len
    }

    /// Check the stored payload against its CRC32.
    pub fn verify(&self) -> StoreResult<()> {
        if crc32fast::hash(&self.payload) != self.crc32 {
            return Err(StoreError::CrcMismatch {
                path: self.path.clone(),
            });
        }
        Ok(())
    }

    /// Decode the leaf back into a scalar or array.
    ///
    /// The declared shape and raw length are checked against each other
    /// before the payload is inflated.
    pub fn read(&self) -> StoreResult<LeafValue> {
        self.verify()?;
        let shape = self.dims()?;
        if let Some(size) = self.dtype.item_size() {
            let expected = shape_len(&shape)
                .and_then(|n| n.checked_mul(size))
                .and_then(|n| u64::try_from(n).ok());
            if expected != Some(self.raw_len) {
                return Err(StoreError::Corrupt(format!(
                    "leaf {}: shape {:?} of {} does not fit {} bytes",
                    self.path,
                    self.shape,
                    self.dtype.name(),
                    self.raw_len
                )));
            }
        }
        let raw = self.compression.decompress(&self.payload, self.raw_len)?;
        if raw.len() as u64 != self.raw_len {
            return Err(StoreError::Corrupt(format!(
                "leaf {}: expected {} bytes, got {}{}",
                self.path,
                self.raw_len,
                raw.len(),
                if raw.len() as u64 > self.raw_len { " or more" } else { "" }
            )));
        }
        let type_err = |source| StoreError::Type {
            path: self.path.clone(),
            source,
        };
        if shape.is_empty() {
            return Scalar::from_le_bytes(self.dtype, &raw)
                .map(LeafValue::Scalar)
                .map_err(type_err);
        }
        NdArray::from_le_bytes(self.dtype, shape, &raw)
            .map(LeafValue::Array)
            .map_err(type_err)
    }

    fn dims(&self) -> StoreResult<Vec<usize>> {
        self.shape
            .iter()
            .map(|&d| usize::try_from(d))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::Corrupt(format!("leaf {}: {e}", self.path)))
    }

    #[cfg(test)]
    pub(crate) fn payload_mut(&mut self) -> &mut Vec<u8> {
        &mut self.payload
    }
}
