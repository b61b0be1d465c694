//! Single-file container layout.
//!
//! ```text
//! "MVPH" | version: u32 BE | body_len: u64 BE | body | BLAKE3(header ‖ body)
//! ```
//!
//! The body is a bincode sequence of node records in pre-order: each group
//! record carries its child count and is followed by its children. Node
//! paths are not part of the body; they are recomputed on read. Both
//! directions walk the tree with an explicit stack, and group nesting is
//! capped at [`MAX_NESTING`].

use std::collections::BTreeMap;

use bincode::Options;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::node::{validate_name, AttrValue, Group, Leaf, Node};

pub const MAGIC: &[u8; 4] = b"MVPH";
pub const VERSION: u32 = 1;

/// Most groups with children a container may stack on one path.
pub const MAX_NESTING: usize = 1024;

const HEADER_LEN: usize = 4 + 4 + 8;
const TRAILER_LEN: usize = 32;

#[derive(Serialize)]
enum RecordRef<'a> {
    Group {
        name: &'a str,
        attrs: &'a BTreeMap<String, AttrValue>,
        children: u64,
    },
    Leaf {
        name: &'a str,
        leaf: &'a Leaf,
    },
}

#[derive(Deserialize)]
enum Record {
    Group {
        name: String,
        attrs: BTreeMap<String, AttrValue>,
        children: u64,
    },
    Leaf {
        name: String,
        leaf: Leaf,
    },
}

fn flatten(root: &Node) -> StoreResult<Vec<RecordRef<'_>>> {
    let mut records = Vec::new();
    let mut stack = vec![("", root, 0usize)];
    while let Some((name, node, depth)) = stack.pop() {
        match node {
            Node::Group(g) => {
                if depth >= MAX_NESTING && !g.children.is_empty() {
                    return Err(StoreError::TooDeep { limit: MAX_NESTING });
                }
                records.push(RecordRef::Group {
                    name,
                    attrs: &g.attrs,
                    children: g.children.len() as u64,
                });
                for (child_name, child) in g.children.iter().rev() {
                    stack.push((child_name.as_str(), child, depth + 1));
                }
            }
            Node::Leaf(leaf) => records.push(RecordRef::Leaf { name, leaf }),
        }
    }
    Ok(records)
}

fn rebuild(records: Vec<Record>) -> StoreResult<Node> {
    let mut records = records.into_iter();
    // Groups whose children are still being read, with the count left.
    let mut open: Vec<(String, Group, u64)> = Vec::new();
    loop {
        let record = records
            .next()
            .ok_or_else(|| StoreError::Corrupt("node table ends inside a group".into()))?;
        let (mut name, mut node) = match record {
            Record::Group {
                name,
                attrs,
                children,
            } => {
                let group = Group::with_attrs(String::new(), attrs);
                if children > 0 {
                    if open.len() >= MAX_NESTING {
                        return Err(StoreError::TooDeep { limit: MAX_NESTING });
                    }
                    open.push((name, group, children));
                    continue;
                }
                (name, Node::Group(group))
            }
            Record::Leaf { name, leaf } => (name, Node::Leaf(leaf)),
        };

        loop {
            let Some((_, parent, remaining)) = open.last_mut() else {
                if records.next().is_some() {
                    return Err(StoreError::Corrupt("records after the root node".into()));
                }
                return Ok(node);
            };
            validate_name(&name).map_err(|e| StoreError::Corrupt(e.to_string()))?;
            if parent.children.insert(name.clone(), node).is_some() {
                return Err(StoreError::Corrupt(format!("duplicate child {name:?}")));
            }
            *remaining -= 1;
            if *remaining > 0 {
                break;
            }
            let (parent_name, parent, _) = open
                .pop()
                .ok_or_else(|| StoreError::Corrupt("unbalanced node table".into()))?;
            name = parent_name;
            node = Node::Group(parent);
        }
    }
}

/// Serialize a tree into container bytes.
pub fn write_container(root: &Node) -> StoreResult<Vec<u8>> {
    let body = bincode::DefaultOptions::new()
        .serialize(&flatten(root)?)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;

    let mut out = Vec::with_capacity(HEADER_LEN + body.len() + TRAILER_LEN);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&VERSION.to_be_bytes());
    out.extend_from_slice(&(body.len() as u64).to_be_bytes());
    out.extend_from_slice(&body);

    let checksum = *blake3::hash(&out).as_bytes();
    out.extend_from_slice(&checksum);
    Ok(out)
}

/// Parse container bytes back into a tree rooted at `/`.
///
/// The root is usually a group; a store holding a single anonymous leaf
/// has a leaf root.
pub fn read_container(data: &[u8]) -> StoreResult<Node> {
    if data.len() < HEADER_LEN + TRAILER_LEN {
        return Err(StoreError::Corrupt(format!(
            "container too short: {} bytes",
            data.len()
        )));
    }
    if &data[0..4] != MAGIC {
        return Err(StoreError::InvalidMagic {
            expected: String::from_utf8_lossy(MAGIC).into(),
            actual: String::from_utf8_lossy(&data[0..4]).into(),
        });
    }
    let version = u32::from_be_bytes(be_bytes(&data[4..8])?);
    if version != VERSION {
        return Err(StoreError::UnsupportedVersion(version));
    }
    let body_len = u64::from_be_bytes(be_bytes(&data[8..16])?);
    let expected_len = (HEADER_LEN + TRAILER_LEN) as u64 + body_len;
    if data.len() as u64 != expected_len {
        return Err(StoreError::Corrupt(format!(
            "container length {} does not match declared body length {body_len}",
            data.len()
        )));
    }

    let (content, trailer) = data.split_at(data.len() - TRAILER_LEN);
    if blake3::hash(content).as_bytes() != trailer {
        return Err(StoreError::ChecksumMismatch);
    }

    let body = &content[HEADER_LEN..];
    let records: Vec<Record> = bincode::DefaultOptions::new()
        .with_limit(body.len() as u64)
        .deserialize(body)
        .map_err(|e| StoreError::Corrupt(e.to_string()))?;
    let mut root = rebuild(records)?;
    root.rebase("/".to_string());
    Ok(root)
}

fn be_bytes<const N: usize>(slice: &[u8]) -> StoreResult<[u8; N]> {
    slice
        .try_into()
        .map_err(|_| StoreError::Corrupt("truncated header".into()))
}
