//! Structural checks over a stored tree, without decoding it.

use std::fmt;

use mvpa_store::{AttrValue, Group, Node};
use mvpa_types::BUILTINS;
use serde::Serialize;

use crate::names::{
    unescape_key, ATTR_CLASS, ATTR_IS_OBJARRAY, ATTR_MODULE, ATTR_RECON, ATTR_SHAPE, GROUP_ITEMS,
    GROUP_RCARGS, GROUP_STATE,
};

/// One structural problem found by [`verify`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub path: String,
    pub message: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Walk `node` and report every layout violation and leaf checksum
/// failure. An empty result means the tree would decode structurally.
///
/// A file root without a descriptor is a container of named objects; each
/// child is then checked as a separate object.
pub fn verify(node: &Node) -> Vec<Issue> {
    let mut issues = Vec::new();
    match node.as_group() {
        Some(root) if is_named_container(root) => {
            for (_, child) in root.children() {
                visit(child, &mut issues);
            }
        }
        _ => visit(node, &mut issues),
    }
    issues
}

fn is_named_container(group: &Group) -> bool {
    group.path() == "/" && !group.has_attr(ATTR_CLASS) && !group.has_attr(ATTR_RECON)
}

fn report(issues: &mut Vec<Issue>, path: &str, message: impl Into<String>) {
    issues.push(Issue {
        path: path.to_string(),
        message: message.into(),
    });
}

fn visit(node: &Node, issues: &mut Vec<Issue>) {
    match node {
        Node::Leaf(leaf) => {
            if let Err(e) = leaf.read() {
                report(issues, leaf.path(), e.to_string());
            }
        }
        Node::Group(group) => visit_group(group, issues),
    }
}

fn visit_group(group: &Group, issues: &mut Vec<Issue>) {
    let path = group.path();
    let class = string_attr(group, ATTR_CLASS, issues);
    let recon = string_attr(group, ATTR_RECON, issues);
    let module = string_attr(group, ATTR_MODULE, issues);

    if class.is_some() && recon.is_some() {
        report(issues, path, "both class and recon attributes");
    }
    if class.is_none() && recon.is_none() {
        report(issues, path, "missing class/recon attributes");
    }
    if module.is_none() && (class.is_some() || recon.is_some()) {
        report(issues, path, "missing module attribute");
    }
    let builtin = module == Some(BUILTINS);

    for (name, child) in group.children() {
        if ![GROUP_ITEMS, GROUP_STATE, GROUP_RCARGS].contains(&name) {
            report(issues, child.path(), "unexpected child");
            continue;
        }
        if !child.is_group() {
            report(issues, child.path(), "must be a group");
        }
    }

    if recon.is_some() {
        if builtin {
            report(issues, path, "builtin factory");
        }
        if group.contains(GROUP_STATE) {
            report(issues, path, "post-construction state on a factory node");
        }
        if group.contains(GROUP_ITEMS) {
            report(issues, path, "items group on a factory node");
        }
        check_sequence(group, GROUP_RCARGS, issues);
    } else if let Some(class) = class {
        if group.contains(GROUP_RCARGS) {
            report(issues, path, "rcargs group on a class node");
        }
        if builtin {
            check_builtin(group, class, issues);
        } else {
            check_mapping(group, GROUP_STATE, issues);
            check_mapping(group, GROUP_ITEMS, issues);
        }
    }

    for (_, child) in group.children() {
        if let Some(inner) = child.as_group() {
            for (_, grandchild) in inner.children() {
                visit(grandchild, issues);
            }
        }
    }
}

fn check_builtin(group: &Group, class: &str, issues: &mut Vec<Issue>) {
    let path = group.path();
    if group.contains(GROUP_STATE) {
        report(issues, path, format!("state group on builtin {class}"));
    }
    match class {
        "NoneType" => {}
        "list" | "tuple" | "dict" if !group.contains(GROUP_ITEMS) => {
            report(issues, path, format!("missing items group for {class}"));
        }
        "list" => {
            let len = check_sequence(group, GROUP_ITEMS, issues);
            if let Some(AttrValue::Bool(true)) = group.attr(ATTR_IS_OBJARRAY) {
                check_objarray_shape(group, len, issues);
            }
        }
        "tuple" => {
            check_sequence(group, GROUP_ITEMS, issues);
        }
        "dict" => check_mapping(group, GROUP_ITEMS, issues),
        other => report(issues, path, format!("unhandled builtin class {other:?}")),
    }
}

fn check_objarray_shape(group: &Group, len: usize, issues: &mut Vec<Issue>) {
    match group.attr(ATTR_SHAPE) {
        None => {}
        Some(AttrValue::IntList(dims)) => {
            let count = dims
                .iter()
                .try_fold(1usize, |acc, &d| usize::try_from(d).ok().and_then(|d| acc.checked_mul(d)));
            if count != Some(len) {
                report(
                    issues,
                    group.path(),
                    format!("object array shape {dims:?} does not hold {len} elements"),
                );
            }
        }
        Some(other) => report(issues, group.path(), format!("shape must be an integer list, got {other}")),
    }
}

/// Check `"0".."n-1"` naming; returns the number of children.
fn check_sequence(group: &Group, child: &str, issues: &mut Vec<Issue>) -> usize {
    let Some(seq) = group.child(child).and_then(Node::as_group) else {
        return 0;
    };
    for i in 0..seq.len() {
        if !seq.contains(&i.to_string()) {
            report(issues, seq.path(), format!("sequence is missing index {i}"));
        }
    }
    seq.len()
}

fn check_mapping(group: &Group, child: &str, issues: &mut Vec<Issue>) {
    let Some(map) = group.child(child).and_then(Node::as_group) else {
        return;
    };
    for (name, node) in map.children() {
        if unescape_key(name).is_none() {
            report(issues, node.path(), "invalid escaped key");
        }
    }
}

fn string_attr<'a>(group: &'a Group, key: &str, issues: &mut Vec<Issue>) -> Option<&'a str> {
    match group.attr(key)? {
        AttrValue::Str(s) => Some(s.as_str()),
        other => {
            report(issues, group.path(), format!("attribute {key} must be a string, got {other}"));
            None
        }
    }
}
