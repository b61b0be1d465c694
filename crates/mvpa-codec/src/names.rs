//! Child naming inside `items`, `state` and `rcargs` groups.
//!
//! Sequence elements are named by their decimal index. Mapping keys are
//! escaped so any string survives as a store child name:
//!
//! - `\` becomes `\\`
//! - `/` becomes `\s`
//! - the empty key becomes `\e`
//!
//! Descriptor metadata lives in group attributes and payload children sit
//! one level below the `items`/`state`/`rcargs` groups, so a key such as
//! `"class"` or `"items"` never collides with the codec's own names.

/// Attribute naming the class of a generic-replay node.
pub const ATTR_CLASS: &str = "class";
/// Attribute naming the declaring module of the class or factory.
pub const ATTR_MODULE: &str = "module";
/// Attribute naming the factory of a custom-replay node.
pub const ATTR_RECON: &str = "recon";
/// Flag marking a `list` node as an object array.
pub const ATTR_IS_OBJARRAY: &str = "is_objarray";
/// Shape of an object array.
pub const ATTR_SHAPE: &str = "shape";

pub const GROUP_ITEMS: &str = "items";
pub const GROUP_STATE: &str = "state";
pub const GROUP_RCARGS: &str = "rcargs";

/// Escape a mapping key into a valid child name.
pub fn escape_key(key: &str) -> String {
    if key.is_empty() {
        return "\\e".to_string();
    }
    let mut out = String::with_capacity(key.len());
    for ch in key.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '/' => out.push_str("\\s"),
            c => out.push(c),
        }
    }
    out
}

/// Reverse [`escape_key`]. Returns `None` for names no key escapes to.
pub fn unescape_key(name: &str) -> Option<String> {
    if name == "\\e" {
        return Some(String::new());
    }
    let mut out = String::with_capacity(name.len());
    let mut chars = name.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next()? {
            '\\' => out.push('\\'),
            's' => out.push('/'),
            _ => return None,
        }
    }
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}
