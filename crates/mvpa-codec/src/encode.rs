use mvpa_store::{Group, LeafValue};
use mvpa_types::{Fields, TypeName, Value, BUILTINS};
use tracing::{debug, trace};

use crate::config::CodecConfig;
use crate::error::{CodecError, CodecResult};
use crate::names::{
    escape_key, ATTR_CLASS, ATTR_IS_OBJARRAY, ATTR_MODULE, ATTR_RECON, ATTR_SHAPE, GROUP_ITEMS,
    GROUP_RCARGS, GROUP_STATE,
};

/// Write `value` into `group`.
///
/// With a `name`, the value becomes a new child of `group`: a leaf for
/// scalars and numeric arrays, a group otherwise. Without one, `group`
/// itself receives the descriptor and children; it must be empty, and the
/// value must not be leaf-storable.
pub fn encode(
    group: &mut Group,
    value: &Value,
    name: Option<&str>,
    config: &CodecConfig,
) -> CodecResult<()> {
    debug!(group = group.path(), name, kind = value.kind(), "encode");
    let encoder = Encoder { config };
    match name {
        Some(name) => encoder.write(group, name, value, 0),
        None if value.is_leaf() => Err(CodecError::unsupported(
            group.path(),
            "a scalar or array needs a name unless it is the whole file",
        )),
        None if !group.is_empty() => Err(CodecError::unsupported(
            group.path(),
            "anonymous encode into a non-empty group",
        )),
        None => encoder.fill(group, value, 0),
    }
}

/// Leaf form of a directly storable value.
pub(crate) fn leaf_value(value: &Value) -> Option<LeafValue> {
    match value {
        Value::Scalar(s) => Some(LeafValue::Scalar(s.clone())),
        Value::Array(a) => Some(LeafValue::Array(a.clone())),
        _ => None,
    }
}

pub(crate) fn child_path(parent: &str, name: &str) -> String {
    if parent.ends_with('/') {
        format!("{parent}{name}")
    } else {
        format!("{parent}/{name}")
    }
}

struct Encoder<'a> {
    config: &'a CodecConfig,
}

impl Encoder<'_> {
    fn write(&self, parent: &mut Group, name: &str, value: &Value, depth: usize) -> CodecResult<()> {
        if depth > self.config.max_depth {
            return Err(CodecError::DepthExceeded {
                path: child_path(parent.path(), name),
                limit: self.config.max_depth,
            });
        }
        trace!(parent = parent.path(), name, kind = value.kind(), "encode node");
        if let Some(leaf) = leaf_value(value) {
            parent.create_leaf(name, &leaf, &self.config.leaf)?;
            return Ok(());
        }
        let group = parent.create_group(name)?;
        self.fill(group, value, depth)
    }

    fn fill(&self, group: &mut Group, value: &Value, depth: usize) -> CodecResult<()> {
        match value {
            Value::Scalar(_) | Value::Array(_) => Err(CodecError::unsupported(
                group.path(),
                "leaf value cannot fill a group",
            )),
            Value::None => set_builtin(group, "NoneType"),
            Value::List(elems) => {
                set_builtin(group, "list")?;
                self.sequence(group, GROUP_ITEMS, elems, depth)
            }
            Value::Tuple(elems) => {
                set_builtin(group, "tuple")?;
                self.sequence(group, GROUP_ITEMS, elems, depth)
            }
            Value::Dict(fields) => {
                set_builtin(group, "dict")?;
                self.mapping(group, GROUP_ITEMS, fields, depth)
            }
            Value::ObjArray(array) => {
                let shape = array
                    .shape()
                    .iter()
                    .map(|&d| i64::try_from(d))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|_| CodecError::unsupported(group.path(), "object array axis too long"))?;
                set_builtin(group, "list")?;
                group.set_attr(ATTR_IS_OBJARRAY, true)?;
                group.set_attr(ATTR_SHAPE, shape)?;
                self.sequence(group, GROUP_ITEMS, array.elements(), depth)
            }
            Value::Instance(instance) => {
                if instance.class.is_builtin() {
                    return Err(CodecError::unsupported(
                        group.path(),
                        format!("instance of builtin class {}", instance.class),
                    ));
                }
                set_type(group, ATTR_CLASS, &instance.class)?;
                if !instance.state.is_empty() {
                    self.mapping(group, GROUP_STATE, &instance.state, depth)?;
                }
                if let Some(items) = &instance.items {
                    self.mapping(group, GROUP_ITEMS, items, depth)?;
                }
                Ok(())
            }
            Value::Reduced(reduced) => {
                if reduced.factory.is_builtin() {
                    return Err(CodecError::unsupported(
                        group.path(),
                        format!("builtin factory {}", reduced.factory),
                    ));
                }
                set_type(group, ATTR_RECON, &reduced.factory)?;
                self.sequence(group, GROUP_RCARGS, &reduced.args, depth)
            }
        }
    }

    fn sequence(&self, group: &mut Group, child: &str, elems: &[Value], depth: usize) -> CodecResult<()> {
        let items = group.create_group(child)?;
        for (i, elem) in elems.iter().enumerate() {
            self.write(items, &i.to_string(), elem, depth + 1)?;
        }
        Ok(())
    }

    fn mapping(&self, group: &mut Group, child: &str, fields: &Fields, depth: usize) -> CodecResult<()> {
        let items = group.create_group(child)?;
        for (key, value) in fields {
            self.write(items, &escape_key(key), value, depth + 1)?;
        }
        Ok(())
    }
}

fn set_builtin(group: &mut Group, class: &str) -> CodecResult<()> {
    group.set_attr(ATTR_CLASS, class)?;
    group.set_attr(ATTR_MODULE, BUILTINS)?;
    Ok(())
}

fn set_type(group: &mut Group, attr: &str, name: &TypeName) -> CodecResult<()> {
    group.set_attr(attr, name.name.as_str())?;
    group.set_attr(ATTR_MODULE, name.module.as_str())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mvpa_store::{AttrValue, Node};
    use mvpa_types::{Instance, NdArray, ObjArray, Reduced, Scalar};

    fn encode_named(value: &Value) -> Group {
        let mut root = Group::root();
        encode(&mut root, value, Some("obj"), &CodecConfig::default()).unwrap();
        root
    }

    fn attr<'a>(node: &'a Node, key: &str) -> Option<&'a AttrValue> {
        node.as_group()?.attr(key)
    }

    // -----------------------------------------------------------------------
    // Leaves
    // -----------------------------------------------------------------------

    #[test]
    fn scalars_and_arrays_become_leaves() {
        let root = encode_named(&Value::from(3.5f64));
        assert!(root.child("obj").unwrap().is_leaf());

        let arr = NdArray::new(vec![2, 3], vec![0u8; 6]).unwrap();
        let root = encode_named(&Value::Array(arr));
        let leaf = root.child("obj").unwrap().as_leaf().unwrap();
        assert_eq!(leaf.shape(), &[2, 3]);
    }

    #[test]
    fn anonymous_leaf_rejected() {
        let mut root = Group::root();
        let err = encode(&mut root, &Value::from(1i32), None, &CodecConfig::default()).unwrap_err();
        assert!(err.is_unsupported());
    }

    // -----------------------------------------------------------------------
    // Builtin containers
    // -----------------------------------------------------------------------

    #[test]
    fn list_layout() {
        let value = Value::List(vec![Value::from(1i64), Value::None]);
        let root = encode_named(&value);
        let node = root.child("obj").unwrap();
        assert_eq!(attr(node, "class"), Some(&AttrValue::from("list")));
        assert_eq!(attr(node, "module"), Some(&AttrValue::from("builtins")));
        assert!(attr(node, "is_objarray").is_none());
        let items = node.as_group().unwrap().child("items").unwrap().as_group().unwrap();
        assert!(items.child("0").unwrap().is_leaf());
        let none = items.child("1").unwrap();
        assert_eq!(attr(none, "class"), Some(&AttrValue::from("NoneType")));
    }

    #[test]
    fn empty_containers_still_get_items() {
        for value in [Value::List(vec![]), Value::Tuple(vec![]), Value::Dict(Fields::new())] {
            let root = encode_named(&value);
            let items = root.resolve("obj/items").unwrap().as_group().unwrap();
            assert_eq!(items.len(), 0);
        }
    }

    #[test]
    fn dict_keys_are_escaped() {
        let fields: Fields = [("a/b", 1i32), ("", 2i32)].into_iter().collect();
        let root = encode_named(&Value::Dict(fields));
        let items = root.resolve("obj/items").unwrap().as_group().unwrap();
        assert!(items.contains("a\\sb"));
        assert!(items.contains("\\e"));
    }

    #[test]
    fn objarray_records_flag_and_shape() {
        let arr = ObjArray::new(
            vec![2, 1],
            vec![Value::from("a"), Value::from(2i32)],
        )
        .unwrap();
        let root = encode_named(&Value::ObjArray(arr));
        let node = root.child("obj").unwrap();
        assert_eq!(attr(node, "is_objarray"), Some(&AttrValue::Bool(true)));
        assert_eq!(attr(node, "shape"), Some(&AttrValue::IntList(vec![2, 1])));
        assert_eq!(attr(node, "class"), Some(&AttrValue::from("list")));
    }

    // -----------------------------------------------------------------------
    // User types
    // -----------------------------------------------------------------------

    #[test]
    fn instance_layout() {
        let inst = Instance::new(TypeName::new("mvpa.kernels", "Linear")).with("offset", 0.5f64);
        let root = encode_named(&Value::Instance(inst));
        let node = root.child("obj").unwrap();
        assert_eq!(attr(node, "class"), Some(&AttrValue::from("Linear")));
        assert_eq!(attr(node, "module"), Some(&AttrValue::from("mvpa.kernels")));
        let group = node.as_group().unwrap();
        assert!(group.resolve("state/offset").unwrap().is_leaf());
        assert!(!group.contains("items"));
        assert!(!group.contains("rcargs"));
    }

    #[test]
    fn instance_without_state_has_no_state_group() {
        let root = encode_named(&Value::Instance(Instance::new(TypeName::new("m", "Empty"))));
        let group = root.child("obj").unwrap().as_group().unwrap();
        assert!(!group.contains("state"));
    }

    #[test]
    fn reduced_layout() {
        let reduced = Reduced::new(TypeName::new("mvpa.misc", "make"), vec![Value::from(1i8)]);
        let root = encode_named(&Value::Reduced(reduced));
        let node = root.child("obj").unwrap();
        assert_eq!(attr(node, "recon"), Some(&AttrValue::from("make")));
        assert!(attr(node, "class").is_none());
        assert!(node.as_group().unwrap().resolve("rcargs/0").is_some());
    }

    #[test]
    fn builtin_user_types_rejected() {
        let cases = [
            Value::Instance(Instance::new(TypeName::builtin("set"))),
            Value::Reduced(Reduced::new(TypeName::builtin("getattr"), vec![])),
        ];
        for value in cases {
            let mut root = Group::root();
            let err = encode(&mut root, &value, Some("x"), &CodecConfig::default()).unwrap_err();
            assert!(err.is_unsupported(), "{err}");
        }
    }

    // -----------------------------------------------------------------------
    // Limits
    // -----------------------------------------------------------------------

    #[test]
    fn depth_limit() {
        let mut value = Value::from(Scalar::I32(0));
        for _ in 0..10 {
            value = Value::List(vec![value]);
        }
        let config = CodecConfig {
            max_depth: 5,
            ..CodecConfig::default()
        };
        let mut root = Group::root();
        let err = encode(&mut root, &value, Some("deep"), &config).unwrap_err();
        match err {
            CodecError::DepthExceeded { path, limit } => {
                assert_eq!(limit, 5);
                assert!(path.starts_with("/deep/items/0"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn duplicate_name_is_store_error() {
        let mut root = Group::root();
        let config = CodecConfig::default();
        encode(&mut root, &Value::None, Some("x"), &config).unwrap();
        let err = encode(&mut root, &Value::None, Some("x"), &config).unwrap_err();
        assert!(matches!(err, CodecError::Store(_)));
    }
}
