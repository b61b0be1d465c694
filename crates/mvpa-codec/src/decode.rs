use mvpa_store::{AttrValue, Group, Node};
use mvpa_types::{Fields, Instance, ObjArray, Reduced, TypeName, Value, BUILTINS};
use tracing::{debug, trace};

use crate::config::CodecConfig;
use crate::error::{CodecError, CodecResult};
use crate::names::{
    unescape_key, ATTR_CLASS, ATTR_IS_OBJARRAY, ATTR_MODULE, ATTR_RECON, ATTR_SHAPE, GROUP_ITEMS,
    GROUP_RCARGS, GROUP_STATE,
};
use crate::registry::{ClassKind, Registry};

/// Rebuild a value from a node written by [`encode`](crate::encode).
///
/// User classes and factories are looked up in `registry` and nothing else
/// is ever constructed or called.
pub fn decode(node: &Node, registry: &Registry, config: &CodecConfig) -> CodecResult<Value> {
    debug!(path = node.path(), "decode");
    Decoder {
        resolve: Resolve::Registry(registry),
        max_depth: config.max_depth,
    }
    .node(node, 0)
}

/// Decode without a registry.
///
/// User types come back as the raw [`Instance`] and [`Reduced`] parts
/// recorded in the store; nothing is built. The same structural checks as
/// [`decode`] apply.
pub fn decode_structure(node: &Node, config: &CodecConfig) -> CodecResult<Value> {
    debug!(path = node.path(), "decode structure");
    Decoder {
        resolve: Resolve::Structural,
        max_depth: config.max_depth,
    }
    .node(node, 0)
}

enum Resolve<'a> {
    Registry(&'a Registry),
    Structural,
}

struct Decoder<'a> {
    resolve: Resolve<'a>,
    max_depth: usize,
}

impl Decoder<'_> {
    fn node(&self, node: &Node, depth: usize) -> CodecResult<Value> {
        if depth > self.max_depth {
            return Err(CodecError::DepthExceeded {
                path: node.path().to_string(),
                limit: self.max_depth,
            });
        }
        trace!(path = node.path(), "decode node");
        match node {
            Node::Leaf(leaf) => Ok(leaf.read()?.into()),
            Node::Group(group) => self.group(group, depth),
        }
    }

    fn group(&self, group: &Group, depth: usize) -> CodecResult<Value> {
        let path = group.path();
        let class = str_attr(group, ATTR_CLASS)?;
        let recon = str_attr(group, ATTR_RECON)?;
        match (class, recon) {
            (Some(_), Some(_)) => Err(CodecError::malformed(path, "both class and recon attributes")),
            (None, None) => Err(CodecError::malformed(path, "missing class/recon attributes")),
            (None, Some(factory)) => {
                let factory = TypeName::new(module_attr(group)?, factory);
                self.custom(group, factory, depth)
            }
            (Some(class), None) => {
                let module = module_attr(group)?;
                if module == BUILTINS {
                    self.builtin(group, class, depth)
                } else {
                    self.instance(group, TypeName::new(module, class), depth)
                }
            }
        }
    }

    fn custom(&self, group: &Group, factory: TypeName, depth: usize) -> CodecResult<Value> {
        let path = group.path();
        if factory.is_builtin() {
            return Err(CodecError::unsupported(path, format!("builtin factory {factory}")));
        }
        if group.contains(GROUP_STATE) {
            return Err(CodecError::unsupported(path, "post-construction state on a factory node"));
        }
        if group.contains(GROUP_ITEMS) {
            return Err(CodecError::malformed(path, "items group on a factory node"));
        }
        let args = match group.child(GROUP_RCARGS) {
            Some(rcargs) => self.sequence(child_group(group, rcargs)?, depth)?,
            None => Vec::new(),
        };
        match &self.resolve {
            Resolve::Structural => Ok(Value::Reduced(Reduced::new(factory, args))),
            Resolve::Registry(registry) => {
                let build = registry.factory(&factory).ok_or_else(|| CodecError::Unresolved {
                    path: path.to_string(),
                    kind: "factory",
                    name: factory.clone(),
                })?;
                build(args).map_err(|source| CodecError::Reconstruct {
                    path: path.to_string(),
                    source,
                })
            }
        }
    }

    fn instance(&self, group: &Group, class: TypeName, depth: usize) -> CodecResult<Value> {
        let path = group.path();
        if group.contains(GROUP_RCARGS) {
            return Err(CodecError::malformed(path, "rcargs group on a class node"));
        }
        let kind = match &self.resolve {
            Resolve::Structural => None,
            Resolve::Registry(registry) => Some(registry.class(&class).ok_or_else(|| {
                CodecError::Unresolved {
                    path: path.to_string(),
                    kind: "class",
                    name: class.clone(),
                }
            })?),
        };
        if matches!(kind, Some((ClassKind::Plain, _))) && group.contains(GROUP_ITEMS) {
            return Err(CodecError::malformed(
                path,
                format!("items group on non-mapping class {class}"),
            ));
        }

        let state = match group.child(GROUP_STATE) {
            Some(state) => self.mapping(child_group(group, state)?, depth)?,
            None => Fields::new(),
        };
        let items = match group.child(GROUP_ITEMS) {
            Some(items) => Some(self.mapping(child_group(group, items)?, depth)?),
            None => None,
        };
        let instance = Instance { class, state, items };
        match kind {
            None => Ok(Value::Instance(instance)),
            Some((_, build)) => build(instance).map_err(|source| CodecError::Reconstruct {
                path: path.to_string(),
                source,
            }),
        }
    }

    fn builtin(&self, group: &Group, class: &str, depth: usize) -> CodecResult<Value> {
        let path = group.path();
        if group.contains(GROUP_STATE) || group.contains(GROUP_RCARGS) {
            return Err(CodecError::malformed(path, format!("unexpected children on builtin {class}")));
        }
        match class {
            "NoneType" => Ok(Value::None),
            "tuple" => Ok(Value::Tuple(self.items_sequence(group, depth)?)),
            "list" => {
                let elems = self.items_sequence(group, depth)?;
                if bool_attr(group, ATTR_IS_OBJARRAY)? {
                    objarray(group, elems)
                } else {
                    Ok(Value::List(elems))
                }
            }
            "dict" => {
                let items = required_child(group, GROUP_ITEMS)?;
                Ok(Value::Dict(self.mapping(items, depth)?))
            }
            other => Err(CodecError::malformed(
                path,
                format!("unhandled builtin class {other:?}"),
            )),
        }
    }

    fn items_sequence(&self, group: &Group, depth: usize) -> CodecResult<Vec<Value>> {
        self.sequence(required_child(group, GROUP_ITEMS)?, depth)
    }

    /// Children named `"0"..n`, decoded in index order.
    fn sequence(&self, group: &Group, depth: usize) -> CodecResult<Vec<Value>> {
        (0..group.len())
            .map(|i| {
                let child = group.child(&i.to_string()).ok_or_else(|| {
                    CodecError::malformed(group.path(), format!("sequence is missing index {i}"))
                })?;
                self.node(child, depth + 1)
            })
            .collect()
    }

    fn mapping(&self, group: &Group, depth: usize) -> CodecResult<Fields> {
        let mut fields = Fields::new();
        for (name, child) in group.children() {
            let key = unescape_key(name).ok_or_else(|| {
                CodecError::malformed(group.path(), format!("invalid escaped key {name:?}"))
            })?;
            fields.insert(key, self.node(child, depth + 1)?);
        }
        Ok(fields)
    }
}

fn objarray(group: &Group, elems: Vec<Value>) -> CodecResult<Value> {
    let shape = match group.attr(ATTR_SHAPE) {
        None => vec![elems.len()],
        Some(AttrValue::IntList(dims)) => dims
            .iter()
            .map(|&d| usize::try_from(d))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| CodecError::malformed(group.path(), "negative object array dimension"))?,
        Some(other) => {
            return Err(CodecError::malformed(
                group.path(),
                format!("shape attribute must be an integer list, got {other}"),
            ))
        }
    };
    ObjArray::new(shape, elems)
        .map(Value::ObjArray)
        .map_err(|e| CodecError::malformed(group.path(), e.to_string()))
}

fn str_attr<'a>(group: &'a Group, key: &str) -> CodecResult<Option<&'a str>> {
    match group.attr(key) {
        None => Ok(None),
        Some(AttrValue::Str(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(CodecError::malformed(
            group.path(),
            format!("attribute {key} must be a string, got {other}"),
        )),
    }
}

fn bool_attr(group: &Group, key: &str) -> CodecResult<bool> {
    match group.attr(key) {
        None => Ok(false),
        Some(AttrValue::Bool(b)) => Ok(*b),
        Some(other) => Err(CodecError::malformed(
            group.path(),
            format!("attribute {key} must be a boolean, got {other}"),
        )),
    }
}

fn module_attr(group: &Group) -> CodecResult<&str> {
    str_attr(group, ATTR_MODULE)?
        .ok_or_else(|| CodecError::malformed(group.path(), "missing module attribute"))
}

fn child_group<'a>(parent: &Group, node: &'a Node) -> CodecResult<&'a Group> {
    node.as_group().ok_or_else(|| {
        CodecError::malformed(parent.path(), format!("{} must be a group", node.path()))
    })
}

fn required_child<'a>(group: &'a Group, name: &str) -> CodecResult<&'a Group> {
    let node = group
        .child(name)
        .ok_or_else(|| CodecError::malformed(group.path(), format!("missing {name} group")))?;
    child_group(group, node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::encode;
    use mvpa_store::{LeafOptions, LeafValue};
    use mvpa_types::{ArrayData, DType, NdArray, Scalar, TypeError, TypeResult};
    use proptest::prelude::*;

    fn roundtrip_with(value: &Value, registry: &Registry) -> CodecResult<Value> {
        let config = CodecConfig::default();
        let mut root = Group::root();
        encode(&mut root, value, Some("v"), &config)?;
        let node = root.child("v").cloned().ok_or_else(|| CodecError::malformed("/", "lost"))?;
        decode(&node, registry, &config)
    }

    fn roundtrip(value: &Value) -> Value {
        roundtrip_with(value, &Registry::new()).unwrap()
    }

    fn decode_group(group: Group) -> CodecResult<Value> {
        decode(&Node::Group(group), &Registry::new(), &CodecConfig::default())
    }

    // -----------------------------------------------------------------------
    // Scalars and arrays
    // -----------------------------------------------------------------------

    #[test]
    fn scalar_extremes_roundtrip() {
        let cases: Vec<Scalar> = vec![
            Scalar::Bool(false),
            Scalar::Bool(true),
            Scalar::I8(i8::MIN),
            Scalar::I8(i8::MAX),
            Scalar::I16(i16::MIN),
            Scalar::I32(-1),
            Scalar::I64(i64::MIN),
            Scalar::I64(i64::MAX),
            Scalar::U8(u8::MAX),
            Scalar::U16(0),
            Scalar::U32(u32::MAX),
            Scalar::U64(u64::MAX),
            Scalar::F32(f32::MIN_POSITIVE),
            Scalar::F32(-0.0),
            Scalar::F64(f64::MAX),
            Scalar::F64(f64::NAN),
            Scalar::Str("ünïcode".into()),
            Scalar::Str(String::new()),
        ];
        for s in cases {
            let value = Value::Scalar(s);
            assert!(roundtrip(&value).bit_eq(&value), "{value:?}");
        }
    }

    /// Minimum, maximum, zero and a negative (or otherwise distinct) value.
    fn extremes(dtype: DType) -> ArrayData {
        match dtype {
            DType::Bool => vec![false, true, false, true].into(),
            DType::I8 => vec![i8::MIN, i8::MAX, 0, -1].into(),
            DType::I16 => vec![i16::MIN, i16::MAX, 0, -1].into(),
            DType::I32 => vec![i32::MIN, i32::MAX, 0, -1].into(),
            DType::I64 => vec![i64::MIN, i64::MAX, 0, -1].into(),
            DType::U8 => vec![u8::MIN, u8::MAX, 0, 1].into(),
            DType::U16 => vec![u16::MIN, u16::MAX, 0, 1].into(),
            DType::U32 => vec![u32::MIN, u32::MAX, 0, 1].into(),
            DType::U64 => vec![u64::MIN, u64::MAX, 0, 1].into(),
            DType::F32 => vec![f32::MIN, f32::MAX, 0.0, -1.5].into(),
            DType::F64 => vec![f64::MIN, f64::MAX, -0.0, -1.5].into(),
            DType::Str => panic!("strings have no array form"),
        }
    }

    #[test]
    fn every_numeric_dtype_roundtrips() {
        for dtype in DType::NUMERIC {
            let data = extremes(dtype);
            for i in 0..data.len() {
                let value = Value::Scalar(data.get(i).unwrap());
                let back = roundtrip(&value);
                assert!(back.bit_eq(&value), "{dtype:?} scalar {value:?} came back as {back:?}");
            }

            let matrix = Value::Array(NdArray::new(vec![2, 2], data.clone()).unwrap());
            let vector = Value::Array(NdArray::from_vec(data));
            let empty = Value::Array(NdArray::new(vec![0, 3], ArrayData::from_le_bytes(dtype, &[]).unwrap()).unwrap());
            for value in [matrix, vector, empty] {
                let back = roundtrip(&value);
                assert!(back.bit_eq(&value), "{dtype:?} array {value:?} came back as {back:?}");
            }
        }
    }

    #[test]
    fn array_shapes_roundtrip() {
        let cases = vec![
            NdArray::new(vec![0], Vec::<f64>::new()).unwrap(),
            NdArray::new(vec![3, 0, 2], Vec::<i32>::new()).unwrap(),
            NdArray::new(vec![2, 3, 4], (0..24).map(|i| i as u16).collect::<Vec<_>>()).unwrap(),
            NdArray::new(vec![1, 1, 1, 1, 2], vec![true, false]).unwrap(),
        ];
        for arr in cases {
            let value = Value::Array(arr);
            let back = roundtrip(&value);
            assert!(back.bit_eq(&value), "{value:?}");
        }
    }

    proptest! {
        #[test]
        fn prop_f64_scalar_bits(x in any::<f64>()) {
            let value = Value::from(x);
            prop_assert!(roundtrip(&value).bit_eq(&value));
        }

        #[test]
        fn prop_i64_scalar(x in any::<i64>()) {
            prop_assert_eq!(roundtrip(&Value::from(x)), Value::from(x));
        }

        #[test]
        fn prop_f32_matrix(rows in 0usize..5, cols in 0usize..5, seed in any::<u32>()) {
            let data: Vec<f32> = (0..rows * cols)
                .map(|i| f32::from_bits(seed.wrapping_add(i as u32)))
                .collect();
            let value = Value::Array(NdArray::new(vec![rows, cols], data).unwrap());
            prop_assert!(roundtrip(&value).bit_eq(&value));
        }

        #[test]
        fn prop_i8_vector(data in proptest::collection::vec(any::<i8>(), 0..64)) {
            let value = Value::Array(NdArray::from_vec(data));
            prop_assert_eq!(roundtrip(&value), value);
        }
    }

    // -----------------------------------------------------------------------
    // Containers
    // -----------------------------------------------------------------------

    #[test]
    fn empty_list() {
        assert_eq!(roundtrip(&Value::List(vec![])), Value::List(vec![]));
    }

    #[test]
    fn nested_list_of_dicts_of_tuples() {
        let tuple = Value::Tuple(vec![Value::from(1i32), Value::from("x"), Value::None]);
        let dict: Fields = [("t", tuple.clone()), ("u", Value::Tuple(vec![]))]
            .into_iter()
            .collect();
        let value = Value::List(vec![Value::Dict(dict.clone()), Value::Dict(Fields::new()), Value::Dict(dict)]);
        assert_eq!(roundtrip(&value), value);
    }

    #[test]
    fn long_list_keeps_order() {
        let value = Value::List((0..1000i64).map(Value::from).collect());
        assert_eq!(roundtrip(&value), value);
    }

    #[test]
    fn list_and_tuple_stay_distinct() {
        let list = Value::List(vec![Value::from(1u8)]);
        let tuple = Value::Tuple(vec![Value::from(1u8)]);
        assert_eq!(roundtrip(&list), list);
        assert_eq!(roundtrip(&tuple), tuple);
    }

    #[test]
    fn awkward_dict_keys() {
        let dict: Fields = [
            ("", 0i32),
            ("a/b", 1),
            ("\\", 2),
            ("items", 3),
            ("class", 4),
            ("is_objarray", 5),
        ]
        .into_iter()
        .collect();
        let value = Value::Dict(dict);
        assert_eq!(roundtrip(&value), value);
    }

    // -----------------------------------------------------------------------
    // Object arrays
    // -----------------------------------------------------------------------

    #[test]
    fn objarray_roundtrip() {
        let arr = ObjArray::new(
            vec![2, 2],
            vec![
                Value::from(1i32),
                Value::from("two"),
                Value::from(3.0f64),
                Value::None,
            ],
        )
        .unwrap();
        let value = Value::ObjArray(arr);
        assert_eq!(roundtrip(&value), value);
    }

    #[test]
    fn plain_list_is_not_objarray() {
        let value = Value::List(vec![Value::from(1i32), Value::from("two")]);
        assert!(matches!(roundtrip(&value), Value::List(_)));
    }

    #[test]
    fn objarray_without_shape_is_one_dimensional() {
        let mut group = Group::root();
        group.set_attr("class", "list").unwrap();
        group.set_attr("module", "builtins").unwrap();
        group.set_attr("is_objarray", true).unwrap();
        let items = group.create_group("items").unwrap();
        for i in 0..3 {
            items
                .create_leaf(&i.to_string(), &LeafValue::Scalar(Scalar::I32(i)), &LeafOptions::default())
                .unwrap();
        }
        match decode_group(group).unwrap() {
            Value::ObjArray(a) => assert_eq!(a.shape(), &[3]),
            other => panic!("expected object array, got {other:?}"),
        }
    }

    #[test]
    fn objarray_shape_overflow_is_malformed() {
        let mut group = Group::root();
        group.set_attr("class", "list").unwrap();
        group.set_attr("module", "builtins").unwrap();
        group.set_attr("is_objarray", true).unwrap();
        group.set_attr("shape", vec![i64::MAX, 4, 0]).unwrap();
        group.create_group("items").unwrap();
        assert!(decode_group(group).unwrap_err().is_malformed());
    }

    #[test]
    fn objarray_shape_mismatch_is_malformed() {
        let mut group = Group::root();
        group.set_attr("class", "list").unwrap();
        group.set_attr("module", "builtins").unwrap();
        group.set_attr("is_objarray", true).unwrap();
        group.set_attr("shape", vec![2i64, 2]).unwrap();
        group.create_group("items").unwrap();
        assert!(decode_group(group).unwrap_err().is_malformed());
    }

    // -----------------------------------------------------------------------
    // User types
    // -----------------------------------------------------------------------

    fn kernel() -> Value {
        Instance::new(TypeName::new("mvpa.kernels.sg", "SquaredExponential"))
            .with("length_scale", 0.75f64)
            .with("kernel_matrix", NdArray::new(vec![2, 2], vec![1.0, 0.5, 0.5, 1.0f64]).unwrap())
            .with("label", "rbf")
            .into()
    }

    fn accept_instance(instance: Instance) -> TypeResult<Value> {
        Ok(Value::Instance(instance))
    }

    #[test]
    fn registered_class_roundtrip() {
        let mut reg = Registry::new();
        reg.register_class(
            TypeName::new("mvpa.kernels.sg", "SquaredExponential"),
            ClassKind::Plain,
            accept_instance,
        )
        .unwrap();
        let value = kernel();
        assert_eq!(roundtrip_with(&value, &reg).unwrap(), value);
    }

    #[test]
    fn unregistered_class_is_unresolved() {
        let err = roundtrip_with(&kernel(), &Registry::new()).unwrap_err();
        match err {
            CodecError::Unresolved { path, kind, name } => {
                assert_eq!(path, "/v");
                assert_eq!(kind, "class");
                assert_eq!(name.name, "SquaredExponential");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn mapping_class_keeps_items() {
        let name = TypeName::new("mvpa.base", "Collection");
        let mut reg = Registry::new();
        reg.register_class(name.clone(), ClassKind::Mapping, accept_instance)
            .unwrap();
        let items: Fields = [("targets", Value::from(vec![Value::from(1i32)]))]
            .into_iter()
            .collect();
        let value: Value = Instance::new(name).with("owner", "ds").with_items(items).into();
        assert_eq!(roundtrip_with(&value, &reg).unwrap(), value);
    }

    #[test]
    fn items_on_plain_class_is_malformed() {
        let name = TypeName::new("mvpa.base", "Plain");
        let mut reg = Registry::new();
        reg.register_class(name.clone(), ClassKind::Plain, accept_instance)
            .unwrap();
        let value: Value = Instance::new(name).with_items(Fields::new()).into();
        assert!(roundtrip_with(&value, &reg).unwrap_err().is_malformed());
    }

    fn projection(args: Vec<Value>) -> TypeResult<Value> {
        match args.as_slice() {
            [Value::Scalar(Scalar::Bool(demean)), Value::Array(proj)] => Ok(Instance::new(
                TypeName::new("mvpa.mappers", "ProjectionMapper"),
            )
            .with("demean", *demean)
            .with("proj", proj.clone())
            .into()),
            _ => Err(TypeError::InvalidData(format!("bad projection args: {args:?}"))),
        }
    }

    #[test]
    fn factory_roundtrip_calls_factory() {
        let name = TypeName::new("mvpa.mappers", "make_projection");
        let mut reg = Registry::new();
        reg.register_factory(name.clone(), projection).unwrap();
        let proj = NdArray::new(vec![1, 2], vec![0.5f64, -0.5]).unwrap();
        let value = Value::Reduced(Reduced::new(
            name,
            vec![Value::from(true), Value::Array(proj.clone())],
        ));
        let back = roundtrip_with(&value, &reg).unwrap();
        let inst = back.as_instance().unwrap();
        assert_eq!(inst.class.name, "ProjectionMapper");
        assert_eq!(inst.state.get("proj"), Some(&Value::Array(proj)));
    }

    #[test]
    fn factory_error_is_reconstruct() {
        let name = TypeName::new("mvpa.mappers", "make_projection");
        let mut reg = Registry::new();
        reg.register_factory(name.clone(), projection).unwrap();
        let value = Value::Reduced(Reduced::new(name, vec![]));
        let err = roundtrip_with(&value, &reg).unwrap_err();
        assert!(matches!(err, CodecError::Reconstruct { .. }));
    }

    #[test]
    fn structural_decode_builds_nothing() {
        let config = CodecConfig::default();
        let mut root = Group::root();
        let value = Value::List(vec![
            kernel(),
            Value::Reduced(Reduced::new(TypeName::new("m", "f"), vec![Value::None])),
        ]);
        encode(&mut root, &value, None, &config).unwrap();
        assert_eq!(decode_structure(&Node::Group(root), &config).unwrap(), value);
    }

    // -----------------------------------------------------------------------
    // Malformed trees
    // -----------------------------------------------------------------------

    #[test]
    fn missing_descriptor_names_node() {
        let mut root = Group::root();
        root.create_group("bad").unwrap();
        let node = root.child("bad").unwrap();
        let err = decode(node, &Registry::new(), &CodecConfig::default()).unwrap_err();
        assert!(err.is_malformed());
        assert!(err.to_string().contains("/bad"));
        assert!(err.to_string().contains("missing class/recon"));
    }

    #[test]
    fn both_strategies_rejected() {
        let mut group = Group::root();
        group.set_attr("class", "X").unwrap();
        group.set_attr("recon", "f").unwrap();
        group.set_attr("module", "m").unwrap();
        assert!(decode_group(group).unwrap_err().is_malformed());
    }

    #[test]
    fn unknown_builtin_rejected() {
        let mut group = Group::root();
        group.set_attr("class", "frozenset").unwrap();
        group.set_attr("module", "builtins").unwrap();
        let err = decode_group(group).unwrap_err();
        assert!(err.is_malformed());
        assert!(err.to_string().contains("frozenset"));
    }

    #[test]
    fn builtin_factory_unsupported() {
        let mut group = Group::root();
        group.set_attr("recon", "eval").unwrap();
        group.set_attr("module", "builtins").unwrap();
        assert!(decode_group(group).unwrap_err().is_unsupported());
    }

    #[test]
    fn state_on_factory_unsupported() {
        let mut group = Group::root();
        group.set_attr("recon", "f").unwrap();
        group.set_attr("module", "m").unwrap();
        group.create_group("rcargs").unwrap();
        group.create_group("state").unwrap();
        assert!(decode_group(group).unwrap_err().is_unsupported());
    }

    #[test]
    fn gapped_sequence_rejected() {
        let mut group = Group::root();
        group.set_attr("class", "list").unwrap();
        group.set_attr("module", "builtins").unwrap();
        let items = group.create_group("items").unwrap();
        for name in ["0", "2"] {
            items
                .create_leaf(name, &LeafValue::Scalar(Scalar::U8(1)), &LeafOptions::default())
                .unwrap();
        }
        let err = decode_group(group).unwrap_err();
        assert!(err.is_malformed());
        assert!(err.to_string().contains("index 1"));
    }

    #[test]
    fn missing_items_rejected() {
        let mut group = Group::root();
        group.set_attr("class", "dict").unwrap();
        group.set_attr("module", "builtins").unwrap();
        assert!(decode_group(group).unwrap_err().is_malformed());
    }

    #[test]
    fn decode_depth_limit() {
        let mut value = Value::None;
        for _ in 0..20 {
            value = Value::Tuple(vec![value]);
        }
        let mut root = Group::root();
        encode(&mut root, &value, None, &CodecConfig::default()).unwrap();
        let tight = CodecConfig {
            max_depth: 4,
            ..CodecConfig::default()
        };
        let err = decode(&Node::Group(root), &Registry::new(), &tight).unwrap_err();
        assert!(matches!(err, CodecError::DepthExceeded { limit: 4, .. }));
    }
}
