use crate::array::{NdArray, ObjArray};
use crate::fields::Fields;
use crate::name::TypeName;
use crate::scalar::Scalar;

/// Generic-replay disassembly of a user type: class identity plus the
/// attribute map, and mapping items for mapping-like classes.
#[derive(Clone, Debug, PartialEq)]
pub struct Instance {
    pub class: TypeName,
    pub state: Fields,
    pub items: Option<Fields>,
}

impl Instance {
    /// An instance with no attributes and no items.
    pub fn new(class: TypeName) -> Self {
        Self {
            class,
            state: Fields::new(),
            items: None,
        }
    }

    /// Builder-style attribute assignment.
    pub fn with(mut self, attr: impl Into<String>, value: impl Into<Value>) -> Self {
        self.state.insert(attr, value);
        self
    }

    /// Attach mapping items, marking the instance as mapping-like.
    pub fn with_items(mut self, items: Fields) -> Self {
        self.items = Some(items);
        self
    }

    /// Set one attribute, returning the previous value.
    pub fn set(&mut self, attr: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.state.insert(attr, value)
    }
}

/// Custom-replay disassembly: the factory to call and its positional
/// arguments.
#[derive(Clone, Debug, PartialEq)]
pub struct Reduced {
    pub factory: TypeName,
    pub args: Vec<Value>,
}

impl Reduced {
    pub fn new(factory: TypeName, args: Vec<Value>) -> Self {
        Self { factory, args }
    }
}

/// A node of an in-memory object graph.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Value {
    #[default]
    None,
    Scalar(Scalar),
    Array(NdArray),
    ObjArray(ObjArray),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Dict(Fields),
    Instance(Instance),
    Reduced(Reduced),
}

impl Value {
    /// Short variant description used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Scalar(_) => "scalar",
            Self::Array(_) => "array",
            Self::ObjArray(_) => "object array",
            Self::List(_) => "list",
            Self::Tuple(_) => "tuple",
            Self::Dict(_) => "dict",
            Self::Instance(_) => "instance",
            Self::Reduced(_) => "reduction",
        }
    }

    /// Returns `true` for values that are stored as a single leaf.
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Scalar(_) | Self::Array(_))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&NdArray> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Self::Instance(i) => Some(i),
            _ => None,
        }
    }

    /// Structural equality that compares floating point data by bit pattern.
    pub fn bit_eq(&self, other: &Self) -> bool {
        fn all(a: &[Value], b: &[Value]) -> bool {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.bit_eq(y))
        }
        fn fields(a: &Fields, b: &Fields) -> bool {
            a.len() == b.len()
                && a.iter()
                    .zip(b.iter())
                    .all(|((ka, va), (kb, vb))| ka == kb && va.bit_eq(vb))
        }
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Scalar(a), Self::Scalar(b)) => a.bit_eq(b),
            (Self::Array(a), Self::Array(b)) => a.bit_eq(b),
            (Self::ObjArray(a), Self::ObjArray(b)) => {
                a.shape() == b.shape() && all(a.elements(), b.elements())
            }
            (Self::List(a), Self::List(b)) | (Self::Tuple(a), Self::Tuple(b)) => all(a, b),
            (Self::Dict(a), Self::Dict(b)) => fields(a, b),
            (Self::Instance(a), Self::Instance(b)) => {
                a.class == b.class
                    && fields(&a.state, &b.state)
                    && match (&a.items, &b.items) {
                        (Some(x), Some(y)) => fields(x, y),
                        (None, None) => true,
                        _ => false,
                    }
            }
            (Self::Reduced(a), Self::Reduced(b)) => a.factory == b.factory && all(&a.args, &b.args),
            _ => false,
        }
    }
}

macro_rules! value_from_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Self::Scalar(Scalar::from(value))
                }
            }
        )*
    };
}

value_from_scalar!(bool, i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, String, &str);

impl From<Scalar> for Value {
    fn from(value: Scalar) -> Self {
        Self::Scalar(value)
    }
}

impl From<NdArray> for Value {
    fn from(value: NdArray) -> Self {
        Self::Array(value)
    }
}

impl From<ObjArray> for Value {
    fn from(value: ObjArray) -> Self {
        Self::ObjArray(value)
    }
}

impl From<Instance> for Value {
    fn from(value: Instance) -> Self {
        Self::Instance(value)
    }
}

impl From<Reduced> for Value {
    fn from(value: Reduced) -> Self {
        Self::Reduced(value)
    }
}

impl From<Fields> for Value {
    fn from(value: Fields) -> Self {
        Self::Dict(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Self::List(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::None, Into::into)
    }
}
