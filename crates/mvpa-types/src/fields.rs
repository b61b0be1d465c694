use std::collections::btree_map;
use std::collections::BTreeMap;

use crate::array::{NdArray, ObjArray};
use crate::error::{TypeError, TypeResult};
use crate::scalar::Scalar;
use crate::value::{Instance, Reduced, Value};

/// String-keyed value map: attribute dictionaries, dict contents and
/// mapping items.
///
/// Iteration is in key order, so encoding a `Fields` is deterministic.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Fields(BTreeMap<String, Value>);

impl Fields {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Insert a value, returning the previous one under `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.0.iter()
    }

    pub fn keys(&self) -> btree_map::Keys<'_, String, Value> {
        self.0.keys()
    }

    /// Remove and convert a required field.
    pub fn take<T: FromValue>(&mut self, key: &str) -> TypeResult<T> {
        let value = self
            .0
            .remove(key)
            .ok_or_else(|| TypeError::MissingField(key.to_string()))?;
        T::from_value(value).map_err(|e| in_field(key, e))
    }

    /// Remove and convert an optional field. A missing key and a stored
    /// `None` both yield `Ok(None)`.
    pub fn take_opt<T: FromValue>(&mut self, key: &str) -> TypeResult<Option<T>> {
        match self.0.remove(key) {
            None => Ok(None),
            Some(value) => Option::<T>::from_value(value).map_err(|e| in_field(key, e)),
        }
    }

    pub fn into_inner(self) -> BTreeMap<String, Value> {
        self.0
    }
}

fn in_field(key: &str, err: TypeError) -> TypeError {
    match err {
        TypeError::TypeMismatch { expected, actual } => TypeError::TypeMismatch {
            expected: format!("{expected} in field '{key}'"),
            actual,
        },
        other => other,
    }
}

impl From<BTreeMap<String, Value>> for Fields {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Fields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl IntoIterator for Fields {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Fields {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Typed extraction from a [`Value`].
///
/// Conversions are exact: an `I32` scalar does not convert to `i64`.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> TypeResult<Self>;
}

fn mismatch(expected: &str, value: &Value) -> TypeError {
    let actual = match value {
        Value::Scalar(s) => format!("{} scalar", s.dtype()),
        Value::Array(a) => format!("{} array", a.dtype()),
        other => other.kind().to_string(),
    };
    TypeError::TypeMismatch {
        expected: expected.to_string(),
        actual,
    }
}

macro_rules! from_scalar_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: Value) -> TypeResult<Self> {
                    match value {
                        Value::Scalar(Scalar::$variant(v)) => Ok(v),
                        other => Err(mismatch(stringify!($ty), &other)),
                    }
                }
            }
        )*
    };
}

from_scalar_value!(
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    String => Str,
);

impl FromValue for Value {
    fn from_value(value: Value) -> TypeResult<Self> {
        Ok(value)
    }
}

impl FromValue for Scalar {
    fn from_value(value: Value) -> TypeResult<Self> {
        match value {
            Value::Scalar(s) => Ok(s),
            other => Err(mismatch("scalar", &other)),
        }
    }
}

impl FromValue for NdArray {
    fn from_value(value: Value) -> TypeResult<Self> {
        match value {
            Value::Array(a) => Ok(a),
            other => Err(mismatch("array", &other)),
        }
    }
}

impl FromValue for ObjArray {
    fn from_value(value: Value) -> TypeResult<Self> {
        match value {
            Value::ObjArray(a) => Ok(a),
            other => Err(mismatch("object array", &other)),
        }
    }
}

impl FromValue for Fields {
    fn from_value(value: Value) -> TypeResult<Self> {
        match value {
            Value::Dict(d) => Ok(d),
            other => Err(mismatch("dict", &other)),
        }
    }
}

impl FromValue for Instance {
    fn from_value(value: Value) -> TypeResult<Self> {
        match value {
            Value::Instance(i) => Ok(i),
            other => Err(mismatch("instance", &other)),
        }
    }
}

impl FromValue for Reduced {
    fn from_value(value: Value) -> TypeResult<Self> {
        match value {
            Value::Reduced(r) => Ok(r),
            other => Err(mismatch("reduction", &other)),
        }
    }
}

/// Lists and tuples both convert, element by element.
impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> TypeResult<Self> {
        match value {
            Value::List(items) | Value::Tuple(items) => {
                items.into_iter().map(T::from_value).collect()
            }
            other => Err(mismatch("list or tuple", &other)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> TypeResult<Self> {
        match value {
            Value::None => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}
