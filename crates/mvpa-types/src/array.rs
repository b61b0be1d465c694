use crate::error::{TypeError, TypeResult};
use crate::scalar::{DType, Scalar};
use crate::value::Value;

/// Number of elements held by an array of the given shape, or `None` if
/// the count overflows `usize`.
///
/// The empty shape describes a single element.
pub fn shape_len(shape: &[usize]) -> Option<usize> {
    shape.iter().try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
}

fn checked_len(shape: &[usize]) -> TypeResult<usize> {
    shape_len(shape).ok_or_else(|| TypeError::ShapeOverflow(shape.to_vec()))
}

/// Row-major offset of `index` within `shape`, or `None` if out of bounds.
fn row_major_offset(shape: &[usize], index: &[usize]) -> Option<usize> {
    if index.len() != shape.len() {
        return None;
    }
    let mut offset = 0;
    for (&i, &dim) in index.iter().zip(shape) {
        if i >= dim {
            return None;
        }
        offset = offset * dim + i;
    }
    Some(offset)
}

/// Typed, row-major element buffer of a numeric array.
#[derive(Clone, Debug, PartialEq)]
pub enum ArrayData {
    Bool(Vec<bool>),
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

macro_rules! with_vec {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            ArrayData::Bool($v) => $body,
            ArrayData::I8($v) => $body,
            ArrayData::I16($v) => $body,
            ArrayData::I32($v) => $body,
            ArrayData::I64($v) => $body,
            ArrayData::U8($v) => $body,
            ArrayData::U16($v) => $body,
            ArrayData::U32($v) => $body,
            ArrayData::U64($v) => $body,
            ArrayData::F32($v) => $body,
            ArrayData::F64($v) => $body,
        }
    };
}

fn encode_le<T: Copy, const N: usize>(values: &[T], to_bytes: fn(T) -> [u8; N]) -> Vec<u8> {
    values.iter().flat_map(|v| to_bytes(*v)).collect()
}

fn decode_le<T, const N: usize>(bytes: &[u8], from_bytes: fn([u8; N]) -> T) -> TypeResult<Vec<T>> {
    if bytes.len() % N != 0 {
        return Err(TypeError::InvalidData(format!(
            "{} bytes is not a multiple of the element width {N}",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(N)
        .map(|chunk| {
            let mut raw = [0u8; N];
            raw.copy_from_slice(chunk);
            from_bytes(raw)
        })
        .collect())
}

impl ArrayData {
    /// Element type of the buffer.
    pub fn dtype(&self) -> DType {
        match self {
            Self::Bool(_) => DType::Bool,
            Self::I8(_) => DType::I8,
            Self::I16(_) => DType::I16,
            Self::I32(_) => DType::I32,
            Self::I64(_) => DType::I64,
            Self::U8(_) => DType::U8,
            Self::U16(_) => DType::U16,
            Self::U32(_) => DType::U32,
            Self::U64(_) => DType::U64,
            Self::F32(_) => DType::F32,
            Self::F64(_) => DType::F64,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        with_vec!(self, v => v.len())
    }

    /// Returns `true` if the buffer holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at flat position `i`.
    pub fn get(&self, i: usize) -> Option<Scalar> {
        match self {
            Self::Bool(v) => v.get(i).copied().map(Scalar::Bool),
            Self::I8(v) => v.get(i).copied().map(Scalar::I8),
            Self::I16(v) => v.get(i).copied().map(Scalar::I16),
            Self::I32(v) => v.get(i).copied().map(Scalar::I32),
            Self::I64(v) => v.get(i).copied().map(Scalar::I64),
            Self::U8(v) => v.get(i).copied().map(Scalar::U8),
            Self::U16(v) => v.get(i).copied().map(Scalar::U16),
            Self::U32(v) => v.get(i).copied().map(Scalar::U32),
            Self::U64(v) => v.get(i).copied().map(Scalar::U64),
            Self::F32(v) => v.get(i).copied().map(Scalar::F32),
            Self::F64(v) => v.get(i).copied().map(Scalar::F64),
        }
    }

    /// Raw little-endian element bytes. Booleans take one byte each.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        match self {
            Self::Bool(v) => v.iter().map(|b| u8::from(*b)).collect(),
            Self::I8(v) => encode_le(v.as_slice(), i8::to_le_bytes),
            Self::I16(v) => encode_le(v.as_slice(), i16::to_le_bytes),
            Self::I32(v) => encode_le(v.as_slice(), i32::to_le_bytes),
            Self::I64(v) => encode_le(v.as_slice(), i64::to_le_bytes),
            Self::U8(v) => v.clone(),
            Self::U16(v) => encode_le(v.as_slice(), u16::to_le_bytes),
            Self::U32(v) => encode_le(v.as_slice(), u32::to_le_bytes),
            Self::U64(v) => encode_le(v.as_slice(), u64::to_le_bytes),
            Self::F32(v) => encode_le(v.as_slice(), f32::to_le_bytes),
            Self::F64(v) => encode_le(v.as_slice(), f64::to_le_bytes),
        }
    }

    /// Inverse of [`ArrayData::to_le_bytes`].
    pub fn from_le_bytes(dtype: DType, bytes: &[u8]) -> TypeResult<Self> {
        Ok(match dtype {
            DType::Bool => Self::Bool(
                bytes
                    .iter()
                    .map(|b| match b {
                        0 => Ok(false),
                        1 => Ok(true),
                        other => Err(TypeError::InvalidData(format!("invalid bool byte {other}"))),
                    })
                    .collect::<TypeResult<_>>()?,
            ),
            DType::I8 => Self::I8(decode_le(bytes, i8::from_le_bytes)?),
            DType::I16 => Self::I16(decode_le(bytes, i16::from_le_bytes)?),
            DType::I32 => Self::I32(decode_le(bytes, i32::from_le_bytes)?),
            DType::I64 => Self::I64(decode_le(bytes, i64::from_le_bytes)?),
            DType::U8 => Self::U8(bytes.to_vec()),
            DType::U16 => Self::U16(decode_le(bytes, u16::from_le_bytes)?),
            DType::U32 => Self::U32(decode_le(bytes, u32::from_le_bytes)?),
            DType::U64 => Self::U64(decode_le(bytes, u64::from_le_bytes)?),
            DType::F32 => Self::F32(decode_le(bytes, f32::from_le_bytes)?),
            DType::F64 => Self::F64(decode_le(bytes, f64::from_le_bytes)?),
            DType::Str => {
                return Err(TypeError::TypeMismatch {
                    expected: "numeric dtype".into(),
                    actual: dtype.to_string(),
                })
            }
        })
    }
}

macro_rules! array_data_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<Vec<$ty>> for ArrayData {
                fn from(values: Vec<$ty>) -> Self {
                    Self::$variant(values)
                }
            }
        )*
    };
}

array_data_from!(
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
);

/// An n-dimensional array with a uniform numeric element type.
#[derive(Clone, Debug, PartialEq)]
pub struct NdArray {
    shape: Vec<usize>,
    data: ArrayData,
}

impl NdArray {
    /// Create an array, checking that `data` fills `shape` exactly.
    pub fn new(shape: Vec<usize>, data: impl Into<ArrayData>) -> TypeResult<Self> {
        let data = data.into();
        let expected = checked_len(&shape)?;
        if data.len() != expected {
            return Err(TypeError::ShapeMismatch {
                shape,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    /// One-dimensional array over `data`.
    pub fn from_vec(data: impl Into<ArrayData>) -> Self {
        let data = data.into();
        Self {
            shape: vec![data.len()],
            data,
        }
    }

    /// Rebuild an array from raw little-endian bytes.
    pub fn from_le_bytes(dtype: DType, shape: Vec<usize>, bytes: &[u8]) -> TypeResult<Self> {
        Self::new(shape, ArrayData::from_le_bytes(dtype, bytes)?)
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn dtype(&self) -> DType {
        self.data.dtype()
    }

    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    pub fn into_data(self) -> ArrayData {
        self.data
    }

    /// Element at a multi-dimensional index.
    pub fn get(&self, index: &[usize]) -> Option<Scalar> {
        row_major_offset(&self.shape, index).and_then(|i| self.data.get(i))
    }

    /// Reinterpret the elements under a new shape of equal size.
    pub fn reshape(self, shape: Vec<usize>) -> TypeResult<Self> {
        Self::new(shape, self.data)
    }

    /// Same shape, same dtype and bit-identical element bytes.
    pub fn bit_eq(&self, other: &Self) -> bool {
        self.shape == other.shape
            && self.dtype() == other.dtype()
            && self.data.to_le_bytes() == other.data.to_le_bytes()
    }
}

/// A fixed-shape array whose elements are arbitrary values.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjArray {
    shape: Vec<usize>,
    elements: Vec<Value>,
}

impl ObjArray {
    /// Create an object array, checking that `elements` fills `shape`.
    pub fn new(shape: Vec<usize>, elements: Vec<Value>) -> TypeResult<Self> {
        let expected = checked_len(&shape)?;
        if elements.len() != expected {
            return Err(TypeError::ShapeMismatch {
                shape,
                expected,
                actual: elements.len(),
            });
        }
        Ok(Self { shape, elements })
    }

    /// One-dimensional object array.
    pub fn from_values(elements: Vec<Value>) -> Self {
        Self {
            shape: vec![elements.len()],
            elements,
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Elements in row-major order.
    pub fn elements(&self) -> &[Value] {
        &self.elements
    }

    pub fn into_elements(self) -> Vec<Value> {
        self.elements
    }

    pub fn get(&self, index: &[usize]) -> Option<&Value> {
        row_major_offset(&self.shape, index).and_then(|i| self.elements.get(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn new_checks_element_count() {
        let err = NdArray::new(vec![2, 3], vec![1.0f64; 5]).unwrap_err();
        assert_eq!(
            err,
            TypeError::ShapeMismatch {
                shape: vec![2, 3],
                expected: 6,
                actual: 5
            }
        );
    }

    #[test]
    fn overflowing_shape_rejected() {
        assert_eq!(shape_len(&[usize::MAX / 2, 4, 0]), None);
        assert_eq!(shape_len(&[usize::MAX, 0]), Some(0));
        assert_eq!(shape_len(&[]), Some(1));
        let err = NdArray::new(vec![usize::MAX / 2, 4, 0], Vec::<u8>::new()).unwrap_err();
        assert_eq!(err, TypeError::ShapeOverflow(vec![usize::MAX / 2, 4, 0]));
        assert!(ObjArray::new(vec![usize::MAX, 2, 0], Vec::new()).is_err());
    }

    #[test]
    fn zero_length_axes() {
        let arr = NdArray::new(vec![0, 4], Vec::<i32>::new()).unwrap();
        assert_eq!(arr.len(), 0);
        assert_eq!(arr.ndim(), 2);
        assert!(arr.is_empty());
    }

    #[test]
    fn get_is_row_major() {
        let arr = NdArray::new(vec![2, 3], vec![0u16, 1, 2, 3, 4, 5]).unwrap();
        assert_eq!(arr.get(&[1, 0]), Some(Scalar::U16(3)));
        assert_eq!(arr.get(&[0, 2]), Some(Scalar::U16(2)));
        assert_eq!(arr.get(&[2, 0]), None);
        assert_eq!(arr.get(&[0]), None);
    }

    #[test]
    fn reshape_keeps_elements() {
        let arr = NdArray::from_vec(vec![1i8, 2, 3, 4]).reshape(vec![2, 2]).unwrap();
        assert_eq!(arr.shape(), &[2, 2]);
        assert_eq!(arr.get(&[1, 1]), Some(Scalar::I8(4)));
        assert!(arr.reshape(vec![3]).is_err());
    }

    #[test]
    fn bool_bytes_are_strict() {
        let err = ArrayData::from_le_bytes(DType::Bool, &[0, 1, 2]).unwrap_err();
        assert!(matches!(err, TypeError::InvalidData(_)));
    }

    #[test]
    fn str_is_not_an_array_dtype() {
        let err = ArrayData::from_le_bytes(DType::Str, b"abc").unwrap_err();
        assert!(matches!(err, TypeError::TypeMismatch { .. }));
    }

    #[test]
    fn obj_array_shape_checked() {
        let elems = vec![Value::from(1i64), Value::from("a"), Value::None];
        assert!(ObjArray::new(vec![2, 2], elems.clone()).is_err());
        let arr = ObjArray::new(vec![3, 1], elems).unwrap();
        assert_eq!(arr.get(&[1, 0]), Some(&Value::from("a")));
    }

    #[test]
    fn nan_bit_equality() {
        let a = NdArray::from_vec(vec![f32::NAN, 1.5]);
        let b = NdArray::from_vec(vec![f32::NAN, 1.5]);
        assert!(a.bit_eq(&b));
        assert_ne!(a, b);
    }

    proptest! {
        #[test]
        fn prop_f64_bytes_roundtrip(values in proptest::collection::vec(any::<f64>(), 0..64)) {
            let data = ArrayData::F64(values);
            let back = ArrayData::from_le_bytes(DType::F64, &data.to_le_bytes()).unwrap();
            prop_assert_eq!(back.to_le_bytes(), data.to_le_bytes());
        }

        #[test]
        fn prop_i16_bytes_roundtrip(values in proptest::collection::vec(any::<i16>(), 0..64)) {
            let data = ArrayData::I16(values);
            let back = ArrayData::from_le_bytes(DType::I16, &data.to_le_bytes()).unwrap();
            prop_assert_eq!(back, data);
        }
    }
}
