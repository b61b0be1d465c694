use std::fmt;

use serde::{Deserialize, Serialize};

use crate::array::ArrayData;
use crate::error::{TypeError, TypeResult};

/// Element type of a stored leaf or numeric array.
///
/// `Str` only appears on zero-dimensional leaves; arrays of strings are
/// object arrays and go through [`ObjArray`](crate::ObjArray).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Str,
}

impl DType {
    /// Every element type that can back an [`NdArray`](crate::NdArray).
    pub const NUMERIC: [DType; 11] = [
        DType::Bool,
        DType::I8,
        DType::I16,
        DType::I32,
        DType::I64,
        DType::U8,
        DType::U16,
        DType::U32,
        DType::U64,
        DType::F32,
        DType::F64,
    ];

    /// Width of one element in bytes. `None` for variable-width strings.
    pub fn item_size(&self) -> Option<usize> {
        match self {
            Self::Bool | Self::I8 | Self::U8 => Some(1),
            Self::I16 | Self::U16 => Some(2),
            Self::I32 | Self::U32 | Self::F32 => Some(4),
            Self::I64 | Self::U64 | Self::F64 => Some(8),
            Self::Str => None,
        }
    }

    /// Returns `true` for every type except `Str`.
    pub fn is_numeric(&self) -> bool {
        !matches!(self, Self::Str)
    }

    /// Canonical lower-case name (`"int16"`, `"float64"`, ...).
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I8 => "int8",
            Self::I16 => "int16",
            Self::I32 => "int32",
            Self::I64 => "int64",
            Self::U8 => "uint8",
            Self::U16 => "uint16",
            Self::U32 => "uint32",
            Self::U64 => "uint64",
            Self::F32 => "float32",
            Self::F64 => "float64",
            Self::Str => "str",
        }
    }

    /// Inverse of [`DType::name`].
    pub fn from_name(name: &str) -> Option<Self> {
        Self::NUMERIC
            .iter()
            .chain(std::iter::once(&Self::Str))
            .find(|dtype| dtype.name() == name)
            .copied()
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single storable value.
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Str(String),
}

impl Scalar {
    /// The element type this scalar is stored as.
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
            Self::Str(_) => DType::Str,
        }
    }

    /// Little-endian storage bytes (UTF-8 for strings).
    pub fn to_le_bytes(&self) -> Vec<u8> {
        match self {
            Self::Bool(v) => vec![u8::from(*v)],
            Self::I8(v) => v.to_le_bytes().to_vec(),
            Self::I16(v) => v.to_le_bytes().to_vec(),
            Self::I32(v) => v.to_le_bytes().to_vec(),
            Self::I64(v) => v.to_le_bytes().to_vec(),
            Self::U8(v) => v.to_le_bytes().to_vec(),
            Self::U16(v) => v.to_le_bytes().to_vec(),
            Self::U32(v) => v.to_le_bytes().to_vec(),
            Self::U64(v) => v.to_le_bytes().to_vec(),
            Self::F32(v) => v.to_le_bytes().to_vec(),
            Self::F64(v) => v.to_le_bytes().to_vec(),
            Self::Str(s) => s.as_bytes().to_vec(),
        }
    }

    /// Rebuild a scalar from its storage bytes.
    pub fn from_le_bytes(dtype: DType, bytes: &[u8]) -> TypeResult<Self> {
        if dtype == DType::Str {
            return String::from_utf8(bytes.to_vec())
                .map(Self::Str)
                .map_err(|e| TypeError::InvalidData(e.to_string()));
        }
        let data = ArrayData::from_le_bytes(dtype, bytes)?;
        if data.len() != 1 {
            return Err(TypeError::ShapeMismatch {
                shape: Vec::new(),
                expected: 1,
                actual: data.len(),
            });
        }
        data.get(0)
            .ok_or_else(|| TypeError::InvalidData("empty scalar payload".into()))
    }

    /// Equality that compares floats by bit pattern, so `NaN` equals itself
    /// and `0.0` differs from `-0.0`.
    pub fn bit_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::F32(a), Self::F32(b)) => a.to_bits() == b.to_bits(),
            (Self::F64(a), Self::F64(b)) => a.to_bits() == b.to_bits(),
            _ => self == other,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::I8(v) => write!(f, "{v}"),
            Self::I16(v) => write!(f, "{v}"),
            Self::I32(v) => write!(f, "{v}"),
            Self::I64(v) => write!(f, "{v}"),
            Self::U8(v) => write!(f, "{v}"),
            Self::U16(v) => write!(f, "{v}"),
            Self::U32(v) => write!(f, "{v}"),
            Self::U64(v) => write!(f, "{v}"),
            Self::F32(v) => write!(f, "{v}"),
            Self::F64(v) => write!(f, "{v}"),
            Self::Str(s) => write!(f, "{s:?}"),
        }
    }
}

macro_rules! scalar_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Scalar {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}

scalar_from!(
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

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dtype_names_roundtrip() {
        for dtype in DType::NUMERIC.iter().chain(std::iter::once(&DType::Str)) {
            assert_eq!(DType::from_name(dtype.name()), Some(*dtype));
        }
        assert_eq!(DType::from_name("object"), None);
    }

    #[test]
    fn item_sizes() {
        assert_eq!(DType::Bool.item_size(), Some(1));
        assert_eq!(DType::U16.item_size(), Some(2));
        assert_eq!(DType::F32.item_size(), Some(4));
        assert_eq!(DType::I64.item_size(), Some(8));
        assert_eq!(DType::Str.item_size(), None);
    }

    #[test]
    fn string_bytes_are_utf8() {
        let s = Scalar::from("weiß");
        let bytes = s.to_le_bytes();
        assert_eq!(Scalar::from_le_bytes(DType::Str, &bytes).unwrap(), s);
    }

    #[test]
    fn invalid_utf8_rejected() {
        let err = Scalar::from_le_bytes(DType::Str, &[0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, TypeError::InvalidData(_)));
    }

    #[test]
    fn wrong_width_rejected() {
        let err = Scalar::from_le_bytes(DType::I32, &[1, 2, 3]).unwrap_err();
        assert!(matches!(err, TypeError::InvalidData(_)));
    }

    #[test]
    fn bit_eq_distinguishes_signed_zero() {
        assert!(!Scalar::F64(0.0).bit_eq(&Scalar::F64(-0.0)));
        assert!(Scalar::F64(f64::NAN).bit_eq(&Scalar::F64(f64::NAN)));
        assert_eq!(Scalar::F64(0.0), Scalar::F64(-0.0));
    }

    #[test]
    fn display() {
        assert_eq!(Scalar::I16(-7).to_string(), "-7");
        assert_eq!(Scalar::from("x").to_string(), "\"x\"");
    }
}
