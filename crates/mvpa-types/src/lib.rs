//! Object model for the MVPA object store.
//!
//! Everything the codec can persist is expressed as a [`Value`] tree. A value
//! is either directly storable (a [`Scalar`] or a numeric [`NdArray`]), one
//! of the builtin containers (`None`, list, tuple, dict), a heterogeneous
//! [`ObjArray`], or the disassembled form of a user type:
//!
//! - [`Instance`] -- class identity plus an attribute map (generic replay)
//! - [`Reduced`] -- factory identity plus positional arguments (custom replay)
//!
//! Values own their children, so an object graph built from them is always a
//! tree. There is no way to express a cycle.
//!
//! # Key Types
//!
//! - [`DType`] -- element type of leaves and arrays
//! - [`TypeName`] -- fully-qualified `module.name` identity
//! - [`Fields`] -- attribute map with typed accessors
//! - [`FromValue`] -- typed extraction used by build-from-fields code

pub mod array;
pub mod error;
pub mod fields;
pub mod name;
pub mod scalar;
pub mod value;

pub use array::{shape_len, ArrayData, NdArray, ObjArray};
pub use error::{TypeError, TypeResult};
pub use fields::{Fields, FromValue};
pub use name::{TypeName, BUILTINS};
pub use scalar::{DType, Scalar};
pub use value::{Instance, Reduced, Value};
