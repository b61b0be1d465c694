//! Explicit table of reconstructable types.
//!
//! Decoding never constructs or calls anything that is not registered
//! here. Classes (generic replay) map to a build-from-fields function;
//! factories (custom replay) map to a function of positional arguments.

use std::collections::HashMap;
use std::fmt;

use mvpa_types::{Instance, Reduced, TypeName, TypeResult, Value};
use tracing::warn;

use crate::error::{CodecError, CodecResult};

/// Builds a value from a decoded generic-replay instance.
pub type BuildFn = fn(Instance) -> TypeResult<Value>;

/// Builds a value from decoded factory arguments.
pub type FactoryFn = fn(Vec<Value>) -> TypeResult<Value>;

/// Shape of a registered class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClassKind {
    /// Attribute map only.
    Plain,
    /// Attribute map plus mapping items.
    Mapping,
}

/// How a [`Persist`] type disassembles itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Replay {
    /// Generic replay as a class of the given kind.
    Class(ClassKind),
    /// Custom replay through a factory named after the type.
    Factory,
}

/// A type that can be saved and rebuilt by the codec.
///
/// `to_value` is the disassembly: an [`Instance`] for generic replay or a
/// [`Reduced`] for custom replay, named by [`type_name`](Self::type_name).
/// `from_value` is the build-from-fields capability and receives the same
/// shape back.
pub trait Persist: Sized {
    fn type_name() -> TypeName;

    fn replay() -> Replay {
        Replay::Class(ClassKind::Plain)
    }

    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> TypeResult<Self>;
}

fn build_class<T: Persist>(instance: Instance) -> TypeResult<Value> {
    T::from_value(Value::Instance(instance)).map(|obj| obj.to_value())
}

fn build_factory<T: Persist>(args: Vec<Value>) -> TypeResult<Value> {
    T::from_value(Value::Reduced(Reduced::new(T::type_name(), args))).map(|obj| obj.to_value())
}

#[derive(Clone, Copy)]
struct ClassEntry {
    kind: ClassKind,
    build: BuildFn,
}

/// Name-to-constructor table consulted by the decoder.
#[derive(Clone, Default)]
pub struct Registry {
    classes: HashMap<TypeName, ClassEntry>,
    factories: HashMap<TypeName, FactoryFn>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut classes: Vec<_> = self.classes.keys().map(ToString::to_string).collect();
        let mut factories: Vec<_> = self.factories.keys().map(ToString::to_string).collect();
        classes.sort();
        factories.sort();
        f.debug_struct("Registry")
            .field("classes", &classes)
            .field("factories", &factories)
            .finish()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a [`Persist`] type under its own name.
    pub fn register<T: Persist>(&mut self) -> CodecResult<&mut Self> {
        match T::replay() {
            Replay::Class(kind) => self.register_class(T::type_name(), kind, build_class::<T>),
            Replay::Factory => self.register_factory(T::type_name(), build_factory::<T>),
        }
    }

    /// Register a generic-replay class.
    pub fn register_class(
        &mut self,
        name: TypeName,
        kind: ClassKind,
        build: BuildFn,
    ) -> CodecResult<&mut Self> {
        reject_builtin(&name)?;
        if self.classes.insert(name.clone(), ClassEntry { kind, build }).is_some() {
            warn!(class = %name, "replacing registered class");
        }
        Ok(self)
    }

    /// Register a custom-replay factory.
    pub fn register_factory(&mut self, name: TypeName, factory: FactoryFn) -> CodecResult<&mut Self> {
        reject_builtin(&name)?;
        if self.factories.insert(name.clone(), factory).is_some() {
            warn!(factory = %name, "replacing registered factory");
        }
        Ok(self)
    }

    pub fn class(&self, name: &TypeName) -> Option<(ClassKind, BuildFn)> {
        self.classes.get(name).map(|e| (e.kind, e.build))
    }

    pub fn factory(&self, name: &TypeName) -> Option<FactoryFn> {
        self.factories.get(name).copied()
    }

    pub fn contains_class(&self, name: &TypeName) -> bool {
        self.classes.contains_key(name)
    }

    pub fn contains_factory(&self, name: &TypeName) -> bool {
        self.factories.contains_key(name)
    }

    /// Total number of registered classes and factories.
    pub fn len(&self) -> usize {
        self.classes.len() + self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.factories.is_empty()
    }
}

fn reject_builtin(name: &TypeName) -> CodecResult<()> {
    if name.is_builtin() {
        return Err(CodecError::Registration(format!(
            "{name} is in the builtin namespace"
        )));
    }
    if name.module.is_empty() || name.name.is_empty() {
        return Err(CodecError::Registration(format!(
            "{name:?} needs both a module and a name"
        )));
    }
    Ok(())
}
