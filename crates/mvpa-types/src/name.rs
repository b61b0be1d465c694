use std::fmt;

use serde::{Deserialize, Serialize};

/// Module name of the built-in namespace.
///
/// Types and factories declared here are handled intrinsically by the codec
/// and can never be registered or called by name.
pub const BUILTINS: &str = "builtins";

/// Fully-qualified identity of a class or factory: `module` plus `name`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeName {
    pub module: String,
    pub name: String,
}

impl TypeName {
    /// Create a name from its module and item parts.
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            name: name.into(),
        }
    }

    /// A name in the built-in namespace.
    pub fn builtin(name: impl Into<String>) -> Self {
        Self::new(BUILTINS, name)
    }

    /// Returns `true` if this name lives in the built-in namespace.
    pub fn is_builtin(&self) -> bool {
        self.module == BUILTINS
    }

    /// Parse a dotted path, splitting on the last `.`.
    ///
    /// Returns `None` when either part would be empty.
    pub fn parse(qualified: &str) -> Option<Self> {
        let (module, name) = qualified.rsplit_once('.')?;
        if module.is_empty() || name.is_empty() {
            return None;
        }
        Some(Self::new(module, name))
    }
}

impl fmt::Debug for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeName({self})")
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.name)
    }
}
