use std::fmt;
use std::str::FromStr;

use crate::error::StoreError;

/// How a store file is opened.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpenMode {
    /// `r`: read-only; the file must exist.
    Read,
    /// `r+`: read and write; the file must exist.
    ReadWrite,
    /// `w`: create, truncating any existing file.
    Truncate,
    /// `w-` or `x`: create; fail if the file exists.
    Exclusive,
    /// `a`: read and write, creating the file if needed.
    Append,
}

impl OpenMode {
    pub fn is_writable(&self) -> bool {
        !matches!(self, Self::Read)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "r",
            Self::ReadWrite => "r+",
            Self::Truncate => "w",
            Self::Exclusive => "w-",
            Self::Append => "a",
        }
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OpenMode {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "r" => Ok(Self::Read),
            "r+" => Ok(Self::ReadWrite),
            "w" => Ok(Self::Truncate),
            "w-" | "x" => Ok(Self::Exclusive),
            "a" => Ok(Self::Append),
            other => Err(StoreError::InvalidMode(other.to_string())),
        }
    }
}
