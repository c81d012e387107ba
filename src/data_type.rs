use std::fmt;
use std::str::FromStr;

use crate::error::DbError;

/// Represents the supported data types in a table schema.
/// These types define the structure of columns and the expected format of values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// A 64-bit signed integer.
    Int,
    /// A boolean value (true or false).
    Bool,
    /// A UTF-8 character string.
    Str,
}

impl DataType {
    /// The lower-case token used in column declarations and in the metadata document.
    pub fn as_str(self) -> &'static str {
        match self {
            DataType::Int => "int",
            DataType::Bool => "bool",
            DataType::Str => "str",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a type token. Surrounding whitespace and letter case are ignored.
impl FromStr for DataType {
    type Err = DbError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token.trim().to_lowercase().as_str() {
            "int" => Ok(DataType::Int),
            "bool" => Ok(DataType::Bool),
            "str" => Ok(DataType::Str),
            _ => Err(DbError::UnsupportedType(token.to_string())),
        }
    }
}
