use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::data_type::DataType;
use crate::error::{DbError, DbResult};

/// Represents a single data value stored in a record.
///
/// Values serialize as plain JSON scalars (`1`, `true`, `"Alice"`), which is the
/// format of the table documents on disk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// A 64-bit signed integer value.
    Int(i64),
    /// A boolean value.
    Bool(bool),
    /// A UTF-8 string value, wrapped in an [Arc] for cheap cloning into cached result sets.
    Str(Arc<str>),
}

impl Value {
    /// Converts user text into a value of the given type.
    ///
    /// One matching pair of surrounding `"` or `'` is stripped first, for every type.
    ///
    /// - `int`: a base-10 integer.
    /// - `bool`: `true`/`1`/`yes` or `false`/`0`/`no`, in any letter case.
    /// - `str`: the text left after unquoting, verbatim. Unquoted text is taken as-is.
    ///
    /// # Errors
    /// Returns [DbError::Conversion] if the text cannot be read as `data_type`.
    ///
    /// # Example
    /// ```
    /// use primdb::{DataType, Value};
    ///
    /// assert_eq!(Value::convert("42", DataType::Int), Ok(Value::Int(42)));
    /// assert_eq!(Value::convert("Yes", DataType::Bool), Ok(Value::Bool(true)));
    /// assert_eq!(Value::convert("'Alice'", DataType::Str), Ok(Value::Str("Alice".into())));
    /// assert_eq!(Value::convert("'30'", DataType::Int), Ok(Value::Int(30)));
    /// ```
    pub fn convert(text: &str, data_type: DataType) -> DbResult<Value> {
        let invalid = || DbError::Conversion {
            value: text.to_string(),
            expected: data_type.to_string(),
        };

        let literal = unquote(text);
        match data_type {
            DataType::Int => literal.trim().parse::<i64>().map(Value::Int).map_err(|_| invalid()),
            DataType::Bool => match literal.to_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(Value::Bool(true)),
                "false" | "0" | "no" => Ok(Value::Bool(false)),
                _ => Err(invalid()),
            },
            DataType::Str => Ok(Value::Str(literal.into())),
        }
    }

    /// Same as [Value::convert], but takes the type as its textual token.
    ///
    /// # Errors
    /// Returns [DbError::UnsupportedType] for an unknown token, otherwise the
    /// errors of [Value::convert].
    pub fn convert_token(text: &str, type_token: &str) -> DbResult<Value> {
        Value::convert(text, type_token.parse()?)
    }

    /// Returns the inner integer value if this is a [Value::Int].
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the inner boolean value if this is a [Value::Bool].
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns a reference to the inner string slice if this is a [Value::Str].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the [DataType] corresponding to this value.
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Int(_) => DataType::Int,
            Self::Bool(_) => DataType::Bool,
            Self::Str(_) => DataType::Str,
        }
    }
}

/// Textual rendering used in result sets. Feeding it back to [Value::convert]
/// with the same type gives an equal value.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.into())
    }
}

/// Strips a single matching pair of double or single quotes.
fn unquote(text: &str) -> &str {
    for quote in ['"', '\''] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            return &text[1..text.len() - 1];
        }
    }
    text
}
