use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::data_type::DataType;
use crate::error::{DbError, DbResult};
use crate::value::Value;

/// Key under which every record stores its identity, whatever the declared spelling.
pub const IDENTITY_KEY: &str = "ID";

/// A row of a table: column name to value, in the order the fields were written.
pub type Record = IndexMap<String, Value>;

/// Returns the identity of a record, if it carries an integer one.
pub fn record_id(record: &Record) -> Option<i64> {
    record.get(IDENTITY_KEY).and_then(Value::as_int)
}

/// Column definition in the schema.
///
/// Serialized as its `name:type` declaration, e.g. `"age:int"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ColumnDef {
    pub name: String,
    pub data_type: DataType,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }

    /// Parses a `name:type` declaration. Only the first `:` separates the two parts.
    ///
    /// # Errors
    /// Returns [DbError::MalformedColumn] naming the whole entry if the separator is
    /// missing or the type is not supported.
    pub fn parse(entry: &str) -> DbResult<Self> {
        let malformed = || DbError::MalformedColumn(entry.to_string());
        let (name, type_token) = entry.split_once(':').ok_or_else(malformed)?;
        let data_type = type_token.parse().map_err(|_| malformed())?;
        Ok(Self::new(name.trim(), data_type))
    }

    /// The identity column is spelled `ID` or `id`.
    pub fn is_identity(&self) -> bool {
        self.name == "ID" || self.name == "id"
    }
}

impl fmt::Display for ColumnDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.data_type)
    }
}

impl TryFrom<String> for ColumnDef {
    type Error = DbError;

    fn try_from(entry: String) -> Result<Self, Self::Error> {
        Self::parse(&entry)
    }
}

impl From<ColumnDef> for String {
    fn from(column: ColumnDef) -> Self {
        column.to_string()
    }
}

/// The ordered columns of a table. The identity column is always first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    pub columns: Vec<ColumnDef>,
}

impl Schema {
    /// Builds a schema from raw `name:type` declarations.
    ///
    /// A declared identity column is moved to the front with its type kept as
    /// written; otherwise `ID:int` is prepended. Duplicate names are kept.
    ///
    /// # Errors
    /// Returns [DbError::MalformedColumn] for the first entry that does not parse.
    ///
    /// # Example
    /// ```
    /// use primdb::Schema;
    ///
    /// let schema = Schema::from_declarations(&["name:str", "active:bool"]).unwrap();
    /// assert_eq!(schema.summary(), "ID:int, name:str, active:bool");
    /// ```
    pub fn from_declarations<S: AsRef<str>>(entries: &[S]) -> DbResult<Self> {
        let mut columns = entries
            .iter()
            .map(|entry| ColumnDef::parse(entry.as_ref()))
            .collect::<DbResult<Vec<_>>>()?;

        match columns.iter().position(ColumnDef::is_identity) {
            Some(idx) => {
                let identity = columns.remove(idx);
                columns.insert(0, identity);
            }
            None => columns.insert(0, ColumnDef::new(IDENTITY_KEY, DataType::Int)),
        }

        Ok(Self { columns })
    }

    /// Columns filled by the caller on insert, in declaration order.
    pub fn data_columns(&self) -> &[ColumnDef] {
        self.columns.get(1..).unwrap_or_default()
    }

    /// Case-insensitive column lookup. Returns the record key the column is stored
    /// under along with its definition.
    pub fn resolve(&self, name: &str) -> Option<(&str, &ColumnDef)> {
        let name = name.trim();
        self.columns
            .iter()
            .enumerate()
            .find(|(_, col)| col.name.to_lowercase() == name.to_lowercase())
            .map(|(idx, col)| {
                let key = if idx == 0 { IDENTITY_KEY } else { col.name.as_str() };
                (key, col)
            })
    }

    /// Column names in schema order.
    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|col| col.name.as_str()).collect()
    }

    /// Keys the columns are stored under in a record, in schema order.
    pub fn record_keys(&self) -> Vec<&str> {
        self.columns
            .iter()
            .enumerate()
            .map(|(idx, col)| if idx == 0 { IDENTITY_KEY } else { col.name.as_str() })
            .collect()
    }

    /// `ID:int, name:str, ...`
    pub fn summary(&self) -> String {
        self.columns
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}
