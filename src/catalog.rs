use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{DbError, DbResult};
use crate::table::{Record, Schema};

/// Table name to schema. This is the metadata document.
///
/// Serializes as `{"users": ["ID:int", "name:str"]}`. Tables keep their creation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    tables: IndexMap<String, Schema>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new table and returns the resulting schema.
    ///
    /// # Errors
    /// - [DbError::AlreadyExists] if the name is taken.
    /// - [DbError::MalformedColumn] if a declaration does not parse.
    pub fn create_table<S: AsRef<str>>(&mut self, name: &str, columns: &[S]) -> DbResult<&Schema> {
        if self.tables.contains_key(name) {
            return Err(DbError::AlreadyExists(name.to_string()));
        }
        let schema = Schema::from_declarations(columns)?;
        Ok(self.tables.entry(name.to_string()).or_insert(schema))
    }

    /// Removes a table from the catalog.
    ///
    /// # Errors
    /// Returns [DbError::NotFound] if the table does not exist.
    pub fn drop_table(&mut self, name: &str) -> DbResult<Schema> {
        self.tables
            .shift_remove(name)
            .ok_or_else(|| DbError::NotFound(name.to_string()))
    }

    /// Returns the names of all registered tables.
    pub fn list_tables(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    /// Looks up a table schema.
    ///
    /// # Errors
    /// Returns [DbError::NotFound] if the table does not exist.
    pub fn schema(&self, name: &str) -> DbResult<&Schema> {
        self.tables
            .get(name)
            .ok_or_else(|| DbError::NotFound(name.to_string()))
    }

    /// Multi-line summary of a table: name, columns, record count.
    ///
    /// # Errors
    /// Returns [DbError::NotFound] if the table does not exist.
    pub fn describe_table(&self, name: &str, records: &[Record]) -> DbResult<String> {
        let schema = self.schema(name)?;
        Ok(format!(
            "Table: {name}\nColumns: {}\nRecord count: {}",
            schema.summary(),
            records.len()
        ))
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
