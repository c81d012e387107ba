//! Persistence of the metadata document and of per-table record documents.
//!
//! A missing document loads as its empty value (`{}` for metadata, `[]` for a
//! table); only unreadable or malformed documents are errors.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed document {key}: {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid table name: {0:?}")]
    InvalidTableName(String),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Checks that a table name can name its document: not empty, not `.` or `..`, and
/// without path separators.
///
/// # Errors
/// [StorageError::InvalidTableName] when the name breaks the rule.
pub fn check_table_name(name: &str) -> StorageResult<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(StorageError::InvalidTableName(name.to_string()));
    }
    Ok(())
}

/// The two document namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Document<'a> {
    /// The schemas of all tables.
    Metadata,
    /// The records of one table.
    Table(&'a str),
}

impl Document<'_> {
    fn key(&self) -> String {
        match self {
            Document::Metadata => "metadata".to_string(),
            Document::Table(name) => format!("table:{name}"),
        }
    }
}

/// Whole-document load/save.
pub trait DocumentStore {
    /// Loads a document, or its default value if it does not exist.
    fn load<T: DeserializeOwned + Default>(&self, doc: Document<'_>) -> StorageResult<T>;

    /// Replaces a document.
    fn save<T: Serialize>(&mut self, doc: Document<'_>, value: &T) -> StorageResult<()>;

    /// Deletes a document. Deleting a missing document is not an error.
    fn remove(&mut self, doc: Document<'_>) -> StorageResult<()>;
}

/// Documents as pretty-printed UTF-8 JSON files.
///
/// The metadata lives in one file; each table in `<tables_dir>/<table>.json`.
#[derive(Debug, Clone)]
pub struct JsonStore {
    metadata_path: PathBuf,
    tables_dir: PathBuf,
}

impl JsonStore {
    pub fn new(metadata_path: impl Into<PathBuf>, tables_dir: impl Into<PathBuf>) -> Self {
        Self {
            metadata_path: metadata_path.into(),
            tables_dir: tables_dir.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.metadata_path(), config.tables_path())
    }

    fn path(&self, doc: Document<'_>) -> StorageResult<PathBuf> {
        match doc {
            Document::Metadata => Ok(self.metadata_path.clone()),
            Document::Table(name) => {
                check_table_name(name)?;
                Ok(self.tables_dir.join(format!("{name}.json")))
            }
        }
    }
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl DocumentStore for JsonStore {
    fn load<T: DeserializeOwned + Default>(&self, doc: Document<'_>) -> StorageResult<T> {
        let path = self.path(doc)?;
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "document missing, using empty value");
                return Ok(T::default());
            }
            Err(e) => return Err(io_error(&path)(e)),
        };

        debug!(path = %path.display(), bytes = content.len(), "document loaded");
        serde_json::from_str(&content).map_err(|source| StorageError::Json {
            key: doc.key(),
            source,
        })
    }

    /// Writes and syncs a sibling temporary file, then renames it over the target, so
    /// the document is either fully replaced or left untouched.
    fn save<T: Serialize>(&mut self, doc: Document<'_>, value: &T) -> StorageResult<()> {
        let path = self.path(doc)?;
        let content = serde_json::to_string_pretty(value).map_err(|source| StorageError::Json {
            key: doc.key(),
            source,
        })?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_error(parent))?;
        }

        let tmp = path.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp).map_err(io_error(&tmp))?;
        file.write_all(content.as_bytes()).map_err(io_error(&tmp))?;
        file.sync_all().map_err(io_error(&tmp))?;
        drop(file);
        fs::rename(&tmp, &path).map_err(io_error(&path))?;

        debug!(path = %path.display(), "document saved");
        Ok(())
    }

    fn remove(&mut self, doc: Document<'_>) -> StorageResult<()> {
        let path = self.path(doc)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "document removed");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(&path)(e)),
        }
    }
}

/// Documents kept in memory as JSON values. Nothing survives the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    documents: HashMap<String, serde_json::Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, doc: Document<'_>) -> bool {
        self.documents.contains_key(&doc.key())
    }
}

impl DocumentStore for MemoryStore {
    fn load<T: DeserializeOwned + Default>(&self, doc: Document<'_>) -> StorageResult<T> {
        match self.documents.get(&doc.key()) {
            Some(value) => serde_json::from_value(value.clone()).map_err(|source| StorageError::Json {
                key: doc.key(),
                source,
            }),
            None => Ok(T::default()),
        }
    }

    fn save<T: Serialize>(&mut self, doc: Document<'_>, value: &T) -> StorageResult<()> {
        let value = serde_json::to_value(value).map_err(|source| StorageError::Json {
            key: doc.key(),
            source,
        })?;
        self.documents.insert(doc.key(), value);
        Ok(())
    }

    fn remove(&mut self, doc: Document<'_>) -> StorageResult<()> {
        self.documents.remove(&doc.key());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::table::Record;
    use crate::value::Value;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> JsonStore {
        JsonStore::new(dir.path().join("db_meta.json"), dir.path().join("data"))
    }

    #[test]
    fn test_missing_documents_load_empty() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let catalog: Catalog = store.load(Document::Metadata).unwrap();
        assert!(catalog.is_empty());

        let records: Vec<Record> = store.load(Document::Table("users")).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_save_creates_directories_and_loads_back() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&dir);

        let records = vec![Record::from([
            ("ID".to_string(), Value::Int(1)),
            ("name".to_string(), Value::from("Zoë")),
            ("age".to_string(), Value::Int(30)),
        ])];
        store.save(Document::Table("users"), &records).unwrap();

        let path = dir.path().join("data").join("users.json");
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"Zoë\""));
        assert!(content.contains('\n'));
        // fields are written in record order, not sorted
        assert!(content.find("\"name\"").unwrap() < content.find("\"age\"").unwrap());
        assert!(!dir.path().join("data").join("users.json.tmp").exists());

        let back: Vec<Record> = store.load(Document::Table("users")).unwrap();
        assert_eq!(back, records);
    }

    #[test]
    fn test_reads_metadata_document() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("db_meta.json"),
            r#"{"users": ["ID:int", "name:str"]}"#,
        )
        .unwrap();

        let catalog: Catalog = store(&dir).load(Document::Metadata).unwrap();
        assert_eq!(catalog.list_tables(), vec!["users"]);
    }

    #[test]
    fn test_malformed_document() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("db_meta.json"), "{not json").unwrap();

        let err = store(&dir).load::<Catalog>(Document::Metadata).unwrap_err();
        assert!(matches!(err, StorageError::Json { .. }));
    }

    #[test]
    fn test_remove() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&dir);

        store.save(Document::Table("users"), &Vec::<Record>::new()).unwrap();
        store.remove(Document::Table("users")).unwrap();
        assert!(!dir.path().join("data").join("users.json").exists());

        // missing is fine
        store.remove(Document::Table("users")).unwrap();
    }

    #[test]
    fn test_rejects_path_like_table_names() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        for name in ["../x", "a/b", "..", ""] {
            assert!(matches!(
                store.load::<Vec<Record>>(Document::Table(name)),
                Err(StorageError::InvalidTableName(_))
            ));
        }
    }

    #[test]
    fn test_check_table_name() {
        assert!(check_table_name("users").is_ok());
        assert!(check_table_name("my.table").is_ok());
        for name in ["a/b", "a\\b", ".", "..", ""] {
            assert!(matches!(
                check_table_name(name),
                Err(StorageError::InvalidTableName(n)) if n == name
            ));
        }
    }

    #[test]
    fn test_save_replaces_existing_document() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&dir);

        let first = vec![Record::from([("ID".to_string(), Value::Int(1))])];
        store.save(Document::Table("t"), &first).unwrap();
        store.save(Document::Table("t"), &Vec::<Record>::new()).unwrap();

        let back: Vec<Record> = store.load(Document::Table("t")).unwrap();
        assert!(back.is_empty());
        assert!(!dir.path().join("data").join("t.json.tmp").exists());
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryStore::new();
        let records: Vec<Record> = store.load(Document::Table("t")).unwrap();
        assert!(records.is_empty());

        let records = vec![Record::from([("ID".to_string(), Value::Int(1))])];
        store.save(Document::Table("t"), &records).unwrap();
        assert!(store.contains(Document::Table("t")));
        assert_eq!(store.load::<Vec<Record>>(Document::Table("t")).unwrap(), records);

        store.remove(Document::Table("t")).unwrap();
        assert!(!store.contains(Document::Table("t")));
    }
}
