use std::ops::Deref;
use std::sync::Arc;

use tracing::debug;

use crate::{
    cache::{CacheStats, QueryCache},
    catalog::Catalog,
    error::{DbError, DbResult},
    parser,
    predicate::Predicate,
    table::{IDENTITY_KEY, Record, Schema, record_id},
    value::Value,
    wrappers::timed,
};

/// The table engine.
///
/// It owns the schema catalog and the query cache. Record sets are not stored here:
/// the caller loads a table's records, passes them to an operation, and persists the
/// result itself when the operation succeeded. No operation writes anything to disk.
pub struct Database {
    /// Table name to schema.
    catalog: Catalog,
    /// Built on the first predicated `select`, then kept for the life of the engine.
    cache: Option<QueryCache>,
    /// When `false`, predicated selects scan the records every time.
    cache_enabled: bool,
}

impl Default for Database {
    fn default() -> Self {
        Self {
            catalog: Catalog::default(),
            cache: None,
            cache_enabled: true,
        }
    }
}

/// Rows returned by [Database::select].
#[derive(Debug, Clone)]
pub enum Selection<'a> {
    /// The caller's own record list, for an unconditional select.
    Live(&'a [Record]),
    /// A list owned by the query cache.
    Cached(Arc<Vec<Record>>),
    /// A freshly filtered list, when the cache is disabled.
    Scanned(Vec<Record>),
}

impl Deref for Selection<'_> {
    type Target = [Record];

    fn deref(&self) -> &[Record] {
        match self {
            Selection::Live(rows) => rows,
            Selection::Cached(rows) => rows,
            Selection::Scanned(rows) => rows,
        }
    }
}

impl Database {
    /// Creates an engine with an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine over an existing catalog, e.g. one loaded from the metadata document.
    pub fn with_catalog(catalog: Catalog) -> Self {
        Self {
            catalog,
            ..Self::default()
        }
    }

    /// Enables or disables the query cache.
    pub fn with_query_cache(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    /// Replaces the catalog. The query cache is kept.
    pub fn set_catalog(&mut self, catalog: Catalog) {
        self.catalog = catalog;
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Looks up a table schema.
    ///
    /// # Errors
    /// Returns [DbError::NotFound] if the table does not exist.
    pub fn schema(&self, table: &str) -> DbResult<&Schema> {
        self.catalog.schema(table)
    }

    /// Creates a new table from `name:type` declarations and returns its column summary.
    ///
    /// # Errors
    /// - [DbError::AlreadyExists] if the table exists.
    /// - [DbError::MalformedColumn] if a declaration lacks `:` or names an unsupported type.
    ///
    /// # Example
    /// ```
    /// use primdb::Database;
    ///
    /// let mut db = Database::new();
    /// let summary = db.create_table("users", &["name:str", "active:bool"]).unwrap();
    /// assert_eq!(summary, "ID:int, name:str, active:bool");
    /// ```
    pub fn create_table<S: AsRef<str>>(&mut self, name: &str, columns: &[S]) -> DbResult<String> {
        let schema = self.catalog.create_table(name, columns)?;
        debug!(table = name, columns = %schema.summary(), "table created");
        Ok(schema.summary())
    }

    /// Removes a table from the catalog. Callers must have obtained confirmation.
    ///
    /// # Errors
    /// Returns [DbError::NotFound] if the table does not exist.
    pub fn drop_table(&mut self, name: &str) -> DbResult<()> {
        self.catalog.drop_table(name)?;
        debug!(table = name, "table dropped");
        Ok(())
    }

    /// Returns the names of all tables.
    pub fn list_tables(&self) -> Vec<&str> {
        self.catalog.list_tables()
    }

    /// Summarizes a table's columns and record count.
    ///
    /// # Errors
    /// Returns [DbError::NotFound] if the table does not exist.
    pub fn describe_table(&self, name: &str, records: &[Record]) -> DbResult<String> {
        self.catalog.describe_table(name, records)
    }

    /// Parses a `WHERE` clause against a table's schema.
    ///
    /// # Errors
    /// [DbError::NotFound] for an unknown table, [DbError::PredicateParse] otherwise.
    pub fn parse_where(&self, table: &str, text: &str) -> DbResult<Predicate> {
        parser::parse_where(text, self.schema(table)?)
    }

    /// Parses a `SET` clause against a table's schema.
    ///
    /// # Errors
    /// [DbError::NotFound] for an unknown table, [DbError::PredicateParse] otherwise.
    pub fn parse_set(&self, table: &str, text: &str) -> DbResult<Predicate> {
        parser::parse_set(text, self.schema(table)?)
    }

    /// Appends a new record built from textual values and returns its `ID`.
    ///
    /// Values map to the non-identity columns in schema order. The new `ID` is one
    /// more than the largest `ID` currently present in `records` (1 for an empty
    /// table); it is recomputed from the records on every call.
    ///
    /// # Errors
    /// - [DbError::NotFound] if the table does not exist.
    /// - [DbError::ArityMismatch] if the number of values is wrong.
    /// - [DbError::Conversion] if a value does not convert; nothing is appended.
    /// - [DbError::IdOverflow] if the largest `ID` is `i64::MAX`.
    pub fn insert<S: AsRef<str>>(
        &self,
        table: &str,
        values: &[S],
        records: &mut Vec<Record>,
    ) -> DbResult<i64> {
        timed("insert", || {
            let schema = self.schema(table)?;
            let columns = schema.data_columns();

            if values.len() != columns.len() {
                return Err(DbError::ArityMismatch {
                    expected: columns.len(),
                    actual: values.len(),
                });
            }

            let converted = columns
                .iter()
                .zip(values)
                .map(|(col, text)| Value::convert(text.as_ref(), col.data_type))
                .collect::<DbResult<Vec<_>>>()?;

            let max_id = records.iter().filter_map(record_id).max().unwrap_or(0);
            let new_id = max_id.checked_add(1).ok_or(DbError::IdOverflow(max_id))?;

            let mut record = Record::new();
            record.insert(IDENTITY_KEY.to_string(), Value::Int(new_id));
            for (col, value) in columns.iter().zip(converted) {
                record.insert(col.name.clone(), value);
            }
            records.push(record);

            debug!(table, id = new_id, "record inserted");
            Ok(new_id)
        })
    }

    /// Returns the records matching `predicate`, in their original order.
    ///
    /// Without a predicate the caller's list is returned as-is. With one, the result
    /// goes through the query cache (see [crate::cache]): a predicate seen before
    /// returns the rows computed the first time, even if `records` changed since.
    pub fn select<'a>(
        &mut self,
        records: &'a [Record],
        predicate: Option<&Predicate>,
    ) -> Selection<'a> {
        timed("select", || {
            let Some(predicate) = predicate else {
                return Selection::Live(records);
            };

            let scan = || {
                records
                    .iter()
                    .filter(|record| predicate.matches(record))
                    .cloned()
                    .collect::<Vec<_>>()
            };

            if !self.cache_enabled {
                return Selection::Scanned(scan());
            }

            let cache = self.cache.get_or_insert_with(QueryCache::new);
            Selection::Cached(cache.memoize(predicate.canonical_key(), scan))
        })
    }

    /// Writes every `set` entry into each record matching `where_clause` and returns
    /// the number of matched records.
    ///
    /// Values in `set` are written as given; they are expected to come from
    /// [Database::parse_set], which already typed them against the schema.
    pub fn update(&self, records: &mut [Record], set: &Predicate, where_clause: &Predicate) -> usize {
        let mask = where_clause.mask(records);

        for idx in mask.iter_ones() {
            let record = &mut records[idx];
            for (col, value) in set.iter() {
                record.insert(col.to_string(), value.clone());
            }
        }

        mask.count_ones()
    }

    /// Removes the records matching `where_clause`, keeping the others in order, and
    /// returns how many were removed. Callers must have obtained confirmation.
    pub fn delete(&self, records: &mut Vec<Record>, where_clause: &Predicate) -> usize {
        let mask = where_clause.mask(records);
        let removed = mask.count_ones();

        let mut idx = 0;
        records.retain(|_| {
            let keep = !mask[idx];
            idx += 1;
            keep
        });

        removed
    }

    /// Counters of the query cache, if it has been built.
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(QueryCache::stats)
    }

    /// Empties the query cache.
    pub fn clear_cache(&mut self) {
        if let Some(cache) = self.cache.as_mut() {
            cache.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_type::DataType;

    fn users_db() -> Database {
        let mut db = Database::new();
        db.create_table("users", &["name:str", "active:bool"])
            .unwrap();
        db
    }

    fn where_(db: &Database, text: &str) -> Predicate {
        db.parse_where("users", text).unwrap()
    }

    #[test]
    fn test_create_and_drop_table() {
        let mut db = Database::new();

        assert!(db.create_table("users", &["name:str"]).is_ok());
        assert!(db.schema("users").is_ok());

        assert!(db.drop_table("users").is_ok());
        assert!(db.schema("users").is_err());
    }

    #[test]
    fn test_duplicate_table_error() {
        let mut db = users_db();
        let err = db.create_table("users", &["age:int"]);
        assert_eq!(err, Err(DbError::AlreadyExists("users".into())));
    }

    #[test]
    fn test_drop_nonexistent_table() {
        let mut db = Database::new();
        assert_eq!(db.drop_table("unknown"), Err(DbError::NotFound("unknown".into())));
    }

    #[test]
    fn test_list_tables() {
        let mut db = Database::new();
        assert!(db.list_tables().is_empty());

        db.create_table("users", &["name:str"]).unwrap();
        db.create_table("posts", &["title:str"]).unwrap();

        assert_eq!(db.list_tables(), vec!["users", "posts"]);
    }

    #[test]
    fn test_declared_identity_schema() {
        let mut db = Database::new();
        let summary = db.create_table("t", &["a:int", "ID:int"]).unwrap();
        assert_eq!(summary, "ID:int, a:int");
    }

    #[test]
    fn test_insert_assigns_ids() {
        let db = users_db();
        let mut records = vec![];

        assert_eq!(db.insert("users", &["Alice", "yes"], &mut records), Ok(1));
        assert_eq!(db.insert("users", &["Bob", "0"], &mut records), Ok(2));

        assert_eq!(
            records[0],
            Record::from([
                ("ID".to_string(), Value::Int(1)),
                ("name".to_string(), Value::from("Alice")),
                ("active".to_string(), Value::Bool(true)),
            ])
        );
        assert_eq!(records[1]["active"], Value::Bool(false));
    }

    #[test]
    fn test_insert_id_follows_current_max() {
        let db = users_db();
        let mut records = vec![];
        for name in ["a", "b", "c"] {
            db.insert("users", &[name, "yes"], &mut records).unwrap();
        }

        // removing the highest ID lets it be issued again
        records.pop();
        assert_eq!(db.insert("users", &["d", "no"], &mut records), Ok(3));

        // hand-edited IDs: the next one is max + 1, whatever was issued before
        records[0].insert("ID".into(), Value::Int(10));
        assert_eq!(db.insert("users", &["e", "no"], &mut records), Ok(11));
    }

    #[test]
    fn test_insert_after_largest_id_fails() {
        let db = users_db();
        let mut records = vec![Record::from([
            ("ID".to_string(), Value::Int(i64::MAX)),
            ("name".to_string(), Value::from("last")),
            ("active".to_string(), Value::Bool(true)),
        ])];

        assert_eq!(
            db.insert("users", &["Alice", "yes"], &mut records),
            Err(DbError::IdOverflow(i64::MAX))
        );
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_insert_record_fields_in_schema_order() {
        let db = users_db();
        let mut records = vec![];
        db.insert("users", &["Alice", "yes"], &mut records).unwrap();

        let keys: Vec<&str> = records[0].keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["ID", "name", "active"]);
    }

    #[test]
    fn test_insert_arity_mismatch() {
        let db = users_db();
        let mut records = vec![];

        assert_eq!(
            db.insert("users", &["Alice"], &mut records),
            Err(DbError::ArityMismatch {
                expected: 2,
                actual: 1
            })
        );
        assert!(db.insert("users", &["Alice", "yes", "x"], &mut records).is_err());
        assert!(records.is_empty());
    }

    #[test]
    fn test_insert_conversion_error_inserts_nothing() {
        let db = users_db();
        let mut records = vec![];

        let err = db.insert("users", &["Alice", "maybe"], &mut records);
        assert!(matches!(err, Err(DbError::Conversion { .. })));
        assert!(records.is_empty());
    }

    #[test]
    fn test_insert_unknown_table() {
        let db = Database::new();
        let mut records = vec![];
        assert_eq!(
            db.insert("ghost", &["x"], &mut records),
            Err(DbError::NotFound("ghost".into()))
        );
    }

    #[test]
    fn test_insert_with_declared_identity() {
        let mut db = Database::new();
        db.create_table("t", &["name:str", "id:int"]).unwrap();
        let mut records = vec![];

        db.insert("t", &["x"], &mut records).unwrap();
        assert_eq!(records[0]["ID"], Value::Int(1));
        assert!(!records[0].contains_key("id"));
    }

    #[test]
    fn test_select_without_predicate_is_live() {
        let mut db = users_db();
        let mut records = vec![];
        db.insert("users", &["Alice", "yes"], &mut records).unwrap();

        let rows = db.select(&records, None);
        assert!(matches!(rows, Selection::Live(_)));
        assert_eq!(&*rows, records.as_slice());
        assert!(db.cache_stats().is_none());
    }

    #[test]
    fn test_select_with_predicate() {
        let mut db = users_db();
        let mut records = vec![];
        db.insert("users", &["Alice", "yes"], &mut records).unwrap();
        db.insert("users", &["Bob", "no"], &mut records).unwrap();
        db.insert("users", &["Carol", "true"], &mut records).unwrap();

        let p = where_(&db, "active = true");
        let rows = db.select(&records, Some(&p));
        let ids: Vec<_> = rows.iter().filter_map(record_id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_select_cache_is_stale_after_mutation() {
        let mut db = users_db();
        let mut records = vec![];
        db.insert("users", &["Alice", "yes"], &mut records).unwrap();

        let p = where_(&db, "active = yes");
        let Selection::Cached(first) = db.select(&records, Some(&p)) else {
            panic!("expected cached rows");
        };

        db.insert("users", &["Bob", "yes"], &mut records).unwrap();

        let Selection::Cached(second) = db.select(&records, Some(&p)) else {
            panic!("expected cached rows");
        };
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.len(), 1);
        assert_eq!(db.cache_stats(), Some(CacheStats { hits: 1, misses: 1 }));
    }

    #[test]
    fn test_select_cache_is_shared_across_tables() {
        let mut db = Database::new();
        db.create_table("a", &["n:int"]).unwrap();
        db.create_table("b", &["n:int"]).unwrap();

        let mut a = vec![];
        let mut b = vec![];
        db.insert("a", &["1"], &mut a).unwrap();
        db.insert("b", &["1"], &mut b).unwrap();
        db.insert("b", &["1"], &mut b).unwrap();

        let p = db.parse_where("a", "n = 1").unwrap();
        assert_eq!(db.select(&a, Some(&p)).len(), 1);
        // same canonical key on another table returns table a's rows
        assert_eq!(db.select(&b, Some(&p)).len(), 1);
    }

    #[test]
    fn test_select_without_cache_scans() {
        let mut db = users_db().with_query_cache(false);
        let mut records = vec![];
        db.insert("users", &["Alice", "yes"], &mut records).unwrap();

        let p = where_(&db, "active = yes");
        assert_eq!(db.select(&records, Some(&p)).len(), 1);

        db.insert("users", &["Bob", "yes"], &mut records).unwrap();
        let rows = db.select(&records, Some(&p));
        assert!(matches!(rows, Selection::Scanned(_)));
        assert_eq!(rows.len(), 2);
        assert!(db.cache_stats().is_none());
    }

    #[test]
    fn test_clear_cache_refreshes() {
        let mut db = users_db();
        let mut records = vec![];
        db.insert("users", &["Alice", "yes"], &mut records).unwrap();

        let p = where_(&db, "active = yes");
        db.select(&records, Some(&p));
        db.insert("users", &["Bob", "yes"], &mut records).unwrap();

        db.clear_cache();
        assert_eq!(db.select(&records, Some(&p)).len(), 2);
    }

    #[test]
    fn test_update_single_column() {
        let db = users_db();
        let mut records = vec![];
        db.insert("users", &["Alice", "yes"], &mut records).unwrap();
        db.insert("users", &["Bob", "yes"], &mut records).unwrap();

        let set = db.parse_set("users", "active = no").unwrap();
        let count = db.update(&mut records, &set, &where_(&db, "ID = 1"));

        assert_eq!(count, 1);
        assert_eq!(records[0]["active"], Value::Bool(false));
        assert_eq!(records[1]["active"], Value::Bool(true));
    }

    #[test]
    fn test_update_multiple_columns() {
        let db = users_db();
        let mut records = vec![];
        db.insert("users", &["Alice", "yes"], &mut records).unwrap();

        let set = db.parse_set("users", "name = 'Alicia', active = 0").unwrap();
        assert_eq!(db.update(&mut records, &set, &where_(&db, "name = Alice")), 1);
        assert_eq!(records[0]["name"], Value::from("Alicia"));
        assert_eq!(records[0]["active"], Value::Bool(false));
    }

    #[test]
    fn test_update_no_rows_matched() {
        let db = users_db();
        let mut records = vec![];
        db.insert("users", &["Alice", "yes"], &mut records).unwrap();
        let before = records.clone();

        let set = db.parse_set("users", "active = no").unwrap();
        assert_eq!(db.update(&mut records, &set, &where_(&db, "ID = 99")), 0);
        assert_eq!(records, before);
    }

    #[test]
    fn test_update_does_not_revalidate_types() {
        let db = users_db();
        let mut records = vec![];
        db.insert("users", &["Alice", "yes"], &mut records).unwrap();

        let set = Predicate::from_iter([("active", Value::from("not a bool")), ("extra", Value::Int(1))]);
        assert_eq!(db.update(&mut records, &set, &where_(&db, "ID = 1")), 1);
        assert_eq!(records[0]["active"].data_type(), DataType::Str);
        assert_eq!(records[0]["extra"], Value::Int(1));
    }

    #[test]
    fn test_delete_then_delete_again() {
        let db = users_db();
        let mut records = vec![];
        db.insert("users", &["Alice", "no"], &mut records).unwrap();
        db.insert("users", &["Bob", "yes"], &mut records).unwrap();
        db.insert("users", &["Carol", "no"], &mut records).unwrap();

        let p = where_(&db, "active = no");
        assert_eq!(db.delete(&mut records, &p), 2);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["name"], Value::from("Bob"));

        assert_eq!(db.delete(&mut records, &p), 0);
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_delete_keeps_order() {
        let db = users_db();
        let mut records = vec![];
        for name in ["a", "b", "c", "d"] {
            db.insert("users", &[name, "no"], &mut records).unwrap();
        }

        db.delete(&mut records, &where_(&db, "name = b"));
        let ids: Vec<_> = records.iter().filter_map(record_id).collect();
        assert_eq!(ids, vec![1, 3, 4]);
    }

    #[test]
    fn test_users_scenario() {
        let mut db = Database::new();
        assert_eq!(
            db.create_table("users", &["name:str", "active:bool"]),
            Ok("ID:int, name:str, active:bool".to_string())
        );

        let mut records = vec![];
        assert_eq!(db.insert("users", &["Alice", "yes"], &mut records), Ok(1));
        assert_eq!(db.insert("users", &["Bob", "0"], &mut records), Ok(2));

        let active = where_(&db, "active = true");
        let rows = db.select(&records, Some(&active));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["ID"], Value::Int(1));

        let set = db.parse_set("users", "active = false").unwrap();
        assert_eq!(db.update(&mut records, &set, &where_(&db, "ID = 1")), 1);
        assert_eq!(records[0]["active"], Value::Bool(false));

        assert_eq!(db.delete(&mut records, &where_(&db, "active = false")), 2);
        assert!(records.is_empty());
    }

    #[test]
    fn test_describe_table() {
        let db = users_db();
        let mut records = vec![];
        db.insert("users", &["Alice", "yes"], &mut records).unwrap();

        assert_eq!(
            db.describe_table("users", &records).unwrap(),
            "Table: users\nColumns: ID:int, name:str, active:bool\nRecord count: 1"
        );
        assert!(db.describe_table("ghost", &records).is_err());
    }
}
