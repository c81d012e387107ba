use std::collections::BTreeMap;

use bitvec::prelude::*;

use crate::table::Record;
use crate::value::Value;

/// A conjunction of `column = value` pairs.
///
/// Used both as a filter (`WHERE`) and as a list of assignments (`SET`).
/// Entries are kept sorted by column name, so iteration order is already the
/// canonical order used as a cache key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Predicate {
    entries: BTreeMap<String, Value>,
}

/// Canonical form of a predicate: its entries sorted by column name.
pub type CanonicalKey = Vec<(String, Value)>;

impl Predicate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a constraint. A later entry for the same column replaces the earlier one.
    pub fn insert(&mut self, column: impl Into<String>, value: Value) {
        self.entries.insert(column.into(), value);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(col, value)| (col.as_str(), value))
    }

    /// True if the record holds every column of the predicate with an equal value.
    /// Values of different types never compare equal.
    pub fn matches(&self, record: &Record) -> bool {
        self.entries
            .iter()
            .all(|(col, value)| record.get(col) == Some(value))
    }

    /// One bit per record, set where the record matches.
    pub fn mask(&self, records: &[Record]) -> BitVec {
        records.iter().map(|record| self.matches(record)).collect()
    }

    /// Entries sorted by column name, independent of the order they were written in.
    pub fn canonical_key(&self) -> CanonicalKey {
        self.entries
            .iter()
            .map(|(col, value)| (col.clone(), value.clone()))
            .collect()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Predicate {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut predicate = Predicate::new();
        for (col, value) in iter {
            predicate.insert(col, value);
        }
        predicate
    }
}
