//! Parsers for the two clause shapes of the command language:
//! `col = value` (`WHERE`) and `c1 = v1, c2 = v2` (`SET`).
//!
//! Both type the literal against the table schema. A clause that cannot be fully
//! typed is rejected as a whole.

use crate::error::{DbError, DbResult};
use crate::predicate::Predicate;
use crate::table::Schema;
use crate::value::Value;

/// Parses a single `col = value` equality.
///
/// The text is split on its first `=`. The column is matched case-insensitively
/// and the returned key is the one records store it under.
///
/// # Errors
/// Returns [DbError::PredicateParse] if there is no `=`, the column is unknown,
/// or the value does not convert to the column's type.
pub fn parse_equality(text: &str, schema: &Schema) -> DbResult<(String, Value)> {
    let invalid = || DbError::PredicateParse(text.trim().to_string());

    let (column, literal) = text.split_once('=').ok_or_else(invalid)?;
    let (key, column) = schema.resolve(column).ok_or_else(invalid)?;
    let value = Value::convert(literal.trim(), column.data_type).map_err(|_| invalid())?;

    Ok((key.to_string(), value))
}

/// Parses a `WHERE` clause: exactly one equality.
///
/// # Example
/// ```
/// use primdb::{Schema, Value, parser::parse_where};
///
/// let schema = Schema::from_declarations(&["name:str", "active:bool"]).unwrap();
/// let predicate = parse_where("Active = yes", &schema).unwrap();
/// assert_eq!(predicate.canonical_key(), vec![("active".to_string(), Value::Bool(true))]);
/// ```
pub fn parse_where(text: &str, schema: &Schema) -> DbResult<Predicate> {
    if text.trim().is_empty() {
        return Err(DbError::PredicateParse(String::new()));
    }
    let (key, value) = parse_equality(text, schema)?;
    Ok(Predicate::from_iter([(key, value)]))
}

/// Parses a `SET` clause: one or more comma-separated equalities.
/// Commas inside a quoted value do not split.
///
/// # Errors
/// Fails as a whole with [DbError::PredicateParse] if any assignment fails.
pub fn parse_set(text: &str, schema: &Schema) -> DbResult<Predicate> {
    if text.trim().is_empty() {
        return Err(DbError::PredicateParse(String::new()));
    }
    split_assignments(text)
        .into_iter()
        .map(|assignment| parse_equality(assignment, schema))
        .collect()
}

/// Splits on commas that are not inside a quoted value. A quote opens a value only
/// when it directly follows `=` (spaces allowed in between).
fn split_assignments(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut quote: Option<char> = None;
    let mut prev = None;

    for (i, ch) in text.char_indices() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None if (ch == '"' || ch == '\'') && prev == Some('=') => quote = Some(ch),
            None if ch == ',' => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            None => {}
        }
        if !ch.is_whitespace() {
            prev = Some(ch);
        }
    }
    parts.push(&text[start..]);
    parts
}
