use anyhow::Result;
use tracing::debug;

use super::ast::Command;
use super::parser::parse_command;
use crate::catalog::Catalog;
use crate::database::Database;
use crate::predicate::Predicate;
use crate::storage::{Document, DocumentStore, check_table_name};
use crate::table::{Record, Schema, record_id};
use crate::wrappers::{Confirm, confirmed};

pub const NO_RECORDS: &str = "No records found.";
pub const CANCELLED: &str = "Operation cancelled.";

/// What a command produced, for the front end to print.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Message(String),
    Rows { schema: Schema, rows: Vec<Record> },
    Help,
    Exit,
}

/// Runs commands against an engine and a document store.
///
/// The metadata document is reloaded before every command, so edits made by another
/// process between commands are seen. Documents are written only after the engine
/// reports success. The engine, and with it the query cache, lives as long as the
/// session.
pub struct Session<S: DocumentStore> {
    db: Database,
    store: S,
}

impl<S: DocumentStore> Session<S> {
    pub fn new(store: S) -> Self {
        Self::with_database(Database::new(), store)
    }

    pub fn with_database(db: Database, store: S) -> Self {
        Self { db, store }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Parses and executes one line.
    ///
    /// # Errors
    /// Parse failures, engine errors (unknown table, bad value...) and storage
    /// failures. None of them leave a partially written document.
    pub fn execute_line(&mut self, line: &str, confirm: &mut dyn Confirm) -> Result<Outcome> {
        let command = parse_command(line)?;
        self.execute(command, confirm)
    }

    /// Executes a parsed command.
    pub fn execute(&mut self, command: Command, confirm: &mut dyn Confirm) -> Result<Outcome> {
        let catalog: Catalog = self.store.load(Document::Metadata)?;
        self.db.set_catalog(catalog);

        match command {
            Command::CreateTable { name, columns } => {
                check_table_name(&name)?;
                let summary = self.db.create_table(&name, &columns)?;
                self.store.save(Document::Metadata, self.db.catalog())?;
                Ok(message(format!(
                    "Table \"{name}\" created with columns: {summary}"
                )))
            }
            Command::ListTables => {
                let tables = self.db.list_tables();
                if tables.is_empty() {
                    return Ok(message("No tables."));
                }
                let lines: Vec<String> = tables.iter().map(|t| format!("- {t}")).collect();
                Ok(message(lines.join("\n")))
            }
            Command::DropTable { name } => {
                self.db.schema(&name)?;
                check_table_name(&name)?;
                match confirmed(confirm, "drop table", || self.drop_table(&name)) {
                    Some(result) => result,
                    None => Ok(message(CANCELLED)),
                }
            }
            Command::Insert { table, values } => {
                self.db.schema(&table)?;
                let mut records = self.load_records(&table)?;
                let id = self.db.insert(&table, &values, &mut records)?;
                self.store.save(Document::Table(&table), &records)?;
                Ok(message(format!(
                    "Record with ID={id} added to table \"{table}\"."
                )))
            }
            Command::Select {
                table,
                where_clause,
            } => {
                let schema = self.db.schema(&table)?.clone();
                let records = self.load_records(&table)?;
                let predicate = where_clause
                    .map(|text| self.db.parse_where(&table, &text))
                    .transpose()?;

                let rows = self.db.select(&records, predicate.as_ref()).to_vec();
                if rows.is_empty() {
                    return Ok(message(NO_RECORDS));
                }
                Ok(Outcome::Rows { schema, rows })
            }
            Command::Update {
                table,
                set_clause,
                where_clause,
            } => {
                let set = self.db.parse_set(&table, &set_clause)?;
                let where_ = self.db.parse_where(&table, &where_clause)?;
                let mut records = self.load_records(&table)?;

                let first = first_match(&records, &where_);
                let count = self.db.update(&mut records, &set, &where_);
                if count == 0 {
                    return Ok(message(NO_RECORDS));
                }
                self.store.save(Document::Table(&table), &records)?;

                Ok(message(match first {
                    Some(id) => format!("Record with ID={id} in table \"{table}\" updated."),
                    None => format!("Records in table \"{table}\" updated."),
                }))
            }
            Command::Delete {
                table,
                where_clause,
            } => {
                let where_ = self.db.parse_where(&table, &where_clause)?;
                let records = self.load_records(&table)?;

                match confirmed(confirm, "delete record", || {
                    self.delete_records(&table, records, &where_)
                }) {
                    Some(result) => result,
                    None => Ok(message(CANCELLED)),
                }
            }
            Command::Info { table } => {
                self.db.schema(&table)?;
                let records = self.load_records(&table)?;
                Ok(message(self.db.describe_table(&table, &records)?))
            }
            Command::Help => Ok(Outcome::Help),
            Command::Exit => Ok(Outcome::Exit),
        }
    }

    fn load_records(&self, table: &str) -> Result<Vec<Record>> {
        let records: Vec<Record> = self.store.load(Document::Table(table))?;
        debug!(table, count = records.len(), "records loaded");
        Ok(records)
    }

    fn drop_table(&mut self, name: &str) -> Result<Outcome> {
        self.db.drop_table(name)?;
        self.store.save(Document::Metadata, self.db.catalog())?;
        self.store.remove(Document::Table(name))?;
        Ok(message(format!("Table \"{name}\" dropped.")))
    }

    fn delete_records(
        &mut self,
        table: &str,
        mut records: Vec<Record>,
        where_: &Predicate,
    ) -> Result<Outcome> {
        let first = first_match(&records, where_);
        let count = self.db.delete(&mut records, where_);
        if count == 0 {
            return Ok(message(NO_RECORDS));
        }
        self.store.save(Document::Table(table), &records)?;

        Ok(message(match first {
            Some(id) => format!("Record with ID={id} deleted from table \"{table}\"."),
            None => format!("Records deleted from table \"{table}\"."),
        }))
    }
}

fn message(text: impl Into<String>) -> Outcome {
    Outcome::Message(text.into())
}

/// The first `ID` among the records matching `where_`.
fn first_match(records: &[Record], where_: &Predicate) -> Option<i64> {
    where_
        .mask(records)
        .iter_ones()
        .find_map(|idx| record_id(&records[idx]))
}
