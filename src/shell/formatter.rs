//! Output formatting for command results.

use comfy_table::{Cell, ContentArrangement, Table};

use crate::table::{Record, Schema};

pub const HELP: &str = "\
***Operations on data***
Commands:
<command> create_table <table> <column1:type> <column2:type> .. - create a table
<command> list_tables - list all tables
<command> drop_table <table> - drop a table
<command> insert into <table> values (<value1>, <value2>, ...) - add a record
<command> select from <table> where <column> = <value> - read matching records
<command> select from <table> - read all records
<command> update <table> set <column1> = <new_value1> where <column> = <value> - update records
<command> delete from <table> where <column> = <value> - delete records
<command> info <table> - show table information
<command> exit - leave the program
<command> help - show this help

Types: int, bool, str. Every table gets an ID:int column.";

/// Formats records as a table, columns in schema order.
///
/// Fields a record lacks are left blank.
pub fn format_rows(schema: &Schema, rows: &[Record]) -> String {
    let mut table = Table::new();

    table
        .set_content_arrangement(ContentArrangement::Dynamic)
        .load_preset(comfy_table::presets::UTF8_FULL)
        .apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);

    table.set_header(schema.names().into_iter().map(Cell::new));

    let keys = schema.record_keys();
    for row in rows {
        let cells: Vec<Cell> = keys
            .iter()
            .map(|key| row.get(*key).map(ToString::to_string).unwrap_or_default())
            .map(Cell::new)
            .collect();
        table.add_row(cells);
    }

    table.to_string()
}
