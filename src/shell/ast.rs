/// A parsed command line.
///
/// Clauses and values are kept as text: the engine types them against the table
/// schema, which the front end does not know when parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CreateTable {
        name: String,
        /// `name:type` declarations as written.
        columns: Vec<String>,
    },
    ListTables,
    DropTable {
        name: String,
    },
    Insert {
        table: String,
        /// One entry per value, quotes kept.
        values: Vec<String>,
    },
    Select {
        table: String,
        where_clause: Option<String>,
    },
    Update {
        table: String,
        set_clause: String,
        where_clause: String,
    },
    Delete {
        table: String,
        where_clause: String,
    },
    Info {
        table: String,
    },
    Help,
    Exit,
}
