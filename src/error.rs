use thiserror::Error;

/// Failures reported by the table engine.
///
/// Every variant is a caller mistake or a catalog conflict; none of them is fatal.
/// The `Display` output is the message shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DbError {
    /// A table with this name is already registered.
    #[error("Table \"{0}\" already exists.")]
    AlreadyExists(String),

    /// The table is not registered in the catalog.
    #[error("Table \"{0}\" does not exist.")]
    NotFound(String),

    /// A column entry lacks the `:` separator or names an unsupported type.
    #[error("Invalid value: {0}. Try again.")]
    MalformedColumn(String),

    /// `insert` received the wrong number of values.
    #[error("Wrong number of values. Expected {expected}, got {actual}.")]
    ArityMismatch { expected: usize, actual: usize },

    /// The text cannot be read as a value of the target type.
    #[error("Invalid value: {value}. Expected {expected}.")]
    Conversion { value: String, expected: String },

    /// The type token is not one of `int`, `bool`, `str`.
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    /// The largest `ID` in the table is already `i64::MAX`.
    #[error("Cannot assign an ID after {0}.")]
    IdOverflow(i64),

    /// A `WHERE` or `SET` clause could not be typed against the schema.
    #[error("Invalid clause: {0}. Try again.")]
    PredicateParse(String),
}

pub type DbResult<T> = std::result::Result<T, DbError>;
