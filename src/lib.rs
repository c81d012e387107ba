pub mod cache;
pub mod catalog;
pub mod config;
pub mod data_type;
pub mod database;
pub mod error;
pub mod parser;
pub mod predicate;
pub mod shell;
pub mod storage;
pub mod table;
pub mod value;
pub mod wrappers;

pub use catalog::Catalog;
pub use config::Config;
pub use data_type::DataType;
pub use database::{Database, Selection};
pub use error::{DbError, DbResult};
pub use predicate::Predicate;
pub use table::{ColumnDef, Record, Schema};
pub use value::Value;
