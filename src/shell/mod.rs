//! The command-line front end: command parsing, execution against a document store,
//! and the interactive shell.

pub mod ast;
pub mod formatter;
pub mod parser;
pub mod repl;
pub mod session;
pub mod tokenizer;

pub use ast::Command;
pub use parser::{CommandError, parse_command};
pub use repl::{Repl, StdinConfirm, print_outcome};
pub use session::{Outcome, Session};
