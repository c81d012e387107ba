use thiserror::Error;
use tracing::debug;

use super::ast::Command;
use super::tokenizer::{Spanned, Token, Tokenizer};

/// Why a command line was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// The line does not have the shape of its command.
    #[error("Invalid value: {0}. Try again.")]
    Malformed(String),

    /// The first word is not a known command.
    #[error("Unknown command \"{0}\". Try again.")]
    Unknown(String),
}

/// Tokenizes and parses one command line.
///
/// # Errors
/// [CommandError::Unknown] for an unknown verb, [CommandError::Malformed] otherwise.
///
/// # Example
/// ```
/// use primdb::shell::{Command, parse_command};
///
/// let command = parse_command("select from users where name = 'Bob'").unwrap();
/// assert_eq!(
///     command,
///     Command::Select {
///         table: "users".into(),
///         where_clause: Some("name = 'Bob'".into()),
///     }
/// );
/// ```
pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let malformed = |reason: String| {
        debug!(line, reason = %reason, "rejected command line");
        CommandError::Malformed(line.trim().to_string())
    };

    let tokens = Tokenizer::new(line).tokenize_spanned().map_err(malformed)?;
    let mut parser = Parser::new(line, tokens);

    match parser.parse() {
        Ok(command) => Ok(command),
        Err(ParseFailure::Unknown(verb)) => Err(CommandError::Unknown(verb)),
        Err(ParseFailure::Malformed(reason)) => Err(malformed(reason)),
    }
}

enum ParseFailure {
    Unknown(String),
    Malformed(String),
}

impl From<String> for ParseFailure {
    fn from(reason: String) -> Self {
        ParseFailure::Malformed(reason)
    }
}

struct Parser {
    source: Vec<char>,
    tokens: Vec<Spanned>,
    position: usize,
}

impl Parser {
    fn new(line: &str, tokens: Vec<Spanned>) -> Self {
        Self {
            source: line.chars().collect(),
            tokens,
            position: 0,
        }
    }

    fn parse(&mut self) -> Result<Command, ParseFailure> {
        let verb = match self.current_token() {
            Token::Word(word) => word.to_lowercase(),
            other => return Err(format!("Unexpected token: {other:?}").into()),
        };
        self.advance();

        let command = match verb.as_str() {
            "create_table" => self.parse_create_table()?,
            "create" => {
                self.consume_keyword("table")?;
                self.parse_create_table()?
            }
            "list_tables" => Command::ListTables,
            "list" => {
                self.consume_keyword("tables")?;
                Command::ListTables
            }
            "drop_table" => Command::DropTable {
                name: self.consume_ident()?,
            },
            "drop" => {
                self.consume_keyword("table")?;
                Command::DropTable {
                    name: self.consume_ident()?,
                }
            }
            "insert" => self.parse_insert()?,
            "select" => self.parse_select()?,
            "update" => self.parse_update()?,
            "delete" => self.parse_delete()?,
            "info" => Command::Info {
                table: self.consume_ident()?,
            },
            "help" => Command::Help,
            "exit" | "quit" => Command::Exit,
            _ => return Err(ParseFailure::Unknown(verb)),
        };

        // Check we are at the end of the command
        if !self.is_at_end() {
            return Err(format!(
                "Unexpected token after command: {:?}",
                self.current_token()
            )
            .into());
        }

        Ok(command)
    }

    //helpers
    fn current_token(&self) -> &Token {
        &self.tokens[self.position].token
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current_token(), Token::Eof)
    }

    fn consume_keyword(&mut self, keyword: &str) -> Result<(), String> {
        if self.current_token().is_keyword(keyword) {
            self.advance();
            Ok(())
        } else {
            Err(format!(
                "Expected {keyword:?}, found {:?}",
                self.current_token()
            ))
        }
    }

    fn consume_ident(&mut self) -> Result<String, String> {
        match self.current_token() {
            Token::Word(string) => {
                let string = string.clone();
                self.advance();
                Ok(string)
            }
            _ => Err(format!(
                "Expected identifier, found {:?}",
                self.current_token()
            )),
        }
    }

    /// The input text from token `from` up to (not including) token `to`, as typed.
    fn source_text(&self, from: usize, to: usize) -> String {
        if from >= to {
            return String::new();
        }
        let start = self.tokens[from].span.start;
        let end = self.tokens[to - 1].span.end;
        self.source[start..end].iter().collect()
    }

    /// Skips tokens up to (not including) the first word equal to `stop`, or to the
    /// end of the line, and returns their text as typed.
    fn clause_until(&mut self, stop: Option<&str>) -> String {
        let start = self.position;
        while !self.is_at_end() && !stop.is_some_and(|kw| self.current_token().is_keyword(kw)) {
            self.advance();
        }
        self.source_text(start, self.position)
    }

    fn parse_create_table(&mut self) -> Result<Command, String> {
        let name = self.consume_ident()?;
        let mut columns = vec![];
        while let Token::Word(column) = self.current_token() {
            columns.push(column.clone());
            self.advance();
        }
        if columns.is_empty() {
            return Err("Expected at least one column".into());
        }
        Ok(Command::CreateTable { name, columns })
    }

    /// `insert into <table> values (v1, v2, ...)`; the parentheses are optional.
    fn parse_insert(&mut self) -> Result<Command, String> {
        self.consume_keyword("into")?;
        let table = self.consume_ident()?;
        self.consume_keyword("values")?;

        let parenthesized = matches!(self.current_token(), Token::LeftParen);
        if parenthesized {
            self.advance();
        }

        let mut values = vec![];
        let mut value_start = self.position;
        loop {
            match self.current_token() {
                Token::RightParen if parenthesized => break,
                Token::Eof if !parenthesized => break,
                Token::Eof => return Err("Expected ')'".into()),
                Token::Comma => {
                    values.push(self.source_text(value_start, self.position));
                    self.advance();
                    value_start = self.position;
                }
                _ => self.advance(),
            }
        }
        if self.position > value_start || !values.is_empty() {
            values.push(self.source_text(value_start, self.position));
        }
        if parenthesized {
            self.advance();
        }

        Ok(Command::Insert { table, values })
    }

    /// `select from <table> [where <col> = <value>]`
    fn parse_select(&mut self) -> Result<Command, String> {
        self.consume_keyword("from")?;
        let table = self.consume_ident()?;

        let where_clause = if self.current_token().is_keyword("where") {
            self.advance();
            Some(self.clause_until(None))
        } else {
            None
        };

        Ok(Command::Select {
            table,
            where_clause,
        })
    }

    /// `update <table> set <c1> = <v1>[, ...] where <col> = <value>`
    fn parse_update(&mut self) -> Result<Command, String> {
        let table = self.consume_ident()?;
        self.consume_keyword("set")?;
        let set_clause = self.clause_until(Some("where"));
        self.consume_keyword("where")?;
        let where_clause = self.clause_until(None);

        Ok(Command::Update {
            table,
            set_clause,
            where_clause,
        })
    }

    /// `delete from <table> where <col> = <value>`
    fn parse_delete(&mut self) -> Result<Command, String> {
        self.consume_keyword("from")?;
        let table = self.consume_ident()?;
        self.consume_keyword("where")?;
        let where_clause = self.clause_until(None);

        Ok(Command::Delete {
            table,
            where_clause,
        })
    }
}
