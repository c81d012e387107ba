//! Interactive REPL (Read-Eval-Print-Loop).
//!
//! Line editing, history and keyword completion come from rustyline.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Result;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{CompletionType, EditMode, Editor, Helper};
use tracing::{debug, error, warn};

use super::formatter::{HELP, format_rows};
use super::session::{Outcome, Session};
use crate::config::Config;
use crate::storage::DocumentStore;
use crate::wrappers::{Confirm, confirm_prompt, is_affirmative};

const PROMPT: &str = "primdb> ";

const KEYWORDS: &[&str] = &[
    "create_table",
    "list_tables",
    "drop_table",
    "create",
    "list",
    "drop",
    "table",
    "tables",
    "insert",
    "into",
    "values",
    "select",
    "from",
    "where",
    "update",
    "set",
    "delete",
    "info",
    "help",
    "exit",
    "int",
    "bool",
    "str",
];

/// Completes command keywords.
struct ReplHelper;

impl Completer for ReplHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        // Find the word being typed; `name:ty` completes the type part
        let start = line[..pos]
            .rfind(|c: char| c.is_whitespace() || matches!(c, '(' | ',' | ':'))
            .map(|i| i + 1)
            .unwrap_or(0);

        let word = line[start..pos].to_lowercase();
        if word.is_empty() {
            return Ok((start, vec![]));
        }

        let matches = KEYWORDS
            .iter()
            .filter(|kw| kw.starts_with(&word))
            .map(|kw| Pair {
                display: kw.to_string(),
                replacement: kw.to_string(),
            })
            .collect();

        Ok((start, matches))
    }
}

impl Hinter for ReplHelper {
    type Hint = String;
}

impl Highlighter for ReplHelper {}

impl Validator for ReplHelper {}

impl Helper for ReplHelper {}

type LineEditor = Editor<ReplHelper, DefaultHistory>;

/// Asks through the line editor, so the answer does not end up in history.
struct EditorConfirm<'a>(&'a mut LineEditor);

impl Confirm for EditorConfirm<'_> {
    fn confirm(&mut self, action: &str) -> bool {
        match self.0.readline(&confirm_prompt(action)) {
            Ok(answer) => is_affirmative(&answer),
            Err(e) => {
                debug!("confirmation aborted: {e}");
                false
            }
        }
    }
}

/// Asks on standard input, for one-shot commands.
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&mut self, action: &str) -> bool {
        print!("{}", confirm_prompt(action));
        if io::stdout().flush().is_err() {
            return false;
        }

        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => is_affirmative(&answer),
            Err(e) => {
                warn!("failed to read confirmation: {e}");
                false
            }
        }
    }
}

/// Prints a command outcome. Returns `true` when the session should end.
pub fn print_outcome(outcome: &Outcome) -> bool {
    match outcome {
        Outcome::Message(text) => println!("{text}"),
        Outcome::Rows { schema, rows } => println!("{}", format_rows(schema, rows)),
        Outcome::Help => println!("{HELP}"),
        Outcome::Exit => return true,
    }
    false
}

/// Interactive shell over a [Session].
pub struct Repl<S: DocumentStore> {
    session: Session<S>,
    editor: LineEditor,
    history_file: Option<PathBuf>,
}

impl<S: DocumentStore> Repl<S> {
    /// Creates a REPL, loading history from the configured file if it exists.
    pub fn new(session: Session<S>, config: &Config) -> Result<Self> {
        let rl_config = rustyline::Config::builder()
            .history_ignore_space(true)
            .completion_type(CompletionType::List)
            .edit_mode(EditMode::Emacs)
            .max_history_size(config.history_size)?
            .build();

        let mut editor = LineEditor::with_config(rl_config)?;
        editor.set_helper(Some(ReplHelper));

        let history_file = config.history_path();
        if let Some(path) = history_file.as_ref().filter(|p| p.exists()) {
            if let Err(e) = editor.load_history(path) {
                warn!("could not load history from {}: {e}", path.display());
            }
        }

        Ok(Self {
            session,
            editor,
            history_file,
        })
    }

    pub fn print_banner(&self) {
        println!("primdb v{}", env!("CARGO_PKG_VERSION"));
        println!("Type help for the list of commands, exit to quit.\n");
    }

    /// Runs the main loop until `exit` or end of input.
    pub fn run(&mut self) -> Result<()> {
        loop {
            match self.editor.readline(PROMPT) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }

                    let _ = self.editor.add_history_entry(line);

                    let mut confirm = EditorConfirm(&mut self.editor);
                    match self.session.execute_line(line, &mut confirm) {
                        Ok(outcome) => {
                            if print_outcome(&outcome) {
                                break;
                            }
                        }
                        Err(e) => println!("{e}"),
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => break,
                Err(e) => {
                    error!("Readline error: {e}");
                    break;
                }
            }
        }

        self.save_history();
        Ok(())
    }

    fn save_history(&mut self) {
        let Some(path) = &self.history_file else {
            return;
        };
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Err(e) = self.editor.save_history(path) {
            warn!("could not save history to {}: {e}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete(line: &str) -> (usize, Vec<String>) {
        let history = DefaultHistory::new();
        let ctx = rustyline::Context::new(&history);
        let (start, pairs) = ReplHelper.complete(line, line.len(), &ctx).unwrap();
        (start, pairs.into_iter().map(|p| p.replacement).collect())
    }

    #[test]
    fn test_complete_command() {
        let (start, words) = complete("sel");
        assert_eq!(start, 0);
        assert_eq!(words, vec!["select"]);
    }

    #[test]
    fn test_complete_is_case_insensitive() {
        let (start, words) = complete("select FR");
        assert_eq!(start, 7);
        assert_eq!(words, vec!["from"]);
    }

    #[test]
    fn test_complete_type() {
        let (start, words) = complete("create_table users name:st");
        assert_eq!(start, 24);
        assert_eq!(words, vec!["str"]);
    }

    #[test]
    fn test_complete_empty_word() {
        assert!(complete("select ").1.is_empty());
    }

    #[test]
    fn test_print_outcome_exit() {
        assert!(print_outcome(&Outcome::Exit));
        assert!(!print_outcome(&Outcome::Message("ok".into())));
    }
}
