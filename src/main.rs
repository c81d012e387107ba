//! primdb command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Start the interactive shell in the current directory
//! primdb
//!
//! # Run one command against another data directory
//! primdb --data-dir /tmp/db -c "select from users"
//!
//! # Destructive one-shot command without the prompt
//! primdb -y -c "drop_table users"
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use primdb::Config;
use primdb::Database;
use primdb::shell::{Repl, Session, StdinConfirm, print_outcome};
use primdb::storage::JsonStore;
use primdb::wrappers::{AutoConfirm, Confirm};

/// A tiny JSON-backed table store with an interactive shell.
#[derive(Parser, Debug)]
#[command(name = "primdb", version, about)]
struct Args {
    /// Directory holding the metadata file and the table documents
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Configuration file path
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Execute a single command and exit
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Answer yes to confirmation prompts
    #[arg(short = 'y', long)]
    yes: bool,

    /// Disable the query cache
    #[arg(long)]
    no_cache: bool,

    /// Enable verbose output
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let args = Args::parse();

    init_logging(args.verbose);

    let config = load_config(&args)?;
    debug!(?config, "configuration loaded");

    let db = Database::new().with_query_cache(config.query_cache);
    let session = Session::with_database(db, JsonStore::from_config(&config));

    match &args.command {
        Some(line) => {
            let mut confirm: Box<dyn Confirm> = if args.yes {
                Box::new(AutoConfirm(true))
            } else {
                Box::new(StdinConfirm)
            };
            execute_command(session, line, confirm.as_mut())
        }
        None => {
            let mut repl = Repl::new(session, &config)?;
            repl.print_banner();
            repl.run()?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("primdb=debug")
        } else {
            EnvFilter::new("primdb=info")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load_default()?,
    };

    // Override with command line arguments
    if let Some(dir) = &args.data_dir {
        config.data_dir = dir.clone();
    }
    if args.no_cache {
        config.query_cache = false;
    }

    Ok(config)
}

fn execute_command(
    mut session: Session<JsonStore>,
    line: &str,
    confirm: &mut dyn Confirm,
) -> Result<ExitCode> {
    match session.execute_line(line, confirm) {
        Ok(outcome) => {
            print_outcome(&outcome);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            println!("{e}");
            Ok(ExitCode::FAILURE)
        }
    }
}
