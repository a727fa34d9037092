//! CLI for the Echo test harness
//!
//! ## Usage
//!
//! - `echo-harness` — run the conventional test files plus `tests/*.echo`
//! - `echo-harness a.echo b.echo` — run an explicit file list
//! - `--rust` — also run the REPL's own Rust unit-test suite
//! - `--testing` — use an ephemeral temporary state directory
//! - `--no-cleanup` — keep the state directory for debugging
//! - `--db-prefix <PREFIX>` — override the state-directory name prefix
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros. Command
//! functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod runner;

use std::fmt;
use std::path::PathBuf;
use std::process;

use clap::Parser;

use crate::session::{DEFAULT_DB_PREFIX, StateDir};
use crate::subject::ReplSubject;
use self::runner::{ConsoleReporter, Harness};

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    /// Create a new CLI error with a message and exit code.
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Test harness for the Echo language REPL
#[derive(Parser, Debug)]
#[command(name = "echo-harness")]
#[command(version = VERSION)]
#[command(about = "Run Echo test scripts against the Echo REPL", long_about = None)]
pub struct Cli {
    /// Test files to run (default: conventional files plus tests/*.echo)
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Keep the state directory after the run
    #[arg(long = "no-cleanup")]
    pub no_cleanup: bool,

    /// Use an ephemeral auto-generated temporary state directory
    #[arg(long)]
    pub testing: bool,

    /// Also run the REPL's Rust unit-test suite
    #[arg(long)]
    pub rust: bool,

    /// State-directory name prefix
    #[arg(long = "db-prefix", value_name = "PREFIX", default_value = DEFAULT_DB_PREFIX)]
    pub db_prefix: String,
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    // clap's convention is exit code 2 on usage errors; this tool's
    // contract is 1, so parse failures are handled here instead of
    // letting `parse()` exit.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                // --help / --version
                ExitCode::SUCCESS
            };
            let _ = e.print();
            process::exit(code.0);
        }
    };

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute one harness run and return the overall exit code.
fn execute(cli: Cli) -> CliResult<ExitCode> {
    let state_dir = if cli.testing {
        StateDir::ephemeral().map_err(|e| {
            CliError::failure(format!("Error creating temporary state directory: {e}"))
        })?
    } else {
        StateDir::timestamped(&cli.db_prefix)
    };

    let subject = ReplSubject::default();
    let harness = Harness::new(&subject, state_dir.path(), ".");
    let mut reporter = ConsoleReporter;

    let summary = harness.run_all(&cli.files, cli.rust, &mut reporter);

    println!();
    if cli.no_cleanup {
        println!("Test database preserved: {}", state_dir.path().display());
    } else {
        match state_dir.remove() {
            Ok(()) => println!("Cleaned up test database: {}", state_dir.path().display()),
            // Teardown failure is a warning, never a run failure.
            Err(e) => tracing::warn!(
                "failed to clean up test database {}: {e}",
                state_dir.path().display()
            ),
        }
    }

    if summary.success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

// ============================================================================
// Tests
// ============================================================================
