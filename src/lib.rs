#![forbid(unsafe_code)]
//! Echo REPL test harness
//!
//! Orchestrates test runs for the Echo language REPL: prepares `.echo`
//! test scripts (comment stripping, `.load` inlining, batch-eval
//! framing), feeds each one to a fresh REPL child process, extracts
//! pass/fail counts from the captured output, and aggregates the
//! verdicts into a single exit status.
//!
//! The pipeline flows strictly downward: [`script`] produces a prepared
//! script, [`subject`] runs it and captures the output, [`verdict`]
//! turns the output into counts and a success decision, and the runner
//! in [`cli`] folds per-file verdicts into the run summary. The REPL
//! itself is an opaque collaborator behind [`subject::TestSubject`].
//!
//! ## Panic Policy
//!
//! This codebase follows explicit error handling:
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module enforces
//!   `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.

pub mod cli;
pub mod script;
pub mod session;
pub mod subject;
pub mod verdict;

pub use cli::runner::{ConsoleReporter, Harness, RunReporter, RunSummary};
pub use script::{prepare_file, strip_comments, wrap_script};
pub use session::StateDir;
pub use subject::{InvocationResult, ReplSubject, TestSubject};
pub use verdict::TestVerdict;
