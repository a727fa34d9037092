//! Run orchestration and reporting
//!
//! Drives the per-file pipeline (prepare → invoke → verdict) over a set
//! of test files, folds the verdicts into a [`RunSummary`], and reports
//! progress through the [`RunReporter`] trait. Reporting is separated
//! from execution so tests can record events instead of printing, and so
//! alternate output formats can be added without touching the pipeline.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::script::{needs_preparation, prepare_file, wrap_script};
use crate::subject::{InvocationResult, TestSubject};
use crate::verdict::TestVerdict;

/// Conventionally-named test files checked at the run root, in order.
const DEFAULT_TEST_FILES: &[&str] = &["mini_test.echo", "echo_test.echo", "simple_test.echo"];

/// Subdirectory scanned for additional `*.echo` test files.
const TEST_GLOB_DIR: &str = "tests";

// ANSI color codes
const GREEN: &str = "\x1b[0;32m";
const RED: &str = "\x1b[0;31m";
const YELLOW: &str = "\x1b[0;33m";
const BLUE: &str = "\x1b[0;34m";
const NC: &str = "\x1b[0m";

/// Totals accumulated over one harness run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total_files: usize,
    pub passed_files: usize,
    pub failed_files: usize,
    /// Verdict of the REPL's own Rust unit-test suite, if it was run.
    /// Tracked separately: the suite is one extra pass/fail unit, never
    /// counted among the file totals.
    pub suite_ok: Option<bool>,
}

impl RunSummary {
    fn record(&mut self, verdict: &TestVerdict) {
        self.total_files += 1;
        if verdict.success {
            self.passed_files += 1;
        } else {
            self.failed_files += 1;
        }
    }

    /// Overall verdict: no failed files, and the Rust suite (when
    /// requested) also passed.
    pub fn success(&self) -> bool {
        self.failed_files == 0 && self.suite_ok.unwrap_or(true)
    }
}

/// Progress and result reporting for a harness run.
///
/// All methods default to no-ops so test doubles only implement what
/// they record.
pub trait RunReporter {
    fn on_run_start(&mut self, _state_dir: &Path) {}
    fn on_file_start(&mut self, _path: &Path) {}
    fn on_preparing(&mut self, _path: &Path) {}
    fn on_missing_file(&mut self, _path: &Path) {}
    fn on_file_complete(&mut self, _path: &Path, _verdict: &TestVerdict, _result: &InvocationResult) {
    }
    fn on_suite_start(&mut self) {}
    fn on_suite_complete(&mut self, _ok: bool, _passed: Option<usize>, _output: &str) {}
    fn on_run_complete(&mut self, _summary: &RunSummary) {}
}

/// Default console reporter, matching the Echo test runner's output.
#[derive(Default)]
pub struct ConsoleReporter;

impl RunReporter for ConsoleReporter {
    fn on_run_start(&mut self, state_dir: &Path) {
        println!("Echo Language Test Runner");
        println!("=========================");
        println!("Using database: {}", state_dir.display());
        println!();
    }

    fn on_file_start(&mut self, path: &Path) {
        let name = file_name(path);
        println!("{YELLOW}Running test: {name}{NC}");
    }

    fn on_preparing(&mut self, _path: &Path) {
        println!("  Preparing test file...");
    }

    fn on_missing_file(&mut self, path: &Path) {
        println!("{RED}Error: Test file not found: {}{NC}", path.display());
    }

    fn on_file_complete(&mut self, path: &Path, verdict: &TestVerdict, result: &InvocationResult) {
        let name = file_name(path);

        if !result.stderr.is_empty() {
            println!("{RED}  Error output:{NC}");
            println!("  {}", result.stderr);
        }

        if verdict.success {
            println!("{GREEN}✓ {name}: PASSED ({} tests){NC}", verdict.passed);
        } else {
            println!("{RED}✗ {name}: FAILED{NC}");
            if verdict.passed > 0 || verdict.failed > 0 {
                println!("  Tests: {} passed, {} failed", verdict.passed, verdict.failed);
            }
            // Full captured stdout, for diagnosis.
            println!("{BLUE}Output:{NC}");
            println!("{}", result.stdout);
        }
        println!();
    }

    fn on_suite_start(&mut self) {
        println!("{YELLOW}Running Rust unit tests...{NC}");
    }

    fn on_suite_complete(&mut self, ok: bool, passed: Option<usize>, output: &str) {
        if ok {
            println!("{GREEN}✓ Rust tests: PASSED{NC}");
            if let Some(n) = passed {
                println!("  {n} tests passed");
            }
        } else {
            println!("{RED}✗ Rust tests: FAILED{NC}");
            println!("{output}");
        }
        println!();
    }

    fn on_run_complete(&mut self, summary: &RunSummary) {
        println!("=========================");
        println!("Test Summary:");
        println!("  Echo Tests: {}", summary.total_files);
        println!("  {GREEN}Passed: {}{NC}", summary.passed_files);
        println!("  {RED}Failed: {}{NC}", summary.failed_files);
        if let Some(ok) = summary.suite_ok {
            println!("  Rust Tests: {}", if ok { "PASSED" } else { "FAILED" });
        }
        println!();

        if summary.success() {
            println!("{GREEN}✅ All tests passed!{NC}");
        } else {
            println!("{RED}❌ Some tests failed!{NC}");
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// One harness run: a test subject, the state directory it writes to,
/// and the root directory used for default test-file discovery.
pub struct Harness<'a, S: TestSubject> {
    subject: &'a S,
    state_dir: &'a Path,
    root: PathBuf,
}

impl<'a, S: TestSubject> Harness<'a, S> {
    pub fn new(subject: &'a S, state_dir: &'a Path, root: impl Into<PathBuf>) -> Self {
        Self {
            subject,
            state_dir,
            root: root.into(),
        }
    }

    /// Run every selected file (plus, optionally, the Rust suite) and
    /// fold the verdicts into a [`RunSummary`].
    ///
    /// An empty `files` list selects the conventional default set; an
    /// explicit list is run as given, with missing paths reported and
    /// skipped (they do not abort the rest of the run, and are not
    /// counted in the totals).
    pub fn run_all(
        &self,
        files: &[PathBuf],
        run_rust_suite: bool,
        reporter: &mut dyn RunReporter,
    ) -> RunSummary {
        let mut summary = RunSummary::default();

        reporter.on_run_start(self.state_dir);

        if run_rust_suite {
            reporter.on_suite_start();
            let (ok, passed, output) = rust_suite();
            reporter.on_suite_complete(ok, passed, &output);
            summary.suite_ok = Some(ok);
        }

        let explicit = !files.is_empty();
        let selected: Vec<PathBuf> = if explicit {
            files.to_vec()
        } else {
            self.default_files()
        };

        for path in &selected {
            // A missing explicit path is reported in place, in list
            // order; it is skipped, not counted, and does not abort the
            // rest of the run.
            if explicit && !path.exists() {
                reporter.on_missing_file(path);
                continue;
            }
            let verdict = self.run_file(path, reporter);
            summary.record(&verdict);
        }

        reporter.on_run_complete(&summary);
        summary
    }

    /// Run one test file through the whole pipeline.
    ///
    /// Every failure mode (unreadable file, subject fault, timeout, bad
    /// output) ends up as a failed verdict; nothing propagates.
    pub fn run_file(&self, path: &Path, reporter: &mut dyn RunReporter) -> TestVerdict {
        reporter.on_file_start(path);

        let result = self.invoke_file(path, reporter);
        let verdict = TestVerdict::from_invocation(&result);
        reporter.on_file_complete(path, &verdict, &result);
        verdict
    }

    fn invoke_file(&self, path: &Path, reporter: &mut dyn RunReporter) -> InvocationResult {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => return InvocationResult::failure(format!("failed to read {}: {e}", path.display())),
        };

        // Clean files skip preparation; stripping them would be a no-op.
        let code = if needs_preparation(&content) {
            reporter.on_preparing(path);
            match prepare_file(path) {
                Ok(code) => code,
                Err(e) => return InvocationResult::failure(e.to_string()),
            }
        } else {
            content
        };

        self.subject.invoke(&wrap_script(&code), self.state_dir)
    }

    /// Default selection: the conventional root-level files that exist,
    /// in priority order, then `tests/*.echo` sorted by name.
    fn default_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = DEFAULT_TEST_FILES
            .iter()
            .map(|name| self.root.join(name))
            .filter(|path| path.exists())
            .collect();

        let glob_dir = self.root.join(TEST_GLOB_DIR);
        if let Ok(entries) = fs::read_dir(&glob_dir) {
            let mut globbed: Vec<PathBuf> = entries
                .flatten()
                .map(|entry| entry.path())
                .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "echo"))
                .collect();
            globbed.sort();
            files.extend(globbed);
        }

        files
    }
}

/// Run the REPL implementation's own unit-test suite.
///
/// Classified purely by exit code; the passed count is scraped from
/// cargo's `test result: ok. <N> passed` line when present.
fn rust_suite() -> (bool, Option<usize>, String) {
    let output = Command::new("cargo")
        .args(["test", "--", "--nocapture"])
        .output();

    match output {
        Ok(output) => {
            let stdout = String::from_utf8_lossy(&output.stdout).to_string();
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            let passed = cargo_passed_count(&stdout);
            let combined = format!("{stdout}\n{stderr}");
            (output.status.success(), passed, combined)
        }
        Err(e) => (false, None, format!("Failed to run cargo test: {e}")),
    }
}

/// Parse `test result: ok. <N> passed` out of cargo test output.
fn cargo_passed_count(stdout: &str) -> Option<usize> {
    const MARKER: &str = "test result: ok.";
    let idx = stdout.find(MARKER)?;
    let rest = stdout[idx + MARKER.len()..].trim_start();
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    let after = rest[digits.len()..].trim_start();
    if after.starts_with("passed") {
        digits.parse().ok()
    } else {
        None
    }
}

// ============================================================================
// Tests
// ============================================================================
