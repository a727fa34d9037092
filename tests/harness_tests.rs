//! End-to-end tests for the harness pipeline
//!
//! These drive the runner with a scripted `TestSubject` so no real REPL
//! process is needed: the subject records every script it receives and
//! replies with canned output, which exercises preparation, invocation
//! order, verdict derivation, and aggregation together.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use echo_harness::cli::runner::{Harness, RunReporter};
use echo_harness::subject::{InvocationResult, TestSubject};
use echo_harness::verdict::TestVerdict;

/// Subject that replies with canned results, in call order, and records
/// every script it is handed.
struct ScriptedSubject {
    replies: Vec<InvocationResult>,
    calls: RefCell<Vec<(String, PathBuf)>>,
}

impl ScriptedSubject {
    fn new(replies: Vec<InvocationResult>) -> Self {
        Self {
            replies,
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Subject whose every reply is a clean `Passed: 1` run.
    fn always_passing() -> Self {
        Self {
            replies: Vec::new(),
            calls: RefCell::new(Vec::new()),
        }
    }

    fn scripts(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|(s, _)| s.clone()).collect()
    }
}

impl TestSubject for ScriptedSubject {
    fn invoke(&self, script: &str, state_dir: &Path) -> InvocationResult {
        let call_index = self.calls.borrow().len();
        self.calls
            .borrow_mut()
            .push((script.to_string(), state_dir.to_path_buf()));
        self.replies.get(call_index).cloned().unwrap_or(InvocationResult {
            stdout: "Passed: 1\nFailed: 0\n".to_string(),
            stderr: String::new(),
            exit_code: 0,
        })
    }
}

/// Reporter that records the events the tests care about.
#[derive(Default)]
struct RecordingReporter {
    missing: Vec<PathBuf>,
    completed: Vec<(PathBuf, TestVerdict)>,
}

impl RunReporter for RecordingReporter {
    fn on_missing_file(&mut self, path: &Path) {
        self.missing.push(path.to_path_buf());
    }

    fn on_file_complete(&mut self, path: &Path, verdict: &TestVerdict, _result: &InvocationResult) {
        self.completed.push((path.to_path_buf(), verdict.clone()));
    }
}

fn passing_reply() -> InvocationResult {
    InvocationResult {
        stdout: "Passed: 5\nFailed: 0\n✅ All tests passed!\n".to_string(),
        stderr: String::new(),
        exit_code: 0,
    }
}

fn failing_reply() -> InvocationResult {
    InvocationResult {
        stdout: "Passed: 2\nFailed: 1\n".to_string(),
        stderr: String::new(),
        exit_code: 0,
    }
}

fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn verdicts_fold_into_the_run_summary() {
    let root = tempfile::tempdir().unwrap();
    let files = vec![
        write_file(root.path(), "a.echo", "assert(1 == 1)\n"),
        write_file(root.path(), "b.echo", "assert(2 == 2)\n"),
        write_file(root.path(), "c.echo", "assert(2 == 3)\n"),
    ];

    let subject = ScriptedSubject::new(vec![passing_reply(), passing_reply(), failing_reply()]);
    let state_dir = root.path().join("db");
    let harness = Harness::new(&subject, &state_dir, root.path());
    let mut reporter = RecordingReporter::default();

    let summary = harness.run_all(&files, false, &mut reporter);

    assert_eq!(summary.total_files, 3);
    assert_eq!(summary.passed_files, 2);
    assert_eq!(summary.failed_files, 1);
    assert_eq!(summary.suite_ok, None);
    assert!(!summary.success());
}

#[test]
fn all_passing_run_succeeds() {
    let root = tempfile::tempdir().unwrap();
    let files = vec![write_file(root.path(), "a.echo", "assert(1 == 1)\n")];

    let subject = ScriptedSubject::new(vec![passing_reply()]);
    let state_dir = root.path().join("db");
    let harness = Harness::new(&subject, &state_dir, root.path());

    let summary = harness.run_all(&files, false, &mut RecordingReporter::default());
    assert_eq!((summary.total_files, summary.passed_files), (1, 1));
    assert!(summary.success());
}

#[test]
fn missing_explicit_file_is_reported_and_skipped() {
    let root = tempfile::tempdir().unwrap();
    let present = write_file(root.path(), "present.echo", "assert(1 == 1)\n");
    let missing = root.path().join("missing.echo");

    let subject = ScriptedSubject::always_passing();
    let state_dir = root.path().join("db");
    let harness = Harness::new(&subject, &state_dir, root.path());
    let mut reporter = RecordingReporter::default();

    let summary = harness.run_all(&[missing.clone(), present.clone()], false, &mut reporter);

    // The missing path is surfaced but never counted; the rest still runs.
    assert_eq!(reporter.missing, vec![missing]);
    assert_eq!(summary.total_files, 1);
    assert_eq!(reporter.completed.len(), 1);
    assert_eq!(reporter.completed[0].0, present);
}

/// Reporter that records file events in the order they happen.
#[derive(Default)]
struct EventOrderReporter {
    events: Vec<String>,
}

impl RunReporter for EventOrderReporter {
    fn on_file_start(&mut self, path: &Path) {
        self.events
            .push(format!("run:{}", path.file_name().unwrap().to_string_lossy()));
    }

    fn on_missing_file(&mut self, path: &Path) {
        self.events
            .push(format!("missing:{}", path.file_name().unwrap().to_string_lossy()));
    }
}

#[test]
fn missing_file_is_reported_at_its_position_in_the_list() {
    let root = tempfile::tempdir().unwrap();
    let first = write_file(root.path(), "first.echo", "first\n");
    let missing = root.path().join("gone.echo");
    let last = write_file(root.path(), "last.echo", "last\n");

    let subject = ScriptedSubject::always_passing();
    let state_dir = root.path().join("db");
    let harness = Harness::new(&subject, &state_dir, root.path());
    let mut reporter = EventOrderReporter::default();

    harness.run_all(&[first, missing, last], false, &mut reporter);

    assert_eq!(
        reporter.events,
        vec!["run:first.echo", "missing:gone.echo", "run:last.echo"]
    );
}

#[test]
fn default_selection_runs_conventional_files_then_sorted_tests_dir() {
    let root = tempfile::tempdir().unwrap();
    // Created out of priority order on purpose.
    write_file(root.path(), "simple_test.echo", "simple\n");
    write_file(root.path(), "mini_test.echo", "mini\n");
    write_file(root.path(), "echo_test.echo", "echo\n");
    let tests_dir = root.path().join("tests");
    fs::create_dir(&tests_dir).unwrap();
    write_file(&tests_dir, "zz.echo", "zz\n");
    write_file(&tests_dir, "aa.echo", "aa\n");
    write_file(&tests_dir, "notes.txt", "not a test\n");

    let subject = ScriptedSubject::always_passing();
    let state_dir = root.path().join("db");
    let harness = Harness::new(&subject, &state_dir, root.path());

    let summary = harness.run_all(&[], false, &mut RecordingReporter::default());
    assert_eq!(summary.total_files, 5);

    let scripts = subject.scripts();
    let order: Vec<&str> = scripts
        .iter()
        .map(|s| {
            ["mini", "echo", "simple", "aa", "zz"]
                .into_iter()
                .find(|marker| s.contains(&format!("\n{marker}\n")))
                .unwrap()
        })
        .collect();
    assert_eq!(order, vec!["mini", "echo", "simple", "aa", "zz"]);
}

#[test]
fn clean_file_is_delivered_verbatim_inside_the_eval_frame() {
    let root = tempfile::tempdir().unwrap();
    let file = write_file(root.path(), "clean.echo", "let x = 1\nassert(x == 1)\n");

    let subject = ScriptedSubject::always_passing();
    let state_dir = root.path().join("db");
    let harness = Harness::new(&subject, &state_dir, root.path());
    harness.run_all(&[file], false, &mut RecordingReporter::default());

    let scripts = subject.scripts();
    assert_eq!(scripts.len(), 1);
    assert_eq!(scripts[0], ".eval\nlet x = 1\nassert(x == 1)\n\n.\n.quit\n");
}

#[test]
fn commented_file_is_stripped_and_load_inlined_before_delivery() {
    let root = tempfile::tempdir().unwrap();
    write_file(root.path(), "lib.echo", "// library\nlet lib = 41\n");
    let file = write_file(
        root.path(),
        "main.echo",
        "// test file\n.load lib.echo\nassert(lib + 1 == 42)\n",
    );

    let subject = ScriptedSubject::always_passing();
    let state_dir = root.path().join("db");
    let harness = Harness::new(&subject, &state_dir, root.path());
    harness.run_all(&[file], false, &mut RecordingReporter::default());

    let script = subject.scripts().remove(0);
    assert!(!script.contains("// test file"));
    assert!(script.contains("// Inlined from lib.echo"));
    assert!(script.contains("let lib = 41"));
    assert!(script.ends_with(".quit\n"));
}

#[test]
fn broken_load_directive_reaches_the_repl_verbatim() {
    let root = tempfile::tempdir().unwrap();
    let file = write_file(root.path(), "main.echo", ".load nowhere.echo\nassert(1 == 1)\n");

    let subject = ScriptedSubject::always_passing();
    let state_dir = root.path().join("db");
    let harness = Harness::new(&subject, &state_dir, root.path());
    harness.run_all(&[file], false, &mut RecordingReporter::default());

    let script = subject.scripts().remove(0);
    assert!(script.contains(".load nowhere.echo"));
}

#[test]
fn every_invocation_sees_the_same_state_directory() {
    let root = tempfile::tempdir().unwrap();
    let files = vec![
        write_file(root.path(), "a.echo", "a\n"),
        write_file(root.path(), "b.echo", "b\n"),
    ];

    let subject = ScriptedSubject::always_passing();
    let state_dir = root.path().join("run-db");
    let harness = Harness::new(&subject, &state_dir, root.path());
    harness.run_all(&files, false, &mut RecordingReporter::default());

    let calls = subject.calls.borrow();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|(_, dir)| dir == &state_dir));
}

#[test]
fn unreadable_file_becomes_a_failed_verdict_not_a_panic() {
    let root = tempfile::tempdir().unwrap();
    // A directory with the right extension: read_to_string fails on it.
    let dir_as_file = root.path().join("dir.echo");
    fs::create_dir(&dir_as_file).unwrap();

    let subject = ScriptedSubject::always_passing();
    let state_dir = root.path().join("db");
    let harness = Harness::new(&subject, &state_dir, root.path());
    let mut reporter = RecordingReporter::default();

    let summary = harness.run_all(&[dir_as_file], false, &mut reporter);

    assert_eq!(summary.total_files, 1);
    assert_eq!(summary.failed_files, 1);
    // The subject was never consulted.
    assert!(subject.scripts().is_empty());
}
