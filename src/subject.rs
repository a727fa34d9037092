//! Test subject invocation
//!
//! The target REPL is an opaque executable behind the [`TestSubject`]
//! trait: hand it a prepared script and a state directory, get back the
//! captured stdout/stderr and exit code. The trait exists so alternate
//! REPL binaries or a mock subject can be substituted in tests without
//! touching the preparation or verdict logic.

use std::io::{Read, Write};
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Wall-clock limit for a single REPL invocation.
pub const INVOKE_TIMEOUT: Duration = Duration::from_secs(30);

/// Captured outcome of one child-process run.
#[derive(Debug, Clone)]
pub struct InvocationResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl InvocationResult {
    /// Synthetic failure result used when the process could not be run
    /// or did not finish.
    pub fn failure(stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code: 1,
        }
    }
}

/// An executable test subject: something that evaluates a script against
/// a state directory and reports what happened.
pub trait TestSubject {
    /// Run `script` to completion and capture the result.
    ///
    /// Never fails: setup or execution faults are folded into an
    /// [`InvocationResult`] with exit code 1.
    fn invoke(&self, script: &str, state_dir: &Path) -> InvocationResult;
}

/// The real Echo REPL, spawned as a child process.
///
/// The script is delivered as the process's entire standard input via a
/// temporary file, never as command-line arguments, to avoid shell
/// escaping and argument-length limits. The argument vector is
/// `<program> <args..> --db <state-dir>`.
pub struct ReplSubject {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl Default for ReplSubject {
    fn default() -> Self {
        Self {
            program: "cargo".to_string(),
            args: ["run", "--quiet", "--bin", "echo-repl", "--"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            timeout: INVOKE_TIMEOUT,
        }
    }
}

impl ReplSubject {
    /// Subject backed by an arbitrary command line.
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout: INVOKE_TIMEOUT,
        }
    }

    /// Override the invocation timeout (tests use short limits).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn try_invoke(&self, script: &str, state_dir: &Path) -> std::io::Result<InvocationResult> {
        // Scoped temp file: deleted on drop on every path out of this
        // function, including timeout and error returns.
        let mut input = tempfile::Builder::new()
            .prefix("echo-test-")
            .suffix(".echo")
            .tempfile()?;
        input.write_all(script.as_bytes())?;
        input.flush()?;

        let stdin = input.reopen()?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg("--db")
            .arg(state_dir)
            .stdin(Stdio::from(stdin))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // Drain both pipes on reader threads while waiting. A child that
        // fills the OS pipe buffer would otherwise block on write and
        // never exit.
        let stdout_handle = drain(child.stdout.take());
        let stderr_handle = drain(child.stderr.take());

        let start = Instant::now();
        let status = loop {
            match child.try_wait()? {
                Some(status) => break Some(status),
                None => {
                    if start.elapsed() > self.timeout {
                        let _ = child.kill();
                        let _ = child.wait();
                        break None;
                    }
                    thread::sleep(Duration::from_millis(10));
                }
            }
        };

        // Exit (or kill) closes the pipes, so both readers run to EOF.
        let stdout = String::from_utf8_lossy(&stdout_handle.join().unwrap_or_default()).to_string();
        let stderr = String::from_utf8_lossy(&stderr_handle.join().unwrap_or_default()).to_string();

        match status {
            Some(status) => Ok(InvocationResult {
                stdout,
                stderr,
                exit_code: status.code().unwrap_or(1),
            }),
            // Output produced before the kill is kept for diagnosis; the
            // synthetic message replaces whatever was on stderr.
            None => Ok(InvocationResult {
                stdout,
                stderr: format!("Test timed out after {} seconds", self.timeout.as_secs()),
                exit_code: 1,
            }),
        }
    }
}

impl TestSubject for ReplSubject {
    fn invoke(&self, script: &str, state_dir: &Path) -> InvocationResult {
        match self.try_invoke(script, state_dir) {
            Ok(result) => result,
            Err(e) => InvocationResult::failure(e.to_string()),
        }
    }
}

/// Read a child pipe to EOF on a dedicated thread.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

// ============================================================================
// Tests
// ============================================================================
