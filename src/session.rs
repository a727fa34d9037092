//! State-directory lifecycle
//!
//! Each harness run owns exactly one state directory, passed to every
//! REPL invocation via `--db`. The default naming scheme suffixes the
//! caller's prefix with epoch seconds and the process id, which keeps
//! concurrent runs apart without any coordination. The directory itself
//! is created lazily by the REPL on first use; this harness only names
//! it and removes it afterward.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use std::time::{SystemTime, UNIX_EPOCH};

/// Default prefix for the timestamped naming scheme.
pub const DEFAULT_DB_PREFIX: &str = "./test-db";

/// The state directory owned by one harness run.
#[derive(Debug)]
pub struct StateDir {
    path: PathBuf,
}

impl StateDir {
    /// Deterministic per-run name: `<prefix>-<epoch-secs>-<pid>`.
    ///
    /// The directory is not created here; the REPL creates it on first
    /// use.
    pub fn timestamped(prefix: &str) -> Self {
        let epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self {
            path: PathBuf::from(format!("{prefix}-{epoch}-{}", process::id())),
        }
    }

    /// Securely generated temporary directory (the `--testing` mode).
    pub fn ephemeral() -> io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("echo-test-").tempdir()?;
        // Detach from the TempDir guard: teardown is an explicit,
        // suppressible step at the end of the run, not a drop side effect.
        Ok(Self { path: dir.keep() })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Recursively remove the directory tree.
    ///
    /// A directory the REPL never got around to creating counts as
    /// already removed.
    pub fn remove(&self) -> io::Result<()> {
        match fs::remove_dir_all(&self.path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn timestamped_name_embeds_prefix_and_pid() {
        let dir = StateDir::timestamped("./my-db");
        let name = dir.path().to_string_lossy().to_string();
        assert!(name.starts_with("./my-db-"));
        assert!(name.ends_with(&format!("-{}", process::id())));
    }

    #[test]
    fn timestamped_does_not_create_the_directory() {
        let dir = StateDir::timestamped("./harness-session-test");
        assert!(!dir.path().exists());
    }

    #[test]
    fn ephemeral_directory_exists_until_removed() {
        let dir = StateDir::ephemeral().unwrap();
        assert!(dir.path().is_dir());

        dir.remove().unwrap();
        assert!(!dir.path().exists());
    }

    #[test]
    fn remove_tolerates_a_directory_that_was_never_created() {
        let dir = StateDir::timestamped("./never-created-db");
        dir.remove().unwrap();
    }

    #[test]
    fn remove_deletes_nested_content() {
        let dir = StateDir::ephemeral().unwrap();
        let nested = dir.path().join("objects");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("one"), b"data").unwrap();

        dir.remove().unwrap();
        assert!(!dir.path().exists());
    }
}
