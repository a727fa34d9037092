//! Test script preparation
//!
//! Turns the raw text of an Echo test file into a script the REPL can
//! consume on stdin: whole-line `//` comments are dropped, `.load`
//! directives are inlined, bare code is framed in a `.eval` / `.` block,
//! and a trailing `.quit` guarantees the child process terminates.
//!
//! ## Known limitations (intentional)
//!
//! - `.load` is resolved exactly one level deep: content pulled in by a
//!   directive is *not* re-scanned, so a nested `.load` line passes through
//!   to the REPL verbatim.
//! - A `.load` whose target does not exist is warned about and left in
//!   place; the REPL sees the original line and reports its own error.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Whole-line comment marker recognized in Echo test files.
pub const COMMENT_MARKER: &str = "//";

/// Single-line include directive keyword.
pub const LOAD_DIRECTIVE: &str = ".load";

/// Directive opening a batch evaluation block.
pub const EVAL_BEGIN: &str = ".eval";

/// Lone-line terminator closing a batch evaluation block.
pub const EVAL_END: &str = ".";

/// Directive telling the REPL to exit.
pub const QUIT_DIRECTIVE: &str = ".quit";

/// Errors that occur while preparing a test script.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Remove whole-line comments from Echo source text.
///
/// A line is dropped if it starts with `//` after leading whitespace.
/// Trailing and block comments are not recognized. Line order and the
/// final-newline shape of the input are preserved.
pub fn strip_comments(content: &str) -> String {
    content
        .split('\n')
        .filter(|line| !line.trim_start().starts_with(COMMENT_MARKER))
        .collect::<Vec<_>>()
        .join("\n")
}

/// True if the raw file text needs the preparation pipeline at all.
///
/// Files without `.load` directives or comments are fed to the REPL
/// verbatim; stripping them would be a no-op anyway.
pub fn needs_preparation(content: &str) -> bool {
    content.contains(LOAD_DIRECTIVE) || content.contains(COMMENT_MARKER)
}

/// Inline `.load` directives, resolving paths relative to `base_dir`.
///
/// Loaded content is comment-stripped and preceded by a provenance marker
/// line. Inlining is single-level: the loaded content is not re-scanned
/// for further directives. A directive whose target is missing is logged
/// and passed through unchanged.
pub fn resolve_includes(content: &str, base_dir: &Path) -> String {
    let mut expanded: Vec<String> = Vec::new();

    for line in content.split('\n') {
        let trimmed = line.trim();
        match parse_load_directive(trimmed) {
            Some(load_path) => {
                let full_path = base_dir.join(load_path);
                match fs::read_to_string(&full_path) {
                    Ok(loaded) => {
                        tracing::debug!("inlining {load_path}");
                        expanded.push(format!("// Inlined from {load_path}"));
                        expanded.push(strip_comments(&loaded));
                    }
                    Err(e) => {
                        tracing::warn!("could not load {load_path}: {e}");
                        expanded.push(line.to_string());
                    }
                }
            }
            None => expanded.push(line.to_string()),
        }
    }

    expanded.join("\n")
}

/// Extract the path argument of a `.load` directive, if `line` is one.
fn parse_load_directive(line: &str) -> Option<&str> {
    let rest = line.strip_prefix(LOAD_DIRECTIVE)?;
    // Require whitespace between the keyword and the path so `.loaded`
    // style identifiers are not mistaken for directives.
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let path = rest.trim();
    if path.is_empty() { None } else { Some(path) }
}

/// Frame prepared code for batch evaluation and guarantee termination.
///
/// Code that does not already open with `.eval` is wrapped in a
/// `.eval` / `.` block. The `.quit` directive is always appended so the
/// REPL exits instead of waiting for more input.
pub fn wrap_script(code: &str) -> String {
    let mut script = if code.trim().starts_with(EVAL_BEGIN) {
        code.to_string()
    } else {
        format!("{EVAL_BEGIN}\n{code}\n{EVAL_END}")
    };
    script.push('\n');
    script.push_str(QUIT_DIRECTIVE);
    script.push('\n');
    script
}

/// Full preparation for one test file: read, strip comments, inline
/// `.load` directives relative to the file's own directory.
///
/// Wrapping is left to the caller so already-clean files can skip the
/// pipeline entirely (see [`needs_preparation`]).
pub fn prepare_file(path: &Path) -> Result<String, ScriptError> {
    let content = fs::read_to_string(path).map_err(|source| ScriptError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let stripped = strip_comments(&content);
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    Ok(resolve_includes(&stripped, base_dir))
}

// ============================================================================
// Tests
// ============================================================================
