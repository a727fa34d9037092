//! Result extraction
//!
//! Parses the captured stdout of one REPL invocation into pass/fail
//! counts and a binary verdict. Extraction is an ordered list of
//! strategies; the first one that recognizes the output wins, so adding
//! a third output format is a one-line change.

use crate::subject::InvocationResult;

/// Banner the Echo test framework prints on whole-suite success.
pub const ALL_PASSED_BANNER: &str = "✅ All tests passed!";

/// Glyph marking a single passing test in the simple output format.
pub const PASS_GLYPH: char = '✓';

/// Glyph marking a single failing test in the simple output format.
pub const FAIL_GLYPH: char = '✗';

/// Pass/fail counts plus the success decision for one test file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestVerdict {
    pub passed: usize,
    pub failed: usize,
    pub success: bool,
}

impl TestVerdict {
    /// Derive the verdict for one invocation.
    ///
    /// Success requires a clean exit, at least one passing test, and
    /// either a zero failure count or the explicit all-passed banner.
    /// The banner clause tolerates suites that print it without a
    /// matching `Failed: 0` line.
    pub fn from_invocation(result: &InvocationResult) -> Self {
        let (passed, failed) = extract_counts(&result.stdout);
        let success = result.exit_code == 0
            && (failed == 0 || result.stdout.contains(ALL_PASSED_BANNER))
            && passed > 0;
        Self {
            passed,
            failed,
            success,
        }
    }
}

type Strategy = fn(&str) -> Option<(usize, usize)>;

/// Extraction strategies in precedence order. The glyph counter is the
/// catch-all and only applies when no structured summary line matched.
const STRATEGIES: &[Strategy] = &[summary_counts, glyph_counts];

/// Extract (passed, failed) from stdout using the first strategy that
/// recognizes the output.
pub fn extract_counts(stdout: &str) -> (usize, usize) {
    STRATEGIES
        .iter()
        .find_map(|strategy| strategy(stdout))
        .unwrap_or((0, 0))
}

/// Structured form: `Passed: <N>` and `Failed: <N>` anywhere in the
/// output. Applies if at least one of the two labels is present; the
/// missing one defaults to 0.
fn summary_counts(stdout: &str) -> Option<(usize, usize)> {
    let passed = labeled_count(stdout, "Passed:");
    let failed = labeled_count(stdout, "Failed:");
    if passed.is_none() && failed.is_none() {
        return None;
    }
    Some((passed.unwrap_or(0), failed.unwrap_or(0)))
}

/// Fallback form: one glyph per test event.
fn glyph_counts(stdout: &str) -> Option<(usize, usize)> {
    Some((
        stdout.matches(PASS_GLYPH).count(),
        stdout.matches(FAIL_GLYPH).count(),
    ))
}

/// Find `label` in `text` and parse the integer after it, skipping any
/// whitespace between the two. A label occurrence without a number does
/// not count; later occurrences are still considered.
fn labeled_count(text: &str, label: &str) -> Option<usize> {
    text.match_indices(label).find_map(|(idx, _)| {
        let rest = text[idx + label.len()..].trim_start();
        let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        digits.parse().ok()
    })
}

// ============================================================================
// Tests
// ============================================================================
