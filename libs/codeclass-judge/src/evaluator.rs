/// Test Evaluator - Language-Agnostic Scoring Logic
///
/// **Core Responsibility:**
/// Compare captured program output against expected output and build the
/// textual report.
///
/// **Critical Properties:**
/// - Knows nothing about processes or language runtimes
/// - Pure function: (outputs, expected outputs) → report + counts
///
/// **Normalization Rules (Applied to All Languages):**
/// - Trim leading and trailing whitespace: YES
/// - Internal whitespace differences: NO (exact match)
/// - Case sensitivity: YES
/// - Floating-point tolerance: NO
///
/// **Report Format (consumed verbatim downstream):**
/// ```text
/// Test case 0: pass
/// Test case 1: failed
/// Test case count: 1/2
/// ```

use codeclass_common::EvaluationOutcome;
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestStatus {
    Passed,
    Failed,
}

/// Normalize output string for comparison
///
/// Strips leading/trailing whitespace, which also absorbs a trailing
/// newline or `\r\n`. Everything in between must match exactly.
pub fn normalize_output(output: &str) -> &str {
    output.trim()
}

/// Judge one test case from its captured stdout
pub fn evaluate_test(stdout: &str, expected_output: &str) -> TestStatus {
    if normalize_output(stdout) == normalize_output(expected_output) {
        TestStatus::Passed
    } else {
        TestStatus::Failed
    }
}

/// Counts and report text after every test case ran
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestRunSummary {
    pub report: String,
    pub total_tests: u32,
    pub passed_tests: u32,
}

impl From<TestRunSummary> for EvaluationOutcome {
    fn from(summary: TestRunSummary) -> Self {
        EvaluationOutcome::completed(summary.report, summary.total_tests, summary.passed_tests)
    }
}

/// Accumulates per-test lines in execution order
#[derive(Debug, Default)]
pub struct ReportBuilder {
    report: String,
    recorded: u32,
    passed: u32,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the line for the next test case; indices start at 0
    pub fn record(&mut self, status: TestStatus) {
        let verdict = match status {
            TestStatus::Passed => {
                self.passed += 1;
                "pass"
            }
            TestStatus::Failed => "failed",
        };
        // Writing into a String cannot fail
        let _ = writeln!(self.report, "Test case {}: {}", self.recorded, verdict);
        self.recorded += 1;
    }

    /// Append the summary line and produce the final counts
    pub fn finish(mut self) -> TestRunSummary {
        let _ = writeln!(self.report, "Test case count: {}/{}", self.passed, self.recorded);
        TestRunSummary {
            report: self.report,
            total_tests: self.recorded,
            passed_tests: self.passed,
        }
    }
}
