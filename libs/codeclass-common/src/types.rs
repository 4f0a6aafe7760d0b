use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Problem identifier as assigned by the problem store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProblemId(pub u64);

/// User identifier as assigned by the user store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for ProblemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Test Case Definition (Immutable Input)
/// Owned by the problem; the judge only ever reads it.
/// Ordering matters - execution is sequential and report indices follow it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub input: String,
    #[serde(alias = "output")]
    pub expected_output: String,
    /// Shown to students as a sample; not consulted during evaluation
    #[serde(default, alias = "example")]
    pub is_example: bool,
}

impl TestCase {
    pub fn new(input: impl Into<String>, expected_output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            expected_output: expected_output.into(),
            is_example: false,
        }
    }
}

/// Evaluation Output
///
/// ## Semantics:
/// - success: the evaluation infrastructure ran to completion, regardless of
///   how many tests passed
/// - total_tests / passed_tests: `None` whenever success is false
/// - report: human-readable, one line per test case plus a summary line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationOutcome {
    pub success: bool,
    pub report: String,
    pub total_tests: Option<u32>,
    pub passed_tests: Option<u32>,
}

impl EvaluationOutcome {
    /// Outcome of an evaluation where every test case ran
    pub fn completed(report: String, total_tests: u32, passed_tests: u32) -> Self {
        debug_assert!(passed_tests <= total_tests);
        Self {
            success: true,
            report,
            total_tests: Some(total_tests),
            passed_tests: Some(passed_tests),
        }
    }

    /// Outcome of an evaluation aborted by the infrastructure
    pub fn failed(report: impl Into<String>) -> Self {
        Self {
            success: false,
            report: report.into(),
            total_tests: None,
            passed_tests: None,
        }
    }

    /// Integer score in [0, 100] derived from the test counts
    pub fn score(&self) -> u32 {
        score(self.passed_tests, self.total_tests)
    }
}

/// `floor(100 * passed / total)` when total > 0, otherwise 0
pub fn score(passed_tests: Option<u32>, total_tests: Option<u32>) -> u32 {
    match (passed_tests, total_tests) {
        (Some(passed), Some(total)) if total > 0 => {
            let passed = u64::from(passed.min(total));
            (100 * passed / u64::from(total)) as u32
        }
        _ => 0,
    }
}

/// Submission record (write-once)
/// Built by the orchestrator from an outcome and handed to persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub code: String,
    pub language: String,
    pub report: String,
    pub score: u32,
    pub submitted_at: DateTime<Utc>,
    pub user_id: UserId,
    pub problem_id: ProblemId,
}

impl Submission {
    pub fn from_outcome(
        code: String,
        language: String,
        outcome: &EvaluationOutcome,
        user_id: UserId,
        problem_id: ProblemId,
    ) -> Self {
        Self {
            code,
            language,
            report: outcome.report.clone(),
            score: outcome.score(),
            submitted_at: Utc::now(),
            user_id,
            problem_id,
        }
    }
}
