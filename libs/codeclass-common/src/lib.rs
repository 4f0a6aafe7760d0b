pub mod types;
pub mod config;

// Re-export commonly used types for convenience
pub use types::{EvaluationOutcome, ProblemId, Submission, TestCase, UserId};
pub use config::JudgeConfig;
