use codeclass_common::EvaluationOutcome;
use thiserror::Error;

/// Every way an evaluation can stop before producing test counts.
///
/// The `Display` text of each variant is the literal report handed back to
/// the student, so existing consumers depend on it verbatim.
#[derive(Error, Debug)]
pub enum EvaluationError {
    #[error("Compilation error: {stderr}")]
    CompileError { stderr: String },

    #[error("Compilation time limit exceeded")]
    CompileTimeout,

    #[error("Time limit exceeded")]
    ExecutionTimeout,

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Error: {what} exceeds maximum size of {limit} bytes")]
    InputTooLarge { what: &'static str, limit: usize },

    #[error("Error: Program output exceeds maximum size of {limit} bytes")]
    OutputTooLarge { limit: usize },

    #[error("Error: {0}")]
    SandboxIo(#[from] std::io::Error),
}

impl EvaluationError {
    /// Short machine-friendly label for log fields
    pub fn kind(&self) -> &'static str {
        match self {
            EvaluationError::CompileError { .. } => "compile_error",
            EvaluationError::CompileTimeout => "compile_timeout",
            EvaluationError::ExecutionTimeout => "execution_timeout",
            EvaluationError::UnsupportedLanguage(_) => "unsupported_language",
            EvaluationError::InputTooLarge { .. } => "input_too_large",
            EvaluationError::OutputTooLarge { .. } => "output_too_large",
            EvaluationError::SandboxIo(_) => "sandbox_io",
        }
    }
}

impl From<EvaluationError> for EvaluationOutcome {
    fn from(error: EvaluationError) -> Self {
        EvaluationOutcome::failed(error.to_string())
    }
}

/// Returned by the dispatcher for a language id with no table entry
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unsupported language: {0}")]
pub struct UnsupportedLanguage(pub String);

impl From<UnsupportedLanguage> for EvaluationError {
    fn from(err: UnsupportedLanguage) -> Self {
        EvaluationError::UnsupportedLanguage(err.0)
    }
}
