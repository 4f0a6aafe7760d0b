pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod language;
pub mod memory;
pub mod sandbox;
pub mod submission;


// Re-export commonly used types for convenience
pub use dispatcher::Dispatcher;
pub use error::{EvaluationError, UnsupportedLanguage};
pub use executor::Judge;
pub use language::{CommandTemplate, LanguageSpec};
pub use submission::{ProblemStore, SubmissionService, SubmissionStore, SubmitError, UserStore};
