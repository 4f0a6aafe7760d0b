/// Submission Orchestrator
///
/// Seam between the judge and the rest of the application: loads a
/// problem's test cases, evaluates the code, scores it and hands the
/// resulting record to persistence exactly once.

use crate::error::UnsupportedLanguage;
use crate::executor::Judge;
use async_trait::async_trait;
use codeclass_common::{ProblemId, Submission, TestCase, UserId};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument};

/// Source of a problem's ordered test cases
#[async_trait]
pub trait ProblemStore: Send + Sync {
    /// `None` when no such problem exists
    async fn test_cases(&self, problem_id: ProblemId) -> anyhow::Result<Option<Vec<TestCase>>>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn exists(&self, user_id: UserId) -> anyhow::Result<bool>;
}

/// Persistence boundary for finished submissions
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Store the record and return it as persisted
    async fn save(&self, submission: Submission) -> anyhow::Result<Submission>;
}

#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("Problem not found: {0}")]
    ProblemNotFound(ProblemId),

    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error(transparent)]
    UnsupportedLanguage(#[from] UnsupportedLanguage),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

#[derive(Clone)]
pub struct SubmissionService {
    judge: Arc<Judge>,
    problems: Arc<dyn ProblemStore>,
    users: Arc<dyn UserStore>,
    submissions: Arc<dyn SubmissionStore>,
}

impl SubmissionService {
    pub fn new(
        judge: Arc<Judge>,
        problems: Arc<dyn ProblemStore>,
        users: Arc<dyn UserStore>,
        submissions: Arc<dyn SubmissionStore>,
    ) -> Self {
        Self {
            judge,
            problems,
            users,
            submissions,
        }
    }

    /// Evaluate `code` for a problem and persist the scored submission
    ///
    /// Store failures propagate as `SubmitError::Store`; nothing is retried.
    #[instrument(
        skip(self, code),
        fields(problem_id = %problem_id, user_id = %user_id, language = %language_id)
    )]
    pub async fn submit(
        &self,
        problem_id: ProblemId,
        user_id: UserId,
        code: String,
        language_id: &str,
    ) -> Result<Submission, SubmitError> {
        let test_cases = self
            .problems
            .test_cases(problem_id)
            .await?
            .ok_or(SubmitError::ProblemNotFound(problem_id))?;

        if !self.users.exists(user_id).await? {
            return Err(SubmitError::UserNotFound(user_id));
        }

        let outcome = self.judge.evaluate(&code, language_id, &test_cases).await?;

        let submission = Submission::from_outcome(
            code,
            language_id.to_string(),
            &outcome,
            user_id,
            problem_id,
        );
        info!(
            success = outcome.success,
            score = submission.score,
            "Submission evaluated"
        );

        Ok(self.submissions.save(submission).await?)
    }
}
