// In-memory collaborators for the submission orchestrator
// Used by the CLI and by tests; real deployments plug in their own stores.
use crate::submission::{ProblemStore, SubmissionStore, UserStore};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use codeclass_common::{ProblemId, Submission, TestCase, UserId};
use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};

#[derive(Debug, Default)]
pub struct InMemoryStore {
    problems: RwLock<HashMap<ProblemId, Vec<TestCase>>>,
    users: RwLock<HashSet<UserId>>,
    submissions: RwLock<Vec<Submission>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a problem's test cases
    pub fn add_problem(&self, problem_id: ProblemId, test_cases: Vec<TestCase>) {
        self.problems
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(problem_id, test_cases);
    }

    pub fn add_user(&self, user_id: UserId) {
        self.users
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user_id);
    }

    /// Snapshot of saved submissions, oldest first
    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions
            .read()
            .map(|saved| saved.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ProblemStore for InMemoryStore {
    async fn test_cases(&self, problem_id: ProblemId) -> Result<Option<Vec<TestCase>>> {
        let problems = self
            .problems
            .read()
            .map_err(|_| anyhow!("problem store lock poisoned"))?;
        Ok(problems.get(&problem_id).cloned())
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn exists(&self, user_id: UserId) -> Result<bool> {
        let users = self
            .users
            .read()
            .map_err(|_| anyhow!("user store lock poisoned"))?;
        Ok(users.contains(&user_id))
    }
}

#[async_trait]
impl SubmissionStore for InMemoryStore {
    async fn save(&self, submission: Submission) -> Result<Submission> {
        let mut submissions = self
            .submissions
            .write()
            .map_err(|_| anyhow!("submission store lock poisoned"))?;
        submissions.push(submission.clone());
        Ok(submission)
    }
}
