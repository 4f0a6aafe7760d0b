/// Judge - High-Level Evaluation Entry Point
///
/// **Responsibility:**
/// Dispatch the language, run the engine, fold every failure into a
/// well-formed `EvaluationOutcome`.
///
/// **Architecture:**
/// 1. Dispatcher resolves the language id (dispatcher.rs)
/// 2. Engine compiles and runs each test case (engine.rs)
/// 3. Evaluator scores outputs and builds the report (evaluator.rs)
///
/// Only an unknown language escapes as an error; compile failures, timeouts
/// and I/O failures all come back as `success: false` outcomes.

use crate::dispatcher::Dispatcher;
use crate::engine;
use crate::error::UnsupportedLanguage;
use anyhow::Result;
use codeclass_common::{EvaluationOutcome, JudgeConfig, TestCase};
use std::time::Instant;
use tracing::{info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Judge {
    config: JudgeConfig,
    dispatcher: Dispatcher,
}

impl Judge {
    pub fn new(config: JudgeConfig, dispatcher: Dispatcher) -> Self {
        Self { config, dispatcher }
    }

    /// Build the dispatcher from `config.languages_path`, or the built-in table
    pub fn from_config(config: JudgeConfig) -> Result<Self> {
        let dispatcher = Dispatcher::from_optional_path(config.languages_path.as_deref())?;
        Ok(Self::new(config, dispatcher))
    }

    pub fn config(&self) -> &JudgeConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Evaluate `source_code` against `test_cases` in order
    ///
    /// Runs to completion before returning: worst case one compile timeout
    /// plus one execution timeout per test case.
    #[instrument(
        skip(self, source_code, test_cases),
        fields(test_cases = test_cases.len(), source_size = source_code.len())
    )]
    pub async fn evaluate(
        &self,
        source_code: &str,
        language_id: &str,
        test_cases: &[TestCase],
    ) -> Result<EvaluationOutcome, UnsupportedLanguage> {
        let language = self.dispatcher.dispatch(language_id).map_err(|e| {
            warn!(language = %language_id, "Rejected unsupported language");
            e
        })?;

        let evaluation_id = Uuid::new_v4();
        let start = Instant::now();

        let result = engine::evaluate_submission(
            &self.config,
            language,
            source_code,
            test_cases,
            evaluation_id,
        )
        .await;

        let outcome = match result {
            Ok(summary) => {
                info!(
                    evaluation_id = %evaluation_id,
                    passed = summary.passed_tests,
                    total = summary.total_tests,
                    execution_ms = start.elapsed().as_millis() as u64,
                    "Evaluation completed"
                );
                EvaluationOutcome::from(summary)
            }
            Err(e) => {
                warn!(
                    evaluation_id = %evaluation_id,
                    kind = e.kind(),
                    error = %e,
                    execution_ms = start.elapsed().as_millis() as u64,
                    "Evaluation aborted"
                );
                EvaluationOutcome::from(e)
            }
        };

        Ok(outcome)
    }
}
