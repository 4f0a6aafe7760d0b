// CLI commands for running the judge locally
use anyhow::{Context, Result};
use codeclass_common::{EvaluationOutcome, JudgeConfig, ProblemId, TestCase, UserId};
use codeclass_judge::memory::InMemoryStore;
use codeclass_judge::{Judge, SubmissionService, SubmitError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

const EXIT_UNSUPPORTED_LANGUAGE: u8 = 2;

#[derive(Debug, Clone, Deserialize)]
pub struct ProblemFile {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    pub test_cases: Vec<TestCase>,
}

/// Accepted shapes for `--tests`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TestsFile {
    List(Vec<TestCase>),
    Problem(ProblemFile),
}

#[derive(Debug, Serialize)]
struct EvaluationSummary<'a> {
    #[serde(flatten)]
    outcome: &'a EvaluationOutcome,
    score: u32,
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Load test cases from a bare JSON array or a problem file
pub fn load_test_cases(path: &Path) -> Result<Vec<TestCase>> {
    let content = read_file(path)?;
    let parsed: TestsFile = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse test cases from {}", path.display()))?;

    Ok(match parsed {
        TestsFile::List(test_cases) => test_cases,
        TestsFile::Problem(problem) => problem.test_cases,
    })
}

pub fn load_problem(path: &Path) -> Result<ProblemFile> {
    let content = read_file(path)?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse problem file {}", path.display()))
}

/// List all configured languages
pub fn list_languages(config: JudgeConfig) -> Result<()> {
    let judge = Judge::from_config(config)?;
    let dispatcher = judge.dispatcher();

    for name in dispatcher.list_languages() {
        let language = dispatcher.dispatch(&name)?;
        let mode = if language.needs_compile() {
            "compile + run"
        } else {
            "run"
        };
        println!("{:<12} .{:<6} {}", name, language.file_extension, mode);
    }

    Ok(())
}

/// Evaluate a source file and print the outcome with its score
pub async fn evaluate(
    language: &str,
    source: &Path,
    tests: &Path,
    config: JudgeConfig,
) -> Result<ExitCode> {
    let source_code = read_file(source)?;
    let test_cases = load_test_cases(tests)?;
    let judge = Judge::from_config(config)?;

    info!(
        language = %language,
        test_cases = test_cases.len(),
        source = %source.display(),
        "Evaluating"
    );

    match judge.evaluate(&source_code, language, &test_cases).await {
        Ok(outcome) => {
            let summary = EvaluationSummary {
                outcome: &outcome,
                score: outcome.score(),
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("✗ {}", e);
            eprintln!("  Available languages: {:?}", judge.dispatcher().list_languages());
            Ok(ExitCode::from(EXIT_UNSUPPORTED_LANGUAGE))
        }
    }
}

/// Run the submission flow against an in-memory store seeded from a problem file
pub async fn submit(
    problem: &Path,
    user: u64,
    language: &str,
    source: &Path,
    config: JudgeConfig,
) -> Result<ExitCode> {
    let problem = load_problem(problem)?;
    let source_code = read_file(source)?;
    let judge = Judge::from_config(config)?;

    let store = Arc::new(InMemoryStore::new());
    store.add_problem(ProblemId(problem.id), problem.test_cases);
    store.add_user(UserId(user));

    let service = SubmissionService::new(Arc::new(judge), store.clone(), store.clone(), store);

    info!(problem_id = problem.id, title = %problem.title, "Submitting");

    match service
        .submit(ProblemId(problem.id), UserId(user), source_code, language)
        .await
    {
        Ok(submission) => {
            println!("{}", serde_json::to_string_pretty(&submission)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(SubmitError::UnsupportedLanguage(e)) => {
            eprintln!("✗ {}", e);
            Ok(ExitCode::from(EXIT_UNSUPPORTED_LANGUAGE))
        }
        Err(e) => Err(e.into()),
    }
}
