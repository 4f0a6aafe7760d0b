/// Execution Engine - Compile Once, Run Every Test Case
///
/// **Core Responsibility:**
/// Turn a language spec plus source code into a runnable command line, then
/// drive the sandbox once per test case.
///
/// **Critical Architectural Boundary:**
/// - Engine knows HOW to execute (scratch directory, compile step, command line)
/// - Engine does NOT decide correctness; `evaluator` judges each output
///
/// **Fail-Fast Rules:**
/// - Compile timeout or non-zero compiler exit: no test case runs
/// - Any test case timing out aborts the remaining ones and discards the
///   partial report
/// - Output past `max_output_bytes`, from the compiler or the program, aborts
///   the same way

use crate::error::EvaluationError;
use crate::evaluator::{evaluate_test, ReportBuilder, TestRunSummary};
use crate::language::LanguageSpec;
use crate::sandbox::{run_process, Limits, SandboxResult};
use codeclass_common::{JudgeConfig, TestCase};
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Scratch directory guard - owns the source file and compiled artifact
/// for one evaluation and removes them on drop, whichever way the
/// evaluation ends (success, early return, panic, cancelled future).
pub struct Workspace {
    dir: Option<TempDir>,
    source: PathBuf,
    artifact: PathBuf,
}

impl Workspace {
    /// Create a uniquely named directory under `temp_root` and write the source into it
    pub async fn create(
        temp_root: &Path,
        evaluation_id: Uuid,
        language: &LanguageSpec,
        source_code: &str,
    ) -> io::Result<Self> {
        // Artifact paths double as program paths, so keep them absolute
        let temp_root = if temp_root.is_absolute() {
            temp_root.to_path_buf()
        } else {
            std::env::current_dir()?.join(temp_root)
        };

        let dir = tempfile::Builder::new()
            .prefix(&format!("eval-{}-", evaluation_id.simple()))
            .tempdir_in(&temp_root)?;

        let source = dir.path().join(language.source_file_name());
        let artifact = dir.path().join(language.artifact_file_name());
        let workspace = Self {
            dir: Some(dir),
            source,
            artifact,
        };

        tokio::fs::write(&workspace.source, source_code).await?;
        debug!(path = %workspace.path().display(), "Workspace created");

        Ok(workspace)
    }

    pub fn path(&self) -> &Path {
        match &self.dir {
            Some(dir) => dir.path(),
            None => Path::new(""),
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn artifact(&self) -> &Path {
        &self.artifact
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            let path = dir.path().to_path_buf();
            // Failure here is logged only; it never changes the outcome
            match dir.close() {
                Ok(()) => debug!(path = %path.display(), "Workspace removed"),
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove workspace"),
            }
        }
    }
}

/// Run one full evaluation for an already dispatched language
#[instrument(
    skip_all,
    fields(evaluation_id = %evaluation_id, language = %language.name, test_cases = test_cases.len())
)]
pub async fn evaluate_submission(
    config: &JudgeConfig,
    language: &LanguageSpec,
    source_code: &str,
    test_cases: &[TestCase],
    evaluation_id: Uuid,
) -> Result<TestRunSummary, EvaluationError> {
    check_limits(config, source_code, test_cases)?;

    let workspace = Workspace::create(&config.temp_root, evaluation_id, language, source_code).await?;
    let compile_limits = Limits::new(config.compile_timeout(), config.max_output_bytes);
    let program = prepare_program(language, &workspace, compile_limits).await?;

    let execution_limits = Limits::new(config.execution_timeout(), config.max_output_bytes);
    execute_test_cases(&program, test_cases, execution_limits, workspace.path()).await
}

/// Reject pathological inputs before anything is spawned
fn check_limits(
    config: &JudgeConfig,
    source_code: &str,
    test_cases: &[TestCase],
) -> Result<(), EvaluationError> {
    if source_code.len() > config.max_source_bytes {
        return Err(EvaluationError::InputTooLarge {
            what: "Source code",
            limit: config.max_source_bytes,
        });
    }
    if test_cases
        .iter()
        .any(|tc| tc.input.len() > config.max_input_bytes)
    {
        return Err(EvaluationError::InputTooLarge {
            what: "Test input",
            limit: config.max_input_bytes,
        });
    }
    Ok(())
}

/// Compile when the language needs it and return the command line to run
///
/// Runs the compiler with no stdin; its stderr becomes the compile error report.
pub async fn prepare_program(
    language: &LanguageSpec,
    workspace: &Workspace,
    limits: Limits,
) -> Result<Vec<String>, EvaluationError> {
    if let Some(compile) = &language.compile {
        let command_line = compile.render(workspace.source(), workspace.artifact());
        debug!(command = ?command_line, "Compiling");

        match run_process(&command_line, None, limits, workspace.path()).await? {
            SandboxResult::TimedOut { elapsed } => {
                warn!(compilation_ms = elapsed.as_millis() as u64, "Compilation timed out");
                return Err(EvaluationError::CompileTimeout);
            }
            SandboxResult::OutputLimitExceeded { .. } => {
                return Err(EvaluationError::OutputTooLarge {
                    limit: limits.max_output_bytes,
                });
            }
            SandboxResult::Completed(output) if !output.success() => {
                warn!(
                    compilation_ms = output.elapsed.as_millis() as u64,
                    exit_code = ?output.exit_code(),
                    error_preview = output.stderr.lines().next().unwrap_or(""),
                    "Compilation failed"
                );
                return Err(EvaluationError::CompileError {
                    stderr: output.stderr,
                });
            }
            SandboxResult::Completed(output) => {
                info!(
                    compilation_ms = output.elapsed.as_millis() as u64,
                    "Compilation succeeded"
                );
            }
        }

        make_executable(workspace.artifact()).await?;
    }

    Ok(language.run.render(workspace.source(), workspace.artifact()))
}

#[cfg(unix)]
async fn make_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    // Some compile steps only validate and produce no artifact
    match tokio::fs::metadata(path).await {
        Ok(meta) => {
            let mut perms = meta.permissions();
            perms.set_mode(0o755);
            tokio::fs::set_permissions(path, perms).await
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(not(unix))]
async fn make_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// Run `program` once per test case, in order
///
/// Each run gets the test input plus a trailing newline on stdin. The exit
/// status is not judged; only stdout is compared.
pub async fn execute_test_cases(
    program: &[String],
    test_cases: &[TestCase],
    limits: Limits,
    working_dir: &Path,
) -> Result<TestRunSummary, EvaluationError> {
    let mut report = ReportBuilder::new();

    for (index, test_case) in test_cases.iter().enumerate() {
        let input = format!("{}\n", test_case.input);

        match run_process(program, Some(&input), limits, working_dir).await? {
            SandboxResult::TimedOut { elapsed } => {
                warn!(
                    test_index = index,
                    execution_ms = elapsed.as_millis() as u64,
                    "Test case timed out; aborting remaining tests"
                );
                return Err(EvaluationError::ExecutionTimeout);
            }
            SandboxResult::OutputLimitExceeded { .. } => {
                warn!(test_index = index, "Test case output too large; aborting remaining tests");
                return Err(EvaluationError::OutputTooLarge {
                    limit: limits.max_output_bytes,
                });
            }
            SandboxResult::Completed(output) => {
                let status = evaluate_test(&output.stdout, &test_case.expected_output);
                if !output.success() {
                    debug!(
                        test_index = index,
                        exit_code = ?output.exit_code(),
                        stderr_preview = output.stderr.lines().next().unwrap_or(""),
                        "Program exited with failure status"
                    );
                }
                debug!(
                    test_index = index,
                    status = ?status,
                    execution_ms = output.elapsed.as_millis() as u64,
                    "Test case finished"
                );
                report.record(status);
            }
        }
    }

    Ok(report.finish())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::language::CommandTemplate;
    use std::time::Duration;

    fn limits(timeout: Duration) -> Limits {
        Limits::new(timeout, 1024 * 1024)
    }

    fn sh_language() -> LanguageSpec {
        LanguageSpec {
            name: "sh".to_string(),
            file_extension: "sh".to_string(),
            compile: None,
            run: CommandTemplate::new("sh", &["{source}"]),
        }
    }

    #[tokio::test]
    async fn test_workspace_writes_source_and_removes_on_drop() {
        let root = tempfile::tempdir().unwrap();

        let workspace = Workspace::create(root.path(), Uuid::new_v4(), &sh_language(), "echo hi")
            .await
            .unwrap();
        let dir = workspace.path().to_path_buf();

        assert!(dir.starts_with(root.path()));
        assert_eq!(std::fs::read_to_string(workspace.source()).unwrap(), "echo hi");
        assert_eq!(workspace.source().file_name().unwrap(), "main.sh");

        drop(workspace);
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_workspaces_are_unique() {
        let root = tempfile::tempdir().unwrap();
        let id = Uuid::new_v4();

        let a = Workspace::create(root.path(), id, &sh_language(), "").await.unwrap();
        let b = Workspace::create(root.path(), id, &sh_language(), "").await.unwrap();

        assert_ne!(a.path(), b.path());
    }

    #[tokio::test]
    async fn test_workspace_missing_root_is_io_error() {
        let root = tempfile::tempdir().unwrap();
        let missing = root.path().join("does-not-exist");

        let result = Workspace::create(&missing, Uuid::new_v4(), &sh_language(), "").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_prepare_program_without_compile_step() {
        let root = tempfile::tempdir().unwrap();
        let workspace = Workspace::create(root.path(), Uuid::new_v4(), &sh_language(), "")
            .await
            .unwrap();

        let program = prepare_program(&sh_language(), &workspace, limits(Duration::from_secs(1)))
            .await
            .unwrap();

        assert_eq!(program, vec!["sh".to_string(), workspace.source().display().to_string()]);
    }

    #[tokio::test]
    async fn test_execute_test_cases_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let program = vec!["cat".to_string()];
        let test_cases = vec![
            TestCase::new("a", "a"),
            TestCase::new("b", "x"),
            TestCase::new("c", "c"),
        ];

        let summary = execute_test_cases(&program, &test_cases, limits(Duration::from_secs(5)), dir.path())
            .await
            .unwrap();

        assert_eq!(
            summary.report,
            "Test case 0: pass\nTest case 1: failed\nTest case 2: pass\nTest case count: 2/3\n"
        );
        assert_eq!(summary.total_tests, 3);
        assert_eq!(summary.passed_tests, 2);
    }

    #[tokio::test]
    async fn test_execute_test_cases_stops_on_output_flood() {
        let dir = tempfile::tempdir().unwrap();
        let program = vec!["yes".to_string()];
        let test_cases = vec![TestCase::new("", "y"), TestCase::new("", "y")];

        let result = execute_test_cases(
            &program,
            &test_cases,
            Limits::new(Duration::from_secs(10), 4096),
            dir.path(),
        )
        .await;

        assert!(matches!(result, Err(EvaluationError::OutputTooLarge { limit: 4096 })));
    }

    #[test]
    fn test_check_limits() {
        let config = JudgeConfig {
            max_source_bytes: 4,
            max_input_bytes: 2,
            ..JudgeConfig::default()
        };

        assert!(check_limits(&config, "1234", &[TestCase::new("12", "")]).is_ok());
        assert!(matches!(
            check_limits(&config, "12345", &[]),
            Err(EvaluationError::InputTooLarge { what: "Source code", limit: 4 })
        ));
        assert!(matches!(
            check_limits(&config, "", &[TestCase::new("123", "")]),
            Err(EvaluationError::InputTooLarge { what: "Test input", limit: 2 })
        ));
    }
}
