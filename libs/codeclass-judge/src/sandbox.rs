/// Process Sandbox - Supervision of a Single External Process
///
/// **Core Responsibility:**
/// Spawn exactly one subprocess, feed it stdin, capture stdout/stderr and
/// enforce a wall-clock deadline and an output cap.
///
/// **Guarantees:**
/// - stdin is written and closed concurrently with output draining, so large
///   inputs or outputs cannot deadlock on full pipes
/// - The child leads its own process group (Unix); once it exits, times out
///   or overflows, the whole group is killed, so nothing it forked survives
/// - On timeout or overflow the child is reaped before returning; partial
///   output is discarded
/// - `kill_on_drop` covers the remaining exit paths (errors, cancellation)
///
/// **Not Provided:**
/// CPU/memory ceilings, filesystem or network isolation. A descendant that
/// moves itself into another process group escapes the group kill.

use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{ChildStdin, Command};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Captured result of a process that exited on its own
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// `None` when the process was terminated by a signal
    pub fn exit_code(&self) -> Option<i32> {
        self.status.code()
    }
}

#[derive(Debug)]
pub enum SandboxResult {
    Completed(ProcessOutput),
    TimedOut { elapsed: Duration },
    /// stdout or stderr grew past `Limits::max_output_bytes`
    OutputLimitExceeded { elapsed: Duration },
}

/// Ceilings applied to one process run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub timeout: Duration,
    /// Applies to stdout and stderr separately
    pub max_output_bytes: usize,
}

impl Limits {
    pub fn new(timeout: Duration, max_output_bytes: usize) -> Self {
        Self {
            timeout,
            max_output_bytes,
        }
    }
}

enum Captured {
    Complete(Vec<u8>),
    Overflow,
}

enum Finished {
    Exited {
        status: ExitStatus,
        stdout: Vec<u8>,
        stderr: Vec<u8>,
    },
    OutputLimit,
}

/// Run `command_line` (program followed by its arguments) inside `working_dir`.
///
/// `stdin` of `None` attaches the null device; `Some` writes the text and
/// closes the stream. Spawn and pipe failures surface as `io::Error`.
pub async fn run_process(
    command_line: &[String],
    stdin: Option<&str>,
    limits: Limits,
    working_dir: &Path,
) -> io::Result<SandboxResult> {
    let (program, args) = command_line
        .split_first()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty command line"))?;

    let mut command = Command::new(program);
    command
        .args(args)
        .current_dir(working_dir)
        .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    command.process_group(0);

    let start = Instant::now();
    let mut child = command.spawn()?;
    let group = child.id();
    debug!(program = %program, pid = ?group, "Process spawned");

    let overflow = Arc::new(Notify::new());
    let mut stdin_task = match (child.stdin.take(), stdin) {
        (Some(pipe), Some(input)) => Some(tokio::spawn(feed_stdin(pipe, input.to_owned()))),
        _ => None,
    };
    let mut stdout_task = tokio::spawn(drain(
        child.stdout.take(),
        limits.max_output_bytes,
        overflow.clone(),
    ));
    let mut stderr_task = tokio::spawn(drain(
        child.stderr.take(),
        limits.max_output_bytes,
        overflow.clone(),
    ));

    let run = async {
        let exited = tokio::select! {
            status = child.wait() => Some(status?),
            _ = overflow.notified() => None,
        };
        // Leftover background processes would keep the pipes open
        kill_group(group);

        let Some(status) = exited else {
            child.kill().await?;
            return Ok(Finished::OutputLimit);
        };
        if let Some(task) = stdin_task.as_mut() {
            join(task).await?;
        }
        let stdout = join(&mut stdout_task).await?;
        let stderr = join(&mut stderr_task).await?;

        Ok::<_, io::Error>(match (stdout, stderr) {
            (Captured::Complete(stdout), Captured::Complete(stderr)) => Finished::Exited {
                status,
                stdout,
                stderr,
            },
            _ => Finished::OutputLimit,
        })
    };
    let waited = tokio::time::timeout(limits.timeout, run).await;
    let elapsed = start.elapsed();

    let result = match waited {
        Ok(Ok(Finished::Exited {
            status,
            stdout,
            stderr,
        })) => {
            debug!(
                program = %program,
                exit_code = ?status.code(),
                execution_ms = elapsed.as_millis() as u64,
                "Process exited"
            );
            Ok(SandboxResult::Completed(ProcessOutput {
                status,
                stdout: String::from_utf8_lossy(&stdout).into_owned(),
                stderr: String::from_utf8_lossy(&stderr).into_owned(),
                elapsed,
            }))
        }
        Ok(Ok(Finished::OutputLimit)) => {
            warn!(
                program = %program,
                max_output_bytes = limits.max_output_bytes,
                "Process output exceeded limit - killed"
            );
            Ok(SandboxResult::OutputLimitExceeded { elapsed })
        }
        Ok(Err(e)) => {
            kill_group(group);
            Err(e)
        }
        Err(_) => {
            warn!(
                program = %program,
                timeout_ms = limits.timeout.as_millis() as u64,
                "Process timed out - killing"
            );

            kill_group(group);
            // kill() also waits, so the child is reaped before we return
            if let Err(e) = child.kill().await {
                warn!(program = %program, error = %e, "Failed to kill timed-out process");
            }
            Ok(SandboxResult::TimedOut { elapsed })
        }
    };

    stdout_task.abort();
    stderr_task.abort();
    if let Some(task) = stdin_task {
        task.abort();
    }

    result
}

/// SIGKILL every process in the child's group; a group that is already gone is fine
#[cfg(unix)]
fn kill_group(group: Option<u32>) {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pgid) = group.and_then(|id| i32::try_from(id).ok()) else {
        return;
    };
    match killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => warn!(pgid, error = %e, "Failed to kill process group"),
    }
}

#[cfg(not(unix))]
fn kill_group(_group: Option<u32>) {}

async fn feed_stdin(mut pipe: ChildStdin, input: String) -> io::Result<()> {
    match pipe.write_all(input.as_bytes()).await {
        Ok(()) => {}
        // The program may exit without reading its input
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
            debug!("Process closed stdin before consuming all input");
        }
        Err(e) => return Err(e),
    }
    drop(pipe);
    Ok(())
}

/// Read at most `limit + 1` bytes; one byte past the limit signals `overflow`
async fn drain<R: AsyncRead + Unpin>(
    pipe: Option<R>,
    limit: usize,
    overflow: Arc<Notify>,
) -> io::Result<Captured> {
    let mut buf = Vec::new();
    if let Some(pipe) = pipe {
        let mut capped = pipe.take((limit as u64).saturating_add(1));
        capped.read_to_end(&mut buf).await?;
    }
    if buf.len() > limit {
        overflow.notify_one();
        return Ok(Captured::Overflow);
    }
    Ok(Captured::Complete(buf))
}

async fn join<T>(task: &mut JoinHandle<io::Result<T>>) -> io::Result<T> {
    task.await.map_err(io::Error::other)?
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn cmd(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    fn limits(timeout: Duration) -> Limits {
        Limits::new(timeout, 16 * 1024 * 1024)
    }

    fn completed(result: SandboxResult) -> ProcessOutput {
        match result {
            SandboxResult::Completed(output) => output,
            other => panic!("expected process to complete, got {:?}", other),
        }
    }

    /// False once the process is gone or is a zombie awaiting its reaper
    #[cfg(target_os = "linux")]
    fn is_running(pid: &str) -> bool {
        match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
            Ok(stat) => !stat
                .rsplit(')')
                .next()
                .map(|rest| rest.trim_start().starts_with('Z'))
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    /// SIGKILL delivery is asynchronous, so allow the kernel a moment
    #[cfg(target_os = "linux")]
    async fn wait_until_dead(pid: &str) -> bool {
        for _ in 0..100 {
            if !is_running(pid) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_stdin_is_fed_and_stdout_captured() {
        let dir = tempfile::tempdir().unwrap();

        let result = run_process(&cmd(&["cat"]), Some("5\n"), limits(Duration::from_secs(5)), dir.path())
            .await
            .unwrap();

        let output = completed(result);
        assert!(output.success());
        assert_eq!(output.stdout, "5\n");
        assert_eq!(output.stderr, "");
    }

    #[tokio::test]
    async fn test_no_stdin_reads_eof() {
        let dir = tempfile::tempdir().unwrap();

        let result = run_process(&cmd(&["cat"]), None, limits(Duration::from_secs(5)), dir.path())
            .await
            .unwrap();

        assert_eq!(completed(result).stdout, "");
    }

    #[tokio::test]
    async fn test_non_zero_exit_captures_stderr() {
        let dir = tempfile::tempdir().unwrap();

        let result = run_process(
            &cmd(&["sh", "-c", "echo boom >&2; exit 3"]),
            None,
            limits(Duration::from_secs(5)),
            dir.path(),
        )
        .await
        .unwrap();

        let output = completed(result);
        assert!(!output.success());
        assert_eq!(output.exit_code(), Some(3));
        assert_eq!(output.stderr, "boom\n");
    }

    #[tokio::test]
    async fn test_timeout_returns_timed_out() {
        let dir = tempfile::tempdir().unwrap();
        let start = Instant::now();

        let result = run_process(
            &cmd(&["sleep", "30"]),
            None,
            limits(Duration::from_millis(200)),
            dir.path(),
        )
        .await
        .unwrap();

        assert!(matches!(result, SandboxResult::TimedOut { .. }));
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_timed_out_process_is_killed() {
        let dir = tempfile::tempdir().unwrap();

        let result = run_process(
            &cmd(&["sh", "-c", "echo $$ > pid; exec sleep 30"]),
            None,
            limits(Duration::from_millis(300)),
            dir.path(),
        )
        .await
        .unwrap();
        assert!(matches!(result, SandboxResult::TimedOut { .. }));

        let pid = std::fs::read_to_string(dir.path().join("pid")).unwrap();
        let proc_entry = std::path::PathBuf::from(format!("/proc/{}", pid.trim()));
        assert!(!proc_entry.exists(), "process {} still alive", pid.trim());
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_timeout_kills_background_children() {
        let dir = tempfile::tempdir().unwrap();

        let result = run_process(
            &cmd(&["sh", "-c", "sleep 60 & echo $! > bg; while :; do :; done"]),
            None,
            limits(Duration::from_millis(500)),
            dir.path(),
        )
        .await
        .unwrap();
        assert!(matches!(result, SandboxResult::TimedOut { .. }));

        let pid = std::fs::read_to_string(dir.path().join("bg")).unwrap();
        assert!(
            wait_until_dead(pid.trim()).await,
            "background process {} survived the timeout",
            pid.trim()
        );
    }

    #[tokio::test]
    async fn test_background_child_does_not_hold_result() {
        let dir = tempfile::tempdir().unwrap();
        let start = Instant::now();

        let result = run_process(
            &cmd(&["sh", "-c", "read x; echo \"$x\"; sleep 3 &"]),
            Some("5\n"),
            limits(Duration::from_secs(1)),
            dir.path(),
        )
        .await
        .unwrap();

        let output = completed(result);
        assert_eq!(output.stdout, "5\n");
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_exit_kills_leftover_children() {
        let dir = tempfile::tempdir().unwrap();

        let result = run_process(
            &cmd(&["sh", "-c", "sleep 60 > /dev/null 2>&1 & echo $! > bg"]),
            None,
            limits(Duration::from_secs(5)),
            dir.path(),
        )
        .await
        .unwrap();
        assert!(completed(result).success());

        let pid = std::fs::read_to_string(dir.path().join("bg")).unwrap();
        assert!(wait_until_dead(pid.trim()).await, "process {} outlived its parent", pid.trim());
    }

    #[tokio::test]
    async fn test_stdout_flood_is_cut_off() {
        let dir = tempfile::tempdir().unwrap();
        let start = Instant::now();

        let result = run_process(
            &cmd(&["yes", &"x".repeat(96)]),
            None,
            Limits::new(Duration::from_secs(10), 64 * 1024),
            dir.path(),
        )
        .await
        .unwrap();

        assert!(matches!(result, SandboxResult::OutputLimitExceeded { .. }));
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_stderr_flood_is_cut_off() {
        let dir = tempfile::tempdir().unwrap();

        let result = run_process(
            &cmd(&["sh", "-c", "yes >&2"]),
            None,
            Limits::new(Duration::from_secs(10), 64 * 1024),
            dir.path(),
        )
        .await
        .unwrap();

        assert!(matches!(result, SandboxResult::OutputLimitExceeded { .. }));
    }

    #[tokio::test]
    async fn test_output_at_limit_is_kept() {
        let dir = tempfile::tempdir().unwrap();

        let result = run_process(
            &cmd(&["printf", "abcd"]),
            None,
            Limits::new(Duration::from_secs(5), 4),
            dir.path(),
        )
        .await
        .unwrap();

        assert_eq!(completed(result).stdout, "abcd");
    }

    #[tokio::test]
    async fn test_ignores_unread_stdin() {
        let dir = tempfile::tempdir().unwrap();
        let input = "x".repeat(1024 * 1024);

        let result = run_process(
            &cmd(&["sh", "-c", "echo done"]),
            Some(&input),
            limits(Duration::from_secs(5)),
            dir.path(),
        )
        .await
        .unwrap();

        assert_eq!(completed(result).stdout, "done\n");
    }

    #[tokio::test]
    async fn test_large_io_does_not_deadlock() {
        let dir = tempfile::tempdir().unwrap();
        let input = "0123456789\n".repeat(200_000);

        let result = run_process(&cmd(&["cat"]), Some(&input), limits(Duration::from_secs(10)), dir.path())
            .await
            .unwrap();

        assert_eq!(completed(result).stdout.len(), input.len());
    }

    #[tokio::test]
    async fn test_empty_command_line_is_rejected() {
        let dir = tempfile::tempdir().unwrap();

        let err = run_process(&[], None, limits(Duration::from_secs(1)), dir.path())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_missing_program_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();

        let err = run_process(
            &cmd(&["codeclass-definitely-not-a-program"]),
            None,
            limits(Duration::from_secs(1)),
            dir.path(),
        )
        .await
        .unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
