//! Running external tools (ffmpeg) as child processes.
//!
//! [`ToolCommand`] collects arguments and a deadline, then either captures the
//! full output ([`ToolCommand::execute`]) or streams stderr line by line
//! ([`ToolCommand::execute_with_stderr_callback`]) for progress parsing.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tunesmith_common::{Error, Result};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Stderr lines retained for the error message of a streamed run.
const STDERR_TAIL_LINES: usize = 20;

/// What a finished tool run left behind.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: String,
    /// Full stderr, or only its last lines for a streamed run.
    pub stderr: String,
}

/// One invocation of an external program.
///
/// ```no_run
/// use tunesmith_av::ToolCommand;
/// use std::path::PathBuf;
///
/// # async fn example() -> tunesmith_common::Result<()> {
/// let version = ToolCommand::new(PathBuf::from("ffmpeg"))
///     .args(["-hide_banner", "-version"])
///     .execute()
///     .await?;
/// println!("{}", version.stdout);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl ToolCommand {
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Kill the process if it has not exited after `d`.
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = d;
        self
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Short name used in error messages (`ffmpeg`, not `/usr/bin/ffmpeg`).
    fn tool_name(&self) -> String {
        match self.program.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => self.program.to_string_lossy().into_owned(),
        }
    }

    fn spawn(&self, stdout: Stdio) -> Result<Child> {
        Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::tool(self.tool_name(), format!("failed to spawn: {e}")))
    }

    fn check_status(&self, status: ExitStatus, stderr: &str) -> Result<()> {
        if status.success() {
            return Ok(());
        }
        Err(Error::tool(
            self.tool_name(),
            format!("exited with {status}: {}", stderr.trim()),
        ))
    }

    fn timed_out(&self) -> Error {
        Error::tool(self.tool_name(), format!("timed out after {:?}", self.timeout))
    }

    /// Run to completion and capture stdout and stderr.
    ///
    /// # Errors
    ///
    /// [`Error::Tool`] when the program cannot be started, runs past its
    /// timeout, or exits unsuccessfully. The last case carries stderr.
    pub async fn execute(&self) -> Result<ToolOutput> {
        let child = self.spawn(Stdio::piped())?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| self.timed_out())?
            .map_err(|e| Error::tool(self.tool_name(), format!("wait failed: {e}")))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        self.check_status(output.status, &stderr)?;

        Ok(ToolOutput {
            status: output.status,
            stdout,
            stderr,
        })
    }

    /// Run to completion, passing each stderr line to `on_line` as soon as
    /// the tool writes it. Stdout is discarded.
    ///
    /// `on_line` returns whether the line is kept for the error message;
    /// machine-readable chatter such as progress reports should return false.
    ///
    /// The child is killed on timeout or when `cancel` fires; the latter
    /// yields an [`Error::Tool`] whose message is `cancelled`.
    pub async fn execute_with_stderr_callback(
        &self,
        mut on_line: impl FnMut(&str) -> bool,
        cancel: Option<CancellationToken>,
    ) -> Result<ToolOutput> {
        let mut child = self.spawn(Stdio::null())?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::tool(self.tool_name(), "stderr was not captured"))?;

        let cancel = cancel.unwrap_or_default();
        let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);

        let pump = async {
            let mut lines = BufReader::new(stderr).lines();
            while let Some(line) = lines.next_line().await? {
                if !on_line(&line) {
                    continue;
                }
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
            child.wait().await
        };

        let waited = tokio::select! {
            res = tokio::time::timeout(self.timeout, pump) => res,
            _ = cancel.cancelled() => {
                let _ = child.start_kill();
                return Err(Error::tool(self.tool_name(), "cancelled"));
            }
        };

        let status = match waited {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                return Err(Error::tool(self.tool_name(), format!("wait failed: {e}")));
            }
            Err(_) => {
                let _ = child.start_kill();
                return Err(self.timed_out());
            }
        };

        let stderr = Vec::from(tail).join("\n");
        self.check_status(status, &stderr)?;

        Ok(ToolOutput {
            status,
            stdout: String::new(),
            stderr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn execute_echo() {
        // `echo` should be universally available.
        let output = ToolCommand::new(PathBuf::from("echo"))
            .arg("hello")
            .execute()
            .await;

        match output {
            Ok(out) => {
                assert!(out.status.success());
                assert!(out.stdout.trim().contains("hello"));
            }
            Err(_) => {
                // On some minimal environments echo may not exist; skip.
            }
        }
    }

    #[tokio::test]
    async fn execute_nonexistent_tool() {
        let result = ToolCommand::new(PathBuf::from("nonexistent_tool_xyz_12345"))
            .execute()
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn timeout_fires() {
        let result = ToolCommand::new(PathBuf::from("sleep"))
            .arg("10")
            .timeout(Duration::from_millis(100))
            .execute()
            .await;
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("timed out"), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn stderr_lines_are_streamed() {
        let mut seen = Vec::new();
        let result = ToolCommand::new(PathBuf::from("sh"))
            .args(["-c", "echo one 1>&2; echo two 1>&2"])
            .execute_with_stderr_callback(
                |line| {
                    seen.push(line.to_string());
                    true
                },
                None,
            )
            .await;

        if let Ok(out) = result {
            assert_eq!(seen, vec!["one", "two"]);
            assert!(out.stderr.contains("two"));
        }
    }

    #[tokio::test]
    async fn dropped_lines_stay_out_of_the_error() {
        let result = ToolCommand::new(PathBuf::from("sh"))
            .args(["-c", "echo progress=continue 1>&2; echo 'real problem' 1>&2; exit 3"])
            .execute_with_stderr_callback(|line| !line.starts_with("progress="), None)
            .await;

        let Err(err) = result else {
            panic!("expected a failure");
        };
        let message = err.to_string();
        if message.contains("failed to spawn") {
            return;
        }
        assert!(message.contains("real problem"), "{message}");
        assert!(!message.contains("progress="), "{message}");
        assert!(!message.contains("status exit status"), "{message}");
        assert!(message.contains("exited with exit status: 3"), "{message}");
    }

    #[tokio::test]
    async fn cancellation_stops_streaming_command() {
        let token = CancellationToken::new();
        token.cancel();
        let result = ToolCommand::new(PathBuf::from("sleep"))
            .arg("10")
            .execute_with_stderr_callback(|_| true, Some(token))
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn args_accumulate() {
        let mut cmd = ToolCommand::new(PathBuf::from("ffmpeg"));
        cmd.arg("-y").args(["-i", "in.wav"]);
        assert_eq!(cmd.get_args(), ["-y", "-i", "in.wav"]);
    }
}
