//! Runner for external tools (ffmpeg, ffprobe) with an optional timeout and
//! cancellation.
//!
//! Each tool is started in its own process group so a timeout or cancel
//! also takes down anything a wrapper script launched.

use std::ffi::{OsStr, OsString};
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use log::debug;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

use crate::utils::parallel::CancellationToken;
use crate::{ConvertError, Result};

/// How long to keep draining pipes after the process was killed.
const KILL_GRACE: Duration = Duration::from_secs(1);

/// Output captured from a tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub status: ExitStatus,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

impl ToolOutput {
    pub fn combined(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }
}

#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<OsString>,
    timeout: Option<Duration>,
    cancel: Option<CancellationToken>,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: None,
            cancel: None,
        }
    }

    pub fn arg(&mut self, s: impl AsRef<OsStr>) -> &mut Self {
        self.args.push(s.as_ref().to_os_string());
        self
    }

    pub fn args(&mut self, iter: impl IntoIterator<Item = impl AsRef<OsStr>>) -> &mut Self {
        self.args
            .extend(iter.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Kill the process once `timeout` has elapsed. `None` waits indefinitely.
    pub fn timeout(&mut self, timeout: Option<Duration>) -> &mut Self {
        self.timeout = timeout;
        self
    }

    /// Kill the process as soon as `token` is cancelled.
    pub fn cancel_on(&mut self, token: &CancellationToken) -> &mut Self {
        self.cancel = Some(token.clone());
        self
    }

    pub fn tool_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    /// Run the process to completion and capture both streams, whatever the
    /// exit status.
    ///
    /// Fails only if the process cannot be spawned, times out or is cancelled.
    /// Blocks the calling thread; must not be called from inside a tokio
    /// runtime.
    pub fn output(&self) -> Result<ToolOutput> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| self.error(format!("failed to create tokio runtime: {}", e)))?;
        rt.block_on(self.output_async())
    }

    /// Like [`ToolCommand::output`], but a non-zero exit status is an error
    /// carrying the captured standard error.
    pub fn execute(&self) -> Result<ToolOutput> {
        let output = self.output()?;
        if !output.status.success() {
            return Err(self.error(format!(
                "exited with {}: {}",
                output.status,
                output.stderr.trim()
            )));
        }
        Ok(output)
    }

    async fn output_async(&self) -> Result<ToolOutput> {
        debug!(
            "exec: {} {}",
            self.program.display(),
            self.args
                .iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        own_process_group(&mut cmd);

        let mut child = cmd
            .spawn()
            .map_err(|e| self.error(format!("failed to spawn: {}", e)))?;

        // Drain both pipes concurrently so a chatty child never blocks on a
        // full pipe while we wait for it.
        let stdout = tokio::spawn(read_pipe(child.stdout.take()));
        let stderr = tokio::spawn(read_pipe(child.stderr.take()));

        let cancelled = async {
            match &self.cancel {
                Some(token) => token.cancelled().await,
                None => std::future::pending().await,
            }
        };
        let deadline = async {
            match self.timeout {
                Some(limit) => tokio::time::sleep(limit).await,
                None => std::future::pending().await,
            }
        };

        let waited = tokio::select! {
            status = child.wait() => status.map_err(|e| format!("failed to wait: {}", e)),
            _ = cancelled => Err("cancelled".to_string()),
            _ = deadline => Err(format!("timed out after {:?}", self.timeout.unwrap_or_default())),
        };

        match waited {
            Ok(status) => Ok(ToolOutput {
                status,
                stdout: join_pipe(stdout).await,
                stderr: join_pipe(stderr).await,
            }),
            Err(reason) => {
                kill(&mut child).await;
                // Something outside the process group may still hold the
                // pipes open; do not wait on it past the grace period.
                let stderr = tokio::time::timeout(KILL_GRACE, join_pipe(stderr))
                    .await
                    .unwrap_or_default();
                let stderr = stderr.trim();
                let message = if stderr.is_empty() {
                    reason
                } else {
                    format!("{}\n{}", reason, stderr)
                };
                Err(self.error(message))
            }
        }
    }

    fn error(&self, message: String) -> ConvertError {
        ConvertError::Tool {
            tool: self.tool_name(),
            message,
        }
    }
}

#[cfg(unix)]
fn own_process_group(cmd: &mut Command) {
    cmd.process_group(0);
}

#[cfg(not(unix))]
fn own_process_group(_: &mut Command) {}

#[cfg(unix)]
fn kill_group(pid: u32) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        debug!("failed to kill process group {}: {}", pid, e);
    }
}

#[cfg(not(unix))]
fn kill_group(_: u32) {}

async fn kill(child: &mut Child) {
    if let Some(pid) = child.id() {
        kill_group(pid);
    }
    let _ = child.kill().await;
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf).await;
    }
    buf
}

async fn join_pipe(handle: JoinHandle<Vec<u8>>) -> String {
    handle
        .await
        .map(|buf| String::from_utf8_lossy(&buf).to_string())
        .unwrap_or_default()
}
