#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Subprocess execution with output capture and a wall-clock deadline.

use std::{
    ffi::{OsStr, OsString},
    fmt::Display,
    path::Path,
    process::{ExitStatus, Stdio},
    time::Duration,
};

use anyhow::{Context, Result};
use itertools::Itertools;
use tokio::{
    io::{AsyncReadExt, BufReader},
    process::{Child, Command},
    task::JoinHandle,
    time::timeout,
};

/// Drop guard that terminates a spawned child, and every process in its
/// group, if callers abandon the future that owns it.
struct ChildDropGuard {
    /// The child, until it has been reaped.
    child: Option<Child>,
    /// Process group led by the child.
    group: Option<u32>,
}

impl ChildDropGuard {
    /// Wraps the provided child process with the drop guard.
    fn new(child: Child) -> Self {
        let group = child.id();
        Self {
            child: Some(child),
            group,
        }
    }

    /// Returns a mutable reference to the underlying child process.
    fn child_mut(&mut self) -> Result<&mut Child> {
        self.child
            .as_mut()
            .context("child process already taken from guard")
    }

    /// Kills the whole group, then kills and reaps the child.
    async fn terminate(&mut self, command: &CommandSpec) {
        if let Some(group) = self.group {
            kill_group(group);
        }
        if let Some(mut child) = self.child.take()
            && let Err(e) = child.kill().await
        {
            tracing::warn!("could not kill timed out process `{}`: {}", command, e);
        }
    }

    /// Marks the child as reaped. Anything it left running in its group is
    /// still killed when the guard drops.
    fn reaped(mut self) {
        self.child = None;
    }
}

impl Drop for ChildDropGuard {
    fn drop(&mut self) {
        if let Some(group) = self.group {
            kill_group(group);
        }
        if let Some(child) = self.child.as_mut() {
            let _ = child.start_kill();
        }
    }
}

/// Sends `SIGKILL` to every process in the group led by `leader`.
#[cfg(unix)]
fn kill_group(leader: u32) {
    use nix::{
        errno::Errno,
        sys::signal::{Signal, killpg},
        unistd::Pid,
    };

    let Ok(raw) = i32::try_from(leader) else {
        return;
    };
    match killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => tracing::warn!("could not kill process group {}: {}", leader, e),
    }
}

/// Process groups are a unix concept; elsewhere only the child is killed.
#[cfg(not(unix))]
fn kill_group(_leader: u32) {}

/// A program together with the arguments it should be started with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Executable name or path.
    program: OsString,
    /// Arguments passed verbatim.
    args:    Vec<OsString>,
}

impl CommandSpec {
    /// Creates a command with no arguments.
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args:    Vec::new(),
        }
    }

    /// Appends a single argument.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// The executable.
    pub fn program(&self) -> &OsStr {
        &self.program
    }

    /// The argument list.
    pub fn arguments(&self) -> &[OsString] {
        &self.args
    }
}

impl Display for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            std::iter::once(&self.program)
                .chain(self.args.iter())
                .map(|part| part.to_string_lossy())
                .join(" ")
        )
    }
}

/// Captured result of a subprocess that ran to completion.
#[derive(Debug)]
pub struct ExecutionResult {
    /// Exit status returned by the process.
    pub status: ExitStatus,
    /// Contents written to stdout.
    pub stdout: Vec<u8>,
    /// Contents written to stderr.
    pub stderr: Vec<u8>,
}

impl ExecutionResult {
    /// Whether the process exited with status zero.
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Stdout followed by stderr, lossily decoded.
    pub fn combined(&self) -> String {
        format!(
            "{}{}",
            String::from_utf8_lossy(&self.stdout),
            String::from_utf8_lossy(&self.stderr)
        )
    }
}

/// Ways in which running a subprocess can fail to produce an
/// [`ExecutionResult`].
#[derive(thiserror::Error, Debug)]
pub enum ProcessError {
    /// The process did not finish before the deadline and was killed.
    #[error("Timed out after {}s running: {command}", .limit.as_secs())]
    TimedOut {
        /// The command line that was running.
        command: String,
        /// The deadline that was exceeded.
        limit:   Duration,
    },
    /// Spawning or talking to the process failed.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Spawns a reader task that drains one of the child's pipes.
fn drain<R>(pipe: R, name: &'static str) -> JoinHandle<Result<Vec<u8>>>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(pipe);
        let mut buf = Vec::new();
        reader
            .read_to_end(&mut buf)
            .await
            .with_context(|| format!("failed to read {name}"))?;
        Ok(buf)
    })
}

/// Runs `command` in `cwd`, collecting stdout and stderr, and waits at most
/// `deadline` for it to exit and for both pipes to close.
///
/// The child leads its own process group. On expiry the group is killed, the
/// child is reaped, and [`ProcessError::TimedOut`] is returned, so a
/// background process still holding the pipes cannot stretch the deadline.
pub async fn run_collect(
    command: &CommandSpec,
    cwd: &Path,
    deadline: Duration,
) -> Result<ExecutionResult, ProcessError> {
    tracing::debug!("running `{}` in {}", command, cwd.display());

    let mut cmd = Command::new(command.program());
    cmd.args(command.arguments())
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    cmd.process_group(0);

    let mut guard = ChildDropGuard::new(
        cmd.spawn()
            .with_context(|| format!("failed to spawn `{command}`"))?,
    );

    let stdout = guard
        .child_mut()?
        .stdout
        .take()
        .context("missing stdout pipe")?;
    let stderr = guard
        .child_mut()?
        .stderr
        .take()
        .context("missing stderr pipe")?;

    let out_task = drain(stdout, "stdout");
    let err_task = drain(stderr, "stderr");
    let out_abort = out_task.abort_handle();
    let err_abort = err_task.abort_handle();

    let wait_future = async {
        let status = guard
            .child_mut()?
            .wait()
            .await
            .context("failed to wait on process")?;
        let stdout = out_task.await.context("stdout task join error")??;
        let stderr = err_task.await.context("stderr task join error")??;
        Ok::<_, anyhow::Error>(ExecutionResult {
            status,
            stdout,
            stderr,
        })
    };

    let waited = timeout(deadline, wait_future).await;
    match waited {
        Ok(result) => {
            guard.reaped();
            Ok(result?)
        }
        Err(_) => {
            out_abort.abort();
            err_abort.abort();
            guard.terminate(command).await;
            Err(ProcessError::TimedOut {
                command: command.to_string(),
                limit:   deadline,
            })
        }
    }
}
