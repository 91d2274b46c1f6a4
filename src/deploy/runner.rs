use super::stage::PipelineStage;
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// How long to keep draining output pipes once the child has exited or been killed.
const PIPE_DRAIN_GRACE: Duration = Duration::from_secs(5);

/// Time the stage's process group gets between SIGTERM and SIGKILL.
const TERMINATE_GRACE: Duration = Duration::from_secs(3);

/// How a stage process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Process exited on its own; `None` when killed by a signal
    Exited(Option<i32>),
    /// Killed after exceeding the stage timeout
    TimedOut(Duration),
    /// Killed because the caller cancelled the request
    Cancelled,
}

/// Captured result of one stage invocation; stdout and stderr are kept apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageOutput {
    pub termination: Termination,
    pub stdout: String,
    pub stderr: String,
}

impl StageOutput {
    pub fn success(&self) -> bool {
        self.termination == Termination::Exited(Some(0))
    }
}

#[derive(Debug, Error)]
pub enum StageFailure {
    #[error("Stage has an empty command")]
    EmptyCommand,

    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed waiting for stage process: {0}")]
    Wait(#[source] io::Error),

    #[error("Process exited with status {}", exit_label(.code))]
    Exited { code: Option<i32> },

    #[error("Process killed after {:?} timeout", .after)]
    TimedOut { after: Duration },

    #[error("Process killed on cancellation")]
    Cancelled,

    #[error("Expected output path was not created: {}", .path.display())]
    MissingOutput { path: PathBuf },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "signal".to_string(),
    }
}

impl From<Termination> for StageFailure {
    fn from(termination: Termination) -> Self {
        match termination {
            Termination::Exited(code) => StageFailure::Exited { code },
            Termination::TimedOut(after) => StageFailure::TimedOut { after },
            Termination::Cancelled => StageFailure::Cancelled,
        }
    }
}

/// Executes one pipeline stage.
#[async_trait]
pub trait StageRunner: Send + Sync {
    /// Runs `stage` in `cwd`; errors only when the process could not be run at all.
    async fn run(
        &self,
        stage: &PipelineStage,
        cwd: &Path,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<StageOutput, StageFailure>;
}

/// Runs stages as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessStageRunner;

impl ProcessStageRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StageRunner for ProcessStageRunner {
    async fn run(
        &self,
        stage: &PipelineStage,
        cwd: &Path,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<StageOutput, StageFailure> {
        let (program, args) = stage
            .command
            .split_first()
            .ok_or(StageFailure::EmptyCommand)?;

        debug!(stage = %stage.name, command = %stage.command_line(), cwd = %cwd.display(), "Spawning stage process");

        let mut command = Command::new(program);
        command
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own process group, so descendants can be signalled together.
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(|source| StageFailure::Spawn {
            program: program.clone(),
            source,
        })?;
        let pid = child.id();

        let stdout_task = drain(child.stdout.take());
        let stderr_task = drain(child.stderr.take());

        let termination = tokio::select! {
            status = child.wait() => match status {
                Ok(status) => Termination::Exited(status.code()),
                Err(e) => {
                    terminate(&mut child, pid, &stage.name).await;
                    return Err(StageFailure::Wait(e));
                }
            },
            _ = cancel.cancelled() => {
                warn!(stage = %stage.name, "Cancellation requested, terminating stage processes");
                terminate(&mut child, pid, &stage.name).await;
                Termination::Cancelled
            }
            _ = tokio::time::sleep(timeout) => {
                warn!(stage = %stage.name, ?timeout, "Stage timed out, terminating stage processes");
                terminate(&mut child, pid, &stage.name).await;
                Termination::TimedOut(timeout)
            }
        };

        // Background descendants of a finished stage do not outlive it either.
        kill_group(pid);

        let (stdout, stderr) = tokio::join!(
            collect(stdout_task, &stage.name, "stdout"),
            collect(stderr_task, &stage.name, "stderr"),
        );

        Ok(StageOutput {
            termination,
            stdout,
            stderr,
        })
    }
}

/// SIGTERM to the whole process group, SIGKILL once the grace period runs out.
#[cfg(unix)]
async fn terminate(child: &mut Child, pid: Option<u32>, stage: &str) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pid) = pid else {
        return;
    };
    let pgid = Pid::from_raw(pid as i32);

    if let Err(e) = killpg(pgid, Signal::SIGTERM) {
        debug!(stage, error = %e, "SIGTERM to stage process group failed");
    }
    if tokio::time::timeout(TERMINATE_GRACE, child.wait()).await.is_err() {
        warn!(stage, "Stage process ignored SIGTERM, sending SIGKILL");
    }
    let _ = killpg(pgid, Signal::SIGKILL);
    if let Err(e) = child.wait().await {
        warn!(stage, error = %e, "Failed to reap stage process");
    }
}

#[cfg(not(unix))]
async fn terminate(child: &mut Child, _pid: Option<u32>, stage: &str) {
    if let Err(e) = child.kill().await {
        warn!(stage, error = %e, "Failed to kill stage process");
    }
}

/// Kills whatever is left in the stage's process group; an empty group is not an error.
#[cfg(unix)]
fn kill_group(pid: Option<u32>) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    if let Some(pid) = pid {
        let _ = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: Option<u32>) {}

fn drain<R>(pipe: Option<R>) -> Option<JoinHandle<io::Result<Vec<u8>>>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    pipe.map(|mut reader| {
        tokio::spawn(async move {
            let mut buf = Vec::new();
            reader.read_to_end(&mut buf).await?;
            Ok(buf)
        })
    })
}

/// Collects a drained pipe; a descendant still holding the pipe open yields empty output.
async fn collect(
    task: Option<JoinHandle<io::Result<Vec<u8>>>>,
    stage: &str,
    stream: &'static str,
) -> String {
    let Some(mut handle) = task else {
        return String::new();
    };

    match tokio::time::timeout(PIPE_DRAIN_GRACE, &mut handle).await {
        Ok(Ok(Ok(bytes))) => String::from_utf8_lossy(&bytes).into_owned(),
        Ok(Ok(Err(e))) => {
            warn!(stage, stream, error = %e, "Failed to read stage output");
            String::new()
        }
        Ok(Err(e)) => {
            warn!(stage, stream, error = %e, "Output reader task failed");
            String::new()
        }
        Err(_) => {
            handle.abort();
            warn!(stage, stream, "Output pipe still open after process exit, discarding");
            String::new()
        }
    }
}
