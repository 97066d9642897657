use crate::error::BvtkError;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::time::timeout;

pub const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 2 * 1024 * 1024;

const READ_CHUNK: usize = 8 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunLimits {
    pub timeout: Duration,
    pub max_output_bytes: usize,
}

impl Default for RunLimits {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_RUN_TIMEOUT,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

/// One output stream, kept up to the configured cap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedStream {
    pub bytes: Vec<u8>,
    /// Bytes the child wrote, including the discarded tail.
    pub total_bytes: usize,
}

impl CapturedStream {
    pub fn was_truncated(&self) -> bool {
        self.total_bytes > self.bytes.len()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    pub stdout: CapturedStream,
    pub stderr: CapturedStream,
    /// None when the child was terminated by a signal.
    pub exit_code: Option<i32>,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to start {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("process timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("failed to collect process output: {0}")]
    Io(#[from] std::io::Error),
}

/// Runs external programs. Implementations take the argument vector as discrete
/// elements and never go through a shell.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(
        &self,
        program: &Path,
        args: &[OsString],
        limits: RunLimits,
    ) -> Result<ProcessOutput, RunError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioProcessRunner;

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(
        &self,
        program: &Path,
        args: &[OsString],
        limits: RunLimits,
    ) -> Result<ProcessOutput, RunError> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RunError::Spawn {
                program: program.to_path_buf(),
                source,
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let cap = limits.max_output_bytes;

        let finished = timeout(limits.timeout, async {
            tokio::try_join!(
                read_capped(stdout, cap),
                read_capped(stderr, cap),
                child.wait()
            )
        })
        .await;

        match finished {
            Ok(Ok((stdout, stderr, status))) => Ok(ProcessOutput {
                stdout,
                stderr,
                exit_code: status.code(),
            }),
            Ok(Err(err)) => Err(RunError::Io(err)),
            Err(_) => {
                if let Err(err) = child.kill().await {
                    tracing::warn!("Failed to kill timed out process {}: {err}", program.display());
                }
                Err(RunError::Timeout {
                    after: limits.timeout,
                })
            }
        }
    }
}

/// Drains `reader` to the end, keeping at most `cap` bytes. The rest is read and
/// dropped so the child never blocks on a full pipe.
async fn read_capped<R>(reader: Option<R>, cap: usize) -> std::io::Result<CapturedStream>
where
    R: AsyncRead + Unpin,
{
    let mut captured = CapturedStream::default();
    let Some(mut reader) = reader else {
        return Ok(captured);
    };
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        let read = reader.read(&mut chunk).await?;
        if read == 0 {
            break;
        }
        captured.total_bytes += read;
        let room = cap.saturating_sub(captured.bytes.len());
        captured.bytes.extend_from_slice(&chunk[..read.min(room)]);
    }
    Ok(captured)
}

/// Command line for running `script` inside Blender. `--python-exit-code 1`
/// makes an unhandled exception in the script exit non-zero.
pub fn blender_args(script: &Path, background: bool) -> Vec<OsString> {
    let mut args = Vec::with_capacity(5);
    if background {
        args.push("--background".into());
    }
    args.push("--python".into());
    args.push(script.as_os_str().to_os_string());
    args.push("--python-exit-code".into());
    args.push("1".into());
    args
}

/// Output of a Blender run that exited cleanly.
#[derive(Debug, Clone)]
pub struct ScriptRun {
    pub stdout: String,
    pub stderr: String,
}

pub async fn run_blender_script(
    runner: &dyn ProcessRunner,
    executable: &Path,
    script: &Path,
    background: bool,
    limits: RunLimits,
) -> Result<ScriptRun, BvtkError> {
    let args = blender_args(script, background);
    tracing::debug!(
        "Running {} {}",
        executable.display(),
        args.iter()
            .map(|arg| arg.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    );

    let output = match runner.run(executable, &args, limits).await {
        Ok(output) => output,
        Err(RunError::Timeout { after }) => return Err(BvtkError::Timeout { after }),
        Err(err) => {
            return Err(BvtkError::Process {
                message: err.to_string(),
                exit_code: None,
                stdout: String::new(),
                stderr: String::new(),
            })
        }
    };

    for (name, stream) in [("stdout", &output.stdout), ("stderr", &output.stderr)] {
        if stream.was_truncated() {
            tracing::warn!(
                "Blender {name} truncated to {} of {} bytes",
                stream.bytes.len(),
                stream.total_bytes
            );
        }
    }

    if !output.success() {
        let message = match output.exit_code {
            Some(code) => format!("Blender exited with code {code}"),
            None => "Blender was terminated by a signal".to_string(),
        };
        return Err(BvtkError::Process {
            message,
            exit_code: output.exit_code,
            stdout: output.stdout.text(),
            stderr: output.stderr.text(),
        });
    }

    Ok(ScriptRun {
        stdout: output.stdout.text(),
        stderr: output.stderr.text(),
    })
}
