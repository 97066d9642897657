use crate::runner::{ProcessRunner, RunLimits, TokioProcessRunner, DEFAULT_MAX_OUTPUT_BYTES};
use crate::tools::{SystemClock, ToolContext};
use crate::workspace::{Platform, Workspace};
use clap::Args;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Server settings, from flags or the environment.
#[derive(Debug, Clone, Args)]
pub struct ServerConfig {
    /// Directory holding the JSON configurations [default: ~/Desktop]
    #[arg(long, global = true, env = "BVTK_DESKTOP_DIR")]
    pub desktop_dir: Option<PathBuf>,

    /// Directory for temporary import scripts [default: system temp dir]
    #[arg(long, global = true, env = "BVTK_TEMP_DIR")]
    pub temp_dir: Option<PathBuf>,

    /// Blender executable used when a tool call does not name one
    #[arg(long = "blender", global = true, env = "BLENDER_EXECUTABLE")]
    pub blender: Option<PathBuf>,

    /// Seconds Blender may run before it is killed
    #[arg(long, global = true, env = "BVTK_TIMEOUT_SECS", default_value_t = 120)]
    pub timeout_secs: u64,

    /// Bytes of stdout and of stderr kept from a Blender run
    #[arg(long, global = true, env = "BVTK_MAX_OUTPUT_BYTES", default_value_t = DEFAULT_MAX_OUTPUT_BYTES)]
    pub max_output_bytes: usize,
}

impl ServerConfig {
    pub fn limits(&self) -> RunLimits {
        RunLimits {
            timeout: Duration::from_secs(self.timeout_secs),
            max_output_bytes: self.max_output_bytes,
        }
    }

    /// Composition root: wires the real process runner and clock into the
    /// context every tool receives.
    pub fn into_context(self) -> io::Result<ToolContext> {
        let limits = self.limits();
        let workspace = Workspace::resolve(self.desktop_dir, self.temp_dir)?;
        tracing::info!(
            "Desktop: {}, temp: {}",
            workspace.desktop().display(),
            workspace.temp().display()
        );
        let runner: Arc<dyn ProcessRunner> = Arc::new(TokioProcessRunner);
        Ok(ToolContext {
            workspace,
            runner,
            clock: Arc::new(SystemClock),
            platform: Platform::current(),
            limits,
            default_blender: self.blender,
        })
    }
}
