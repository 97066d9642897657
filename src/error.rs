use crate::workspace::Platform;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub type Result<T, E = BvtkError> = std::result::Result<T, E>;

/// Failures a tool call can hit. Every variant is turned into response text at
/// the tool boundary; none of them stop the server.
#[derive(Debug, Error)]
pub enum BvtkError {
    #[error("JSON file not found on the desktop: {filename}")]
    FileNotFound { filename: String, path: PathBuf },

    #[error("invalid JSON in {filename}: {source}")]
    Parse {
        filename: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no usable Blender executable found on {platform}")]
    ExecutableNotFound { platform: Platform },

    #[error("Blender did not finish within {} seconds", after.as_secs())]
    Timeout { after: Duration },

    #[error("{message}")]
    Process {
        message: String,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BvtkError {
    /// Output captured from Blender before the failure, if any.
    pub fn captured_output(&self) -> Option<(&str, &str)> {
        match self {
            BvtkError::Process { stdout, stderr, .. } => Some((stdout, stderr)),
            _ => None,
        }
    }
}
