use crate::runner::{ProcessRunner, RunLimits};
use crate::workspace::Platform;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Bound on a single `--version` probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);
const PROBE_MAX_OUTPUT_BYTES: usize = 64 * 1024;

/// Known Blender install locations, most common first. The list is probed as a
/// whole on every platform; paths that do not exist on the host fail fast.
pub const BLENDER_CANDIDATES: &[&str] = &[
    "blender",
    "/Applications/Blender.app/Contents/MacOS/Blender",
    r"C:\Program Files\Blender Foundation\Blender\4.2\blender.exe",
    r"C:\Program Files\Blender Foundation\Blender\3.6\blender.exe",
    r"C:\Program Files\Blender Foundation\Blender\blender.exe",
    "/usr/bin/blender",
    "/snap/bin/blender",
];

/// Where Blender usually lives, per platform, for the "not found" guidance.
pub const KNOWN_LOCATIONS: &[(Platform, &str)] = &[
    (
        Platform::Windows,
        r"C:\Program Files\Blender Foundation\Blender\[version]\blender.exe",
    ),
    (
        Platform::MacOs,
        "/Applications/Blender.app/Contents/MacOS/Blender",
    ),
    (Platform::Linux, "/usr/bin/blender or /snap/bin/blender"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Located {
    /// Supplied by the caller and returned without probing.
    Explicit(PathBuf),
    /// The first candidate that answered `--version`.
    Probed(PathBuf),
}

impl Located {
    pub fn path(&self) -> &Path {
        match self {
            Located::Explicit(path) | Located::Probed(path) => path,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotFound {
    pub platform: Platform,
}

pub struct BlenderLocator<'a> {
    runner: &'a dyn ProcessRunner,
    candidates: Vec<PathBuf>,
}

impl<'a> BlenderLocator<'a> {
    pub fn new(runner: &'a dyn ProcessRunner) -> Self {
        Self {
            runner,
            candidates: BLENDER_CANDIDATES.iter().map(PathBuf::from).collect(),
        }
    }

    #[cfg(test)]
    fn with_candidates(runner: &'a dyn ProcessRunner, candidates: Vec<PathBuf>) -> Self {
        Self { runner, candidates }
    }

    pub async fn locate(
        &self,
        explicit: Option<&Path>,
        platform: Platform,
    ) -> Result<Located, NotFound> {
        if let Some(path) = explicit {
            return Ok(Located::Explicit(path.to_path_buf()));
        }

        let args: [OsString; 1] = ["--version".into()];
        let limits = RunLimits {
            timeout: PROBE_TIMEOUT,
            max_output_bytes: PROBE_MAX_OUTPUT_BYTES,
        };

        for candidate in &self.candidates {
            match self.runner.run(candidate, &args, limits).await {
                Ok(output) if output.success() => {
                    tracing::debug!("Found Blender at {}", candidate.display());
                    return Ok(Located::Probed(candidate.clone()));
                }
                Ok(output) => {
                    tracing::debug!(
                        "Probe of {} exited with {:?}",
                        candidate.display(),
                        output.exit_code
                    );
                }
                Err(err) => {
                    tracing::debug!("Probe of {} failed: {err}", candidate.display());
                }
            }
        }

        Err(NotFound { platform })
    }
}

/// Remediation text for a failed lookup, listing the default install location
/// of every platform.
pub fn not_found_guidance() -> String {
    let mut text = String::from(
        "Pass blender_executable explicitly, or make sure Blender is installed and on PATH.\n\nCommon locations:",
    );
    for (platform, location) in KNOWN_LOCATIONS {
        text.push_str(&format!("\n- {platform}: {location}"));
    }
    text
}
