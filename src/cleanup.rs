use crate::script::TEMP_SCRIPT_PREFIX;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// A cleanup step that did not work out. Logged and dropped; it never replaces
/// the result of the tool call that produced it.
#[derive(Debug)]
pub struct CleanupWarning {
    pub path: PathBuf,
    pub source: io::Error,
}

impl fmt::Display for CleanupWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "temporary file cleanup failed for {}: {}",
            self.path.display(),
            self.source
        )
    }
}

impl CleanupWarning {
    fn log(&self) {
        tracing::warn!("{self}");
    }
}

/// Removes one generated script.
pub async fn remove_temp_script(path: &Path) -> Option<CleanupWarning> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => None,
        Err(source) => {
            let warning = CleanupWarning {
                path: path.to_path_buf(),
                source,
            };
            warning.log();
            Some(warning)
        }
    }
}

/// Removes every file in `dir` whose name starts with the temp script prefix,
/// including leftovers from earlier runs. Returns how many were removed.
pub async fn sweep_temp_scripts(dir: &Path) -> usize {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(source) => {
            CleanupWarning {
                path: dir.to_path_buf(),
                source,
            }
            .log();
            return 0;
        }
    };

    let mut removed = 0;
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(source) => {
                CleanupWarning {
                    path: dir.to_path_buf(),
                    source,
                }
                .log();
                break;
            }
        };
        if !entry
            .file_name()
            .to_string_lossy()
            .starts_with(TEMP_SCRIPT_PREFIX)
        {
            continue;
        }
        if remove_temp_script(&entry.path()).await.is_none() {
            removed += 1;
        }
    }
    tracing::debug!("Swept {removed} temporary scripts from {}", dir.display());
    removed
}
