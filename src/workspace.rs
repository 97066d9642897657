use std::fmt;
use std::path::{Path, PathBuf};
use std::{env, io};

/// Name of the desktop folder under the user's home directory. It is the same
/// on every supported platform.
pub const DESKTOP_DIR_NAME: &str = "Desktop";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    MacOs,
    Linux,
    Other,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(target_os = "linux") {
            Platform::Linux
        } else {
            Platform::Other
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Windows => "Windows",
            Platform::MacOs => "macOS",
            Platform::Linux => "Linux",
            Platform::Other => "this platform",
        };
        f.write_str(name)
    }
}

fn home_dir() -> io::Result<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        env::var_os("USERPROFILE")
            .or_else(|| env::var_os("HOME"))
            .map(PathBuf::from)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "USERPROFILE is not set"))
    }

    #[cfg(not(target_os = "windows"))]
    {
        env::var_os("HOME")
            .map(PathBuf::from)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "HOME is not set"))
    }
}

// All supported platforms keep the desktop directly under home.
pub fn desktop_dir_for(_platform: Platform, home: &Path) -> PathBuf {
    home.join(DESKTOP_DIR_NAME)
}

/// The two directories every tool works in: the desktop that holds the JSON
/// configurations and generated outputs, and the scratch directory for the
/// temporary import scripts.
#[derive(Debug, Clone)]
pub struct Workspace {
    desktop: PathBuf,
    temp: PathBuf,
}

impl Workspace {
    pub fn new(desktop: impl Into<PathBuf>, temp: impl Into<PathBuf>) -> Self {
        Self {
            desktop: desktop.into(),
            temp: temp.into(),
        }
    }

    /// Resolves the current user's desktop and the system temp directory,
    /// honouring explicit overrides.
    pub fn resolve(desktop: Option<PathBuf>, temp: Option<PathBuf>) -> io::Result<Self> {
        let desktop = match desktop {
            Some(dir) => dir,
            None => desktop_dir_for(Platform::current(), &home_dir()?),
        };
        let temp = temp.unwrap_or_else(env::temp_dir);
        Ok(Self::new(desktop, temp))
    }

    pub fn desktop(&self) -> &Path {
        &self.desktop
    }

    pub fn temp(&self) -> &Path {
        &self.temp
    }

    pub fn desktop_file(&self, filename: &str) -> PathBuf {
        self.desktop.join(filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn desktop_dir_ends_with_desktop_on_every_platform() {
        let home = Path::new("/home/someone");
        for platform in [
            Platform::Windows,
            Platform::MacOs,
            Platform::Linux,
            Platform::Other,
        ] {
            let desktop = desktop_dir_for(platform, home);
            assert!(desktop.ends_with(DESKTOP_DIR_NAME), "{platform}: {desktop:?}");
            assert!(desktop.starts_with(home));
        }
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn resolve_uses_home_directory() {
        let workspace = temp_env::with_var("HOME", Some("/tmp/bvtk-home"), || {
            Workspace::resolve(None, None).expect("workspace")
        });
        assert_eq!(workspace.desktop(), Path::new("/tmp/bvtk-home/Desktop"));
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn resolve_fails_without_home() {
        let result = temp_env::with_var_unset("HOME", || Workspace::resolve(None, None));
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn overrides_win_over_environment() {
        let workspace = Workspace::resolve(
            Some(PathBuf::from("custom-desktop")),
            Some(PathBuf::from("custom-temp")),
        )
        .expect("workspace");
        assert_eq!(workspace.desktop(), Path::new("custom-desktop"));
        assert_eq!(workspace.temp(), Path::new("custom-temp"));
        assert_eq!(
            workspace.desktop_file("demo.json"),
            Path::new("custom-desktop").join("demo.json")
        );
    }
}
