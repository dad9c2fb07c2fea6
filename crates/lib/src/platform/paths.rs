use crate::consts::APP_NAME;
use std::path::PathBuf;

/// Returns the user's home directory
#[cfg(windows)]
pub fn home_dir() -> PathBuf {
  let userprofile = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
  PathBuf::from(userprofile)
}

/// Returns the user's home directory
#[cfg(not(windows))]
pub fn home_dir() -> PathBuf {
  let home = std::env::var("HOME").unwrap_or_else(|_| "/".to_string());
  PathBuf::from(home)
}

/// Returns the directory for configuration files for the application
#[cfg(windows)]
pub fn config_dir() -> PathBuf {
  std::env::var("APPDATA")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir())
    .join(APP_NAME)
}

/// Returns the directory for configuration files for the application
#[cfg(not(windows))]
pub fn config_dir() -> PathBuf {
  let config_home = std::env::var("XDG_CONFIG_HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join(".config"));
  config_home.join(APP_NAME)
}

/// Returns the directory for data files for the application
#[cfg(windows)]
pub fn data_dir() -> PathBuf {
  std::env::var("APPDATA")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir())
    .join(APP_NAME)
}

/// Returns the directory for data files for the application
#[cfg(not(windows))]
pub fn data_dir() -> PathBuf {
  let data_home = std::env::var("XDG_DATA_HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join(".local").join("share"));
  data_home.join(APP_NAME)
}

/// Root of everything the service writes: `$HDTAPPS_ROOT`, or the data directory.
pub fn root_dir() -> PathBuf {
  if let Ok(path) = std::env::var("HDTAPPS_ROOT") {
    return PathBuf::from(path);
  }
  data_dir()
}

/// Directory layout under a root directory.
///
/// ```text
/// {root}/
/// ├── repo/
/// │   ├── temp/           # packages being published
/// │   ├── applications/   # published packages, one folder per app id
/// │   └── db/             # document store
/// └── tasks/
///     ├── <task id>/      # task workspaces
///     └── status/         # task status documents
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
  pub root: PathBuf,
}

impl Layout {
  pub fn new(root: PathBuf) -> Self {
    Self { root }
  }

  pub fn repo_dir(&self) -> PathBuf {
    self.root.join("repo")
  }

  pub fn temp_dir(&self) -> PathBuf {
    self.repo_dir().join("temp")
  }

  pub fn applications_dir(&self) -> PathBuf {
    self.repo_dir().join("applications")
  }

  pub fn db_dir(&self) -> PathBuf {
    self.repo_dir().join("db")
  }

  pub fn tasks_dir(&self) -> PathBuf {
    self.root.join("tasks")
  }

  pub fn status_dir(&self) -> PathBuf {
    self.tasks_dir().join("status")
  }
}
