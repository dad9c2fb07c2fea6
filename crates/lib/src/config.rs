//! Service configuration.
//!
//! Values are resolved in three layers, later layers winning:
//!
//! 1. Built-in defaults
//! 2. An optional TOML file (`$HDTAPPS_CONFIG`, or `config.toml` in the config directory)
//! 3. Environment variables (`HDTAPPS_ROOT`, `HDTAPPS_DOCKER`, `HDTAPPS_IMAGE_PREFIX`)

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::consts::DEFAULT_IMAGE_PREFIX;
use crate::platform::paths::{Layout, config_dir, root_dir};

const CONFIG_FILENAME: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config file '{path}': {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse config file '{path}': {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },
}

/// Contents of the optional config file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
  root: Option<PathBuf>,
  docker: Option<String>,
  image_prefix: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
  /// Root directory for the repository, the document store and task workspaces.
  pub root: PathBuf,

  /// Docker client binary used by the container runtime.
  pub docker: String,

  /// Prefix of every image tag built at publish time.
  pub image_prefix: String,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      root: root_dir(),
      docker: "docker".to_string(),
      image_prefix: DEFAULT_IMAGE_PREFIX.to_string(),
    }
  }
}

impl Config {
  /// Resolve the configuration from defaults, the config file and the environment.
  pub fn load() -> Result<Self, ConfigError> {
    let path = std::env::var("HDTAPPS_CONFIG")
      .map(PathBuf::from)
      .unwrap_or_else(|_| config_dir().join(CONFIG_FILENAME));
    Self::load_from(&path)
  }

  /// Same as [`Config::load`] with an explicit config file path.
  ///
  /// A missing file is not an error.
  pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
    let mut config = Config::default();

    match fs::read_to_string(path) {
      Ok(content) => {
        debug!(path = %path.display(), "loading config file");
        let file: FileConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
          path: path.to_path_buf(),
          source,
        })?;
        config.merge_file(file);
      }
      Err(e) if e.kind() == io::ErrorKind::NotFound => {}
      Err(source) => {
        return Err(ConfigError::Read {
          path: path.to_path_buf(),
          source,
        });
      }
    }

    config.merge_env();
    Ok(config)
  }

  pub fn layout(&self) -> Layout {
    Layout::new(self.root.clone())
  }

  fn merge_file(&mut self, file: FileConfig) {
    if let Some(root) = file.root {
      self.root = root;
    }
    if let Some(docker) = file.docker {
      self.docker = docker;
    }
    if let Some(prefix) = file.image_prefix {
      self.image_prefix = prefix;
    }
  }

  fn merge_env(&mut self) {
    if let Ok(root) = std::env::var("HDTAPPS_ROOT") {
      self.root = PathBuf::from(root);
    }
    if let Ok(docker) = std::env::var("HDTAPPS_DOCKER") {
      self.docker = docker;
    }
    if let Ok(prefix) = std::env::var("HDTAPPS_IMAGE_PREFIX") {
      self.image_prefix = prefix;
    }
  }
}
