//! Types for running a task inside a container.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::consts::{APP_ROOT_TOKEN, CONTAINER_APP_ROOT};
use crate::error::ErrorKind;
use crate::fetch::FetchError;
use crate::materialize::Bound;
use crate::runtime::RuntimeError;
use crate::spec::{InputFile, InputFileSet, OutputFile};

#[derive(Debug, Error)]
pub enum ExecuteError {
  /// Only `{r}`-relative container paths can be expanded.
  #[error("unsupported container path {0:?}: paths must start with {{r}}")]
  UnsupportedPath(String),

  #[error("container {step} failed: {source}")]
  Runtime {
    step: &'static str,
    #[source]
    source: RuntimeError,
  },

  #[error("I/O error at {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to extract outputs: {0}")]
  Extract(#[source] FetchError),

  #[error("output {name} was not produced at {path}")]
  MissingOutput { name: String, path: String },
}

impl ExecuteError {
  /// Transport failures of the container runtime are integration errors.
  pub fn kind(&self) -> ErrorKind {
    match self {
      ExecuteError::Runtime { .. } => ErrorKind::Integration,
      ExecuteError::UnsupportedPath(_)
      | ExecuteError::Io { .. }
      | ExecuteError::Extract(_)
      | ExecuteError::MissingOutput { .. } => ErrorKind::Execution,
    }
  }
}

/// Everything needed to run one materialized task.
#[derive(Debug, Clone)]
pub struct Execution {
  pub task_id: String,
  /// Image id (a provider's `pkgID`).
  pub image: String,
  /// Fully rendered invocation command.
  pub command: String,
  /// Input files bound to local files inside `workspace`.
  pub files: Vec<Bound<InputFile>>,
  /// File-sets bound to local directories inside `workspace`.
  pub file_sets: Vec<Bound<InputFileSet>>,
  pub outputs: Vec<OutputFile>,
  /// Task workspace on the host. Outputs land in its `output/` folder.
  pub workspace: PathBuf,
}

/// Expand a `{r}`-relative path template to a container path.
pub fn expand_path(template: &str) -> Result<String, ExecuteError> {
  match template.strip_prefix(APP_ROOT_TOKEN) {
    Some(rest) if rest.is_empty() || rest.starts_with('/') => Ok(format!("{}{}", CONTAINER_APP_ROOT, rest)),
    _ => Err(ExecuteError::UnsupportedPath(template.to_string())),
  }
}

/// Container directory an input file is copied into; `{r}` when none is declared.
pub fn input_file_dir(file: &InputFile) -> Result<String, ExecuteError> {
  if file.required_path.is_empty() {
    expand_path(APP_ROOT_TOKEN)
  } else {
    expand_path(&file.required_path)
  }
}

/// Container path of an output file: its expanded access path joined with `<name>.<format>`.
pub fn output_path(output: &OutputFile) -> Result<String, ExecuteError> {
  let dir = expand_path(&output.access_path)?;
  let file_name = output.file_name();
  if dir.ends_with('/') {
    Ok(format!("{}{}", dir, file_name))
  } else {
    Ok(format!("{}/{}", dir, file_name))
  }
}
