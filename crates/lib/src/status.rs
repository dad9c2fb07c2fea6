//! Task status documents.
//!
//! Every task has one status document, `<status_dir>/<task id>.json`, rewritten
//! atomically on each state change. Nothing about a task's progress is held in
//! memory, so any process sharing the root can poll it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::consts::REMOVED_CONTAINER;
use crate::error::ErrorKind;

#[derive(Debug, Error)]
pub enum StatusError {
  #[error("no status recorded for task {0}")]
  NotFound(String),

  #[error("failed to create status directory {path}: {source}")]
  CreateDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to read status {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to write status {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse status {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("failed to serialize status: {0}")]
  Serialize(#[source] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskState {
  Created,
  Progress,
  Success,
  Failure,
}

impl TaskState {
  pub fn is_terminal(self) -> bool {
    matches!(self, TaskState::Success | TaskState::Failure)
  }

  pub fn as_str(self) -> &'static str {
    match self {
      TaskState::Created => "CREATED",
      TaskState::Progress => "PROGRESS",
      TaskState::Success => "SUCCESS",
      TaskState::Failure => "FAILURE",
    }
  }
}

impl std::fmt::Display for TaskState {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Why a task ended in [`TaskState::Failure`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureReason {
  /// The transformation ran and exited non-zero.
  ExitCode(i64),

  /// The task never got a verdict from the transformation itself.
  Internal { kind: ErrorKind, message: String },
}

impl std::fmt::Display for FailureReason {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      FailureReason::ExitCode(code) => write!(f, "exited with code {}", code),
      FailureReason::Internal { kind, message } => write!(f, "{} error: {}", kind, message),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatus {
  pub task_id: String,
  pub state: TaskState,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub container_id: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub container_status: Option<String>,
  /// Output files extracted on success, as paths on the host.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub files: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub failure: Option<FailureReason>,
  /// Seconds since the Unix epoch.
  pub updated_at: u64,
}

impl TaskStatus {
  fn new(task_id: &str, state: TaskState) -> Self {
    Self {
      task_id: task_id.to_string(),
      state,
      container_id: None,
      container_status: None,
      files: Vec::new(),
      failure: None,
      updated_at: now(),
    }
  }

  pub fn created(task_id: &str) -> Self {
    Self::new(task_id, TaskState::Created)
  }

  pub fn progress(task_id: &str, container_id: &str, container_status: &str) -> Self {
    Self {
      container_id: Some(container_id.to_string()),
      container_status: Some(container_status.to_string()),
      ..Self::new(task_id, TaskState::Progress)
    }
  }

  /// The container has been removed by the time a task succeeds.
  pub fn success(task_id: &str, files: Vec<String>) -> Self {
    Self {
      container_id: Some(REMOVED_CONTAINER.to_string()),
      files,
      ..Self::new(task_id, TaskState::Success)
    }
  }

  pub fn failure_exit(task_id: &str, container_id: &str, code: i64) -> Self {
    Self {
      container_id: Some(container_id.to_string()),
      container_status: Some("exited".to_string()),
      failure: Some(FailureReason::ExitCode(code)),
      ..Self::new(task_id, TaskState::Failure)
    }
  }

  pub fn failure_internal(task_id: &str, container_id: Option<&str>, kind: ErrorKind, message: impl Into<String>) -> Self {
    Self {
      container_id: container_id.map(str::to_string),
      failure: Some(FailureReason::Internal {
        kind,
        message: message.into(),
      }),
      ..Self::new(task_id, TaskState::Failure)
    }
  }
}

fn now() -> u64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|d| d.as_secs())
    .unwrap_or(0)
}

/// File-backed status documents, one per task.
#[derive(Debug, Clone)]
pub struct StatusStore {
  base_path: PathBuf,
}

impl StatusStore {
  pub fn new(base_path: PathBuf) -> Self {
    Self { base_path }
  }

  fn status_path(&self, task_id: &str) -> Result<PathBuf, StatusError> {
    if !is_valid_task_id(task_id) {
      return Err(StatusError::NotFound(task_id.to_string()));
    }
    Ok(self.base_path.join(format!("{}.json", task_id)))
  }

  /// Replace the task's status document.
  pub fn record(&self, status: &TaskStatus) -> Result<(), StatusError> {
    let path = self.status_path(&status.task_id)?;
    fs::create_dir_all(&self.base_path).map_err(|source| StatusError::CreateDir {
      path: self.base_path.clone(),
      source,
    })?;

    let content = serde_json::to_string_pretty(status).map_err(StatusError::Serialize)?;
    let temp_path = path.with_extension("json.tmp");
    let write_err = |source: io::Error| StatusError::Write {
      path: path.clone(),
      source,
    };
    fs::write(&temp_path, content).map_err(write_err)?;
    fs::rename(&temp_path, &path).map_err(write_err)?;

    debug!(task_id = %status.task_id, state = %status.state, "recorded task status");
    Ok(())
  }

  /// Latest recorded status of a task.
  pub fn status(&self, task_id: &str) -> Result<TaskStatus, StatusError> {
    let path = self.status_path(task_id)?;
    let content = match fs::read_to_string(&path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(StatusError::NotFound(task_id.to_string())),
      Err(source) => return Err(StatusError::Read { path, source }),
    };
    serde_json::from_str(&content).map_err(|source| StatusError::Parse { path, source })
  }

  pub fn base_path(&self) -> &Path {
    &self.base_path
  }
}

/// Task ids are file names; only word characters are accepted.
fn is_valid_task_id(task_id: &str) -> bool {
  !task_id.is_empty() && task_id.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}
