//! Container task execution.
//!
//! A task moves through `CREATED -> PROGRESS (created) -> PROGRESS (running) ->
//! SUCCESS | FAILURE`. Every step is recorded in the [`StatusStore`] before the
//! next one starts:
//!
//! 1. Resolve the provider image and create a container running the rendered
//!    command; report `PROGRESS`
//! 2. Copy every input file and file-set directory into the container at its
//!    required path
//! 3. Start the container; report `PROGRESS`
//! 4. Wait for the exit code, without timeout
//! 5. On exit 0, copy each output out into `output/`, remove the container and
//!    report `SUCCESS`. An output missing after copy-out fails the task. Any
//!    other exit code reports `FAILURE` and keeps the container for inspection.

pub mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info, warn};
use walkdir::WalkDir;

use crate::consts::OUTPUT_DIR;
use crate::fetch::{ArchiveKind, pack_dir, pack_file, unpack};
use crate::runtime::{ContainerRuntime, RuntimeError};
use crate::status::{StatusStore, TaskStatus};

pub use types::{ExecuteError, Execution, expand_path, input_file_dir, output_path};

/// Transient archive written while copying outputs out, kept next to `output/`.
const OUTPUT_ARCHIVE: &str = "output.tar";

/// Something to copy into the container.
enum CopyIn {
  File { local: PathBuf, name: String },
  Dir(PathBuf),
}

pub struct TaskExecutor {
  runtime: Arc<dyn ContainerRuntime>,
  statuses: StatusStore,
}

impl TaskExecutor {
  pub fn new(runtime: Arc<dyn ContainerRuntime>, statuses: StatusStore) -> Self {
    Self { runtime, statuses }
  }

  /// Run a task to a terminal state and return the final status.
  ///
  /// Failures never escape: they end up in the returned (and recorded) status.
  pub async fn run(&self, execution: &Execution) -> TaskStatus {
    let mut container = None;
    let status = match self.try_run(execution, &mut container).await {
      Ok(status) => status,
      Err(e) => {
        error!(task_id = %execution.task_id, container = ?container, error = %e, "task failed");
        TaskStatus::failure_internal(&execution.task_id, container.as_deref(), e.kind(), e.to_string())
      }
    };
    self.report(&status);
    status
  }

  async fn try_run(&self, execution: &Execution, container: &mut Option<String>) -> Result<TaskStatus, ExecuteError> {
    let task_id = execution.task_id.as_str();

    // Resolve every container path before anything is created.
    let mut copies = Vec::new();
    for file in &execution.files {
      let local = PathBuf::from(&file.value);
      let name = local
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.spec.name.clone());
      copies.push((input_file_dir(&file.spec)?, CopyIn::File { local, name }));
    }
    for set in &execution.file_sets {
      copies.push((expand_path(&set.spec.required_path)?, CopyIn::Dir(PathBuf::from(&set.value))));
    }
    let outputs = execution
      .outputs
      .iter()
      .map(|output| -> Result<(String, String), ExecuteError> { Ok((output_path(output)?, output.file_name())) })
      .collect::<Result<Vec<_>, _>>()?;

    let image = self
      .runtime
      .image_id(&execution.image)
      .await
      .map_err(runtime_err("image lookup"))?;

    let id = self
      .runtime
      .create_container(&image, &execution.command)
      .await
      .map_err(runtime_err("create"))?;
    *container = Some(id.clone());
    self.report_progress(task_id, &id).await?;

    for (target, copy) in copies {
      let archive = match &copy {
        CopyIn::File { local, name } => {
          info!(task_id = %task_id, source = %local.display(), target = %target, "copying file into container");
          pack_blocking(local.clone(), Some(name.clone())).await?
        }
        CopyIn::Dir(dir) => {
          info!(task_id = %task_id, source = %dir.display(), target = %target, "copying file-set into container");
          pack_blocking(dir.clone(), None).await?
        }
      };
      self
        .runtime
        .put_archive(&id, &target, archive)
        .await
        .map_err(runtime_err("copy-in"))?;
    }

    self.runtime.start_container(&id).await.map_err(runtime_err("start"))?;
    self.report_progress(task_id, &id).await?;

    let code = self.runtime.wait_container(&id).await.map_err(runtime_err("wait"))?;
    if code != 0 {
      warn!(task_id = %task_id, container = %id, code, "transformation exited non-zero");
      return Ok(TaskStatus::failure_exit(task_id, &id, code));
    }

    let output_dir = execution.workspace.join(OUTPUT_DIR);
    let archive_path = execution.workspace.join(OUTPUT_ARCHIVE);
    for (path, file_name) in &outputs {
      self.copy_out(&id, path, &archive_path, &output_dir).await?;
      if !output_dir.join(file_name).is_file() {
        return Err(ExecuteError::MissingOutput {
          name: file_name.clone(),
          path: path.clone(),
        });
      }
    }

    self
      .runtime
      .remove_container(&id)
      .await
      .map_err(runtime_err("remove"))?;

    let files = list_files(&output_dir);
    info!(task_id = %task_id, files = files.len(), "task succeeded");
    Ok(TaskStatus::success(task_id, files))
  }

  async fn copy_out(&self, id: &str, path: &str, archive_path: &Path, output_dir: &Path) -> Result<(), ExecuteError> {
    let archive = self.runtime.get_archive(id, path).await.map_err(runtime_err("copy-out"))?;

    tokio::fs::create_dir_all(output_dir).await.map_err(|source| ExecuteError::Io {
      path: output_dir.to_path_buf(),
      source,
    })?;
    tokio::fs::write(archive_path, archive)
      .await
      .map_err(|source| ExecuteError::Io {
        path: archive_path.to_path_buf(),
        source,
      })?;

    let (src, dest) = (archive_path.to_path_buf(), output_dir.to_path_buf());
    tokio::task::spawn_blocking(move || unpack(&src, ArchiveKind::Tar, &dest))
      .await
      .map_err(|e| ExecuteError::Io {
        path: archive_path.to_path_buf(),
        source: std::io::Error::other(e),
      })?
      .map_err(ExecuteError::Extract)?;

    tokio::fs::remove_file(archive_path)
      .await
      .map_err(|source| ExecuteError::Io {
        path: archive_path.to_path_buf(),
        source,
      })?;
    info!(container = %id, path = %path, "copied output");
    Ok(())
  }

  async fn report_progress(&self, task_id: &str, container: &str) -> Result<(), ExecuteError> {
    let state = self
      .runtime
      .container_status(container)
      .await
      .map_err(runtime_err("inspect"))?;
    self.report(&TaskStatus::progress(task_id, container, &state));
    Ok(())
  }

  fn report(&self, status: &TaskStatus) {
    if let Err(e) = self.statuses.record(status) {
      error!(task_id = %status.task_id, state = %status.state, error = %e, "failed to record task status");
    }
  }
}

fn runtime_err(step: &'static str) -> impl FnOnce(RuntimeError) -> ExecuteError {
  move |source| ExecuteError::Runtime { step, source }
}

/// Tar a directory's contents, or a single file as the entry `name`.
async fn pack_blocking(local: PathBuf, name: Option<String>) -> Result<Vec<u8>, ExecuteError> {
  let path = local.clone();
  let io_err = move |source: std::io::Error| ExecuteError::Io { path, source };
  let pack = move || match name {
    Some(name) => pack_file(&local, &name),
    None => pack_dir(&local),
  };
  match tokio::task::spawn_blocking(pack).await {
    Ok(result) => result.map_err(io_err),
    Err(e) => Err(io_err(std::io::Error::other(e))),
  }
}

/// Regular files under `dir`, sorted.
fn list_files(dir: &Path) -> Vec<String> {
  let mut files: Vec<String> = WalkDir::new(dir)
    .into_iter()
    .filter_map(Result::ok)
    .filter(|entry| entry.file_type().is_file())
    .map(|entry| entry.path().to_string_lossy().into_owned())
    .collect();
  files.sort();
  files
}
