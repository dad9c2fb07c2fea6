//! Task submission and lifecycle.
//!
//! A task runs one transformation of one published application against the
//! values supplied in a [`TaskRequest`]. [`TaskManager::submit`] validates the
//! request, records `CREATED` and runs the rest in the background; progress is
//! observed through [`TaskManager::status`].
//!
//! # Workspace
//!
//! ```text
//! {tasks_dir}/<task id>/
//! ├── <file-set alias>/   # extracted file-set archives, removed after the run
//! └── output/             # outputs copied out of the container, kept
//! ```

mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::consts::OUTPUT_DIR;
use crate::error::Error;
use crate::execute::{Execution, TaskExecutor};
use crate::fetch::{ArchiveFetcher, deliver_results};
use crate::materialize::materialize;
use crate::platform::paths::Layout;
use crate::runtime::ContainerRuntime;
use crate::spec::{ApplicationSpec, Provider, Transformation};
use crate::status::{StatusStore, TaskState, TaskStatus};
use crate::store::DocumentStore;
use crate::template::build_command;

pub use types::{FileLink, FileSetLink, ParamValue, TaskRequest};

/// A validated request, ready to run.
#[derive(Debug, Clone)]
struct PreparedTask {
  task_id: String,
  app: ApplicationSpec,
  transformation: Transformation,
  provider: Provider,
  request: TaskRequest,
}

pub struct TaskManager {
  store: Arc<dyn DocumentStore>,
  fetcher: Arc<dyn ArchiveFetcher>,
  executor: TaskExecutor,
  statuses: StatusStore,
  layout: Layout,
  client: reqwest::Client,
}

impl TaskManager {
  pub fn new(
    store: Arc<dyn DocumentStore>,
    runtime: Arc<dyn ContainerRuntime>,
    fetcher: Arc<dyn ArchiveFetcher>,
    layout: Layout,
    client: reqwest::Client,
  ) -> Self {
    let statuses = StatusStore::new(layout.status_dir());
    Self {
      store,
      fetcher,
      executor: TaskExecutor::new(runtime, statuses.clone()),
      statuses,
      layout,
      client,
    }
  }

  /// Validate `request`, record `CREATED` and run the task on the tokio runtime.
  ///
  /// Returns the task id as soon as the task is accepted.
  pub fn submit(self: &Arc<Self>, request: TaskRequest) -> Result<String, Error> {
    let task = self.prepare(request)?;
    let task_id = task.task_id.clone();

    let manager = Arc::clone(self);
    tokio::spawn(async move {
      let status = manager.execute(task).await;
      debug!(task_id = %status.task_id, state = %status.state, "background task finished");
    });

    Ok(task_id)
  }

  /// Same as [`TaskManager::submit`], but waits for the task to finish.
  pub async fn run_to_completion(&self, request: TaskRequest) -> Result<TaskStatus, Error> {
    let task = self.prepare(request)?;
    Ok(self.execute(task).await)
  }

  pub fn status(&self, task_id: &str) -> Result<TaskStatus, Error> {
    Ok(self.statuses.status(task_id)?)
  }

  pub fn workspace(&self, task_id: &str) -> PathBuf {
    self.layout.tasks_dir().join(task_id)
  }

  fn prepare(&self, request: TaskRequest) -> Result<PreparedTask, Error> {
    let app = self
      .store
      .find_app(&request.app_id)?
      .ok_or_else(|| Error::AppNotFound(request.app_id.clone()))?;

    let transformation = self
      .store
      .find_transformation(&request.transformation_id)?
      .filter(|t| t.app_id == app.app_info.id)
      .ok_or_else(|| Error::TransformationNotFound {
        app_id: request.app_id.clone(),
        transformation_id: request.transformation_id.clone(),
      })?;

    let provider = request
      .providers
      .first()
      .or_else(|| transformation.providers.first())
      .or_else(|| app.app_info.providers.first())
      .cloned()
      .ok_or_else(|| Error::NoProvider(app.app_info.id.clone()))?;

    let task_id = task_id(&app.app_info.name);
    self.statuses.record(&TaskStatus::created(&task_id))?;
    info!(
      task_id = %task_id,
      app_id = %app.app_info.id,
      transformation = %transformation.name,
      image = %provider.pkg_id,
      "task accepted"
    );

    Ok(PreparedTask {
      task_id,
      app,
      transformation,
      provider,
      request,
    })
  }

  async fn execute(&self, task: PreparedTask) -> TaskStatus {
    let workspace = self.workspace(&task.task_id);
    let status = match self.run_in(&task, &workspace).await {
      Ok(status) => status,
      Err(e) => {
        warn!(task_id = %task.task_id, error = %e, "task could not be started");
        let status = TaskStatus::failure_internal(&task.task_id, None, e.kind(), e.to_string());
        if let Err(e) = self.statuses.record(&status) {
          warn!(task_id = %task.task_id, error = %e, "failed to record task status");
        }
        status
      }
    };

    if status.state == TaskState::Success && !task.request.results_endpoint.is_empty() {
      let files: Vec<PathBuf> = status.files.iter().map(PathBuf::from).collect();
      let delivered = deliver_results(&self.client, &task.request.results_endpoint, &files).await;
      info!(task_id = %task.task_id, delivered, total = files.len(), "results delivered");
    }

    clean_workspace(&workspace).await;
    status
  }

  async fn run_in(&self, task: &PreparedTask, workspace: &Path) -> Result<TaskStatus, Error> {
    tokio::fs::create_dir_all(workspace)
      .await
      .map_err(|source| crate::execute::ExecuteError::Io {
        path: workspace.to_path_buf(),
        source,
      })?;

    let bindings = materialize(&task.transformation, &task.request, workspace, self.fetcher.as_ref()).await?;
    let command = build_command(&task.app, &task.transformation, &bindings)?;

    let execution = Execution {
      task_id: task.task_id.clone(),
      image: task.provider.pkg_id.clone(),
      command,
      files: bindings.files.into_values().collect(),
      file_sets: bindings.file_sets.into_values().collect(),
      outputs: task.transformation.output_files.clone(),
      workspace: workspace.to_path_buf(),
    };
    Ok(self.executor.run(&execution).await)
  }
}

/// `<first char><last char>_<uuid>` of the application name.
fn task_id(app_name: &str) -> String {
  let mut chars = app_name.chars().filter(|c| c.is_alphanumeric());
  let first = chars.next();
  let last = chars.next_back().or(first);
  let prefix: String = first.into_iter().chain(last).collect();
  format!("{}_{}", prefix.to_lowercase(), uuid::Uuid::new_v4().simple())
}

/// Remove everything in the workspace except the output folder.
async fn clean_workspace(workspace: &Path) {
  let mut entries = match tokio::fs::read_dir(workspace).await {
    Ok(entries) => entries,
    Err(e) => {
      debug!(workspace = %workspace.display(), error = %e, "nothing to clean");
      return;
    }
  };

  while let Ok(Some(entry)) = entries.next_entry().await {
    if entry.file_name() == OUTPUT_DIR {
      continue;
    }
    let path = entry.path();
    let result = match entry.file_type().await {
      Ok(t) if t.is_dir() => tokio::fs::remove_dir_all(&path).await,
      _ => tokio::fs::remove_file(&path).await,
    };
    if let Err(e) = result {
      warn!(path = %path.display(), error = %e, "failed to clean workspace entry");
    }
  }
}
