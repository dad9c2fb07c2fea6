//! Submit command implementation.
//!
//! Runs a task in the foreground and reports its terminal status.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use hdtapps_lib::status::TaskState;
use hdtapps_lib::task::TaskRequest;

use super::Services;
use super::status::print_status;
use crate::output::{print_info, print_json};

pub async fn cmd_submit(root: Option<PathBuf>, request: &Path, json: bool) -> Result<()> {
  let request = read_request(request)?;
  let services = Services::load(root)?;

  if !json {
    print_info(&format!("Running transformation {} of {}", request.transformation_id, request.app_id));
  }
  let status = services.tasks.run_to_completion(request).await?;

  if json {
    print_json(&status)?;
  } else {
    print_status(&status);
    print_info(&format!(
      "Workspace: {}",
      services.tasks.workspace(&status.task_id).display()
    ));
  }

  if status.state == TaskState::Failure {
    bail!("Task {} failed", status.task_id);
  }
  Ok(())
}

fn read_request(path: &Path) -> Result<TaskRequest> {
  let content = if path == Path::new("-") {
    let mut buf = String::new();
    std::io::stdin()
      .read_to_string(&mut buf)
      .context("Failed to read task request from stdin")?;
    buf
  } else {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read task request: {}", path.display()))?
  };
  serde_json::from_str(&content).context("Invalid task request")
}
