//! Status command implementation.

use std::path::PathBuf;

use anyhow::Result;

use hdtapps_lib::status::{TaskState, TaskStatus};

use super::Services;
use crate::output::{print_error, print_info, print_json, print_stat, print_success, short_id, symbols};

pub fn cmd_status(root: Option<PathBuf>, task_id: &str, json: bool) -> Result<()> {
  let services = Services::load(root)?;
  let status = services.tasks.status(task_id)?;

  if json {
    return print_json(&status);
  }
  print_status(&status);
  Ok(())
}

pub(super) fn print_status(status: &TaskStatus) {
  let headline = format!("Task {}: {}", status.task_id, status.state);
  match status.state {
    TaskState::Success => print_success(&headline),
    TaskState::Failure => print_error(&headline),
    TaskState::Created | TaskState::Progress => print_info(&headline),
  }

  if let Some(container) = &status.container_id {
    print_stat("Container", short_id(container));
  }
  if let Some(container_status) = &status.container_status {
    print_stat("Container status", container_status);
  }
  if let Some(failure) = &status.failure {
    print_stat("Reason", &failure.to_string());
  }
  for file in &status.files {
    println!("  {} {}", symbols::ARROW, file);
  }
}
