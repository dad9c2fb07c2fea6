//! Delete command implementation.

use std::path::PathBuf;

use anyhow::Result;

use super::Services;
use crate::output::{print_json, print_success};

pub fn cmd_delete(root: Option<PathBuf>, app_id: &str, json: bool) -> Result<()> {
  let services = Services::load(root)?;
  services.publisher.delete_app(app_id)?;

  if json {
    print_json(&serde_json::json!({ "appID": app_id, "deleted": true }))?;
  } else {
    print_success(&format!("Deleted {}", app_id));
  }
  Ok(())
}
