//! Transformation command implementation.

use std::path::PathBuf;

use anyhow::Result;

use hdtapps_lib::spec::Transformation;

use super::Services;
use crate::output::{print_json, print_stat, print_success, symbols};

pub fn cmd_transformation(root: Option<PathBuf>, id: &str, json: bool) -> Result<()> {
  let services = Services::load(root)?;
  let transformation = services.publisher.transformation(id)?;

  if json {
    return print_json(&transformation);
  }
  print_transformation(&transformation);
  Ok(())
}

pub(super) fn print_transformation(t: &Transformation) {
  print_success(&t.qname);
  print_stat("ID", &t.id);
  print_stat("App ID", &t.app_id);
  print_stat("Strict signature", &t.strict_signature);
  print_stat("Relaxed signature", &t.relaxed_signature);

  for p in &t.input_params {
    let optional = if p.is_optional { " (optional)" } else { "" };
    println!("  {} param {} {}{}", symbols::INFO, p.alias, p.param_type, optional);
  }
  for f in &t.input_files {
    println!("  {} file {} .{}", symbols::INFO, f.alias, f.format);
  }
  for s in &t.input_file_sets {
    println!("  {} file set {} .{} at {}", symbols::INFO, s.alias, s.format, s.required_path);
  }
  for o in &t.output_files {
    println!("  {} output {} {}", symbols::ARROW, o.file_name(), o.access_path);
  }
}
