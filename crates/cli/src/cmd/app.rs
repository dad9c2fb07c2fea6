//! App command implementation.
//!
//! Shows one published application, or lists all of them.

use std::path::PathBuf;

use anyhow::Result;

use hdtapps_lib::spec::ApplicationSpec;

use super::Services;
use crate::output::{print_info, print_json, print_stat, print_success, short_id, symbols};

pub fn cmd_app(root: Option<PathBuf>, app_id: Option<&str>, json: bool) -> Result<()> {
  let services = Services::load(root)?;

  let Some(app_id) = app_id else {
    let apps = services.publisher.list_apps()?;
    if json {
      return print_json(&apps);
    }
    if apps.is_empty() {
      print_info("No applications published. Run 'hdt publish' to add one.");
      return Ok(());
    }
    for app in &apps {
      println!(
        "  {} {} {} {} ({} transformations)",
        symbols::INFO,
        app.app_info.id,
        app.app_info.name,
        app.app_info.version,
        app.transformations.len()
      );
    }
    return Ok(());
  };

  let app = services.publisher.get_app(app_id)?;
  if json {
    return print_json(&app);
  }
  print_app(&app);
  Ok(())
}

fn print_app(app: &ApplicationSpec) {
  let info = &app.app_info;
  print_success(&format!("{} {}", info.name, info.version));
  print_stat("App ID", &info.id);
  print_stat("Publisher", &info.publisher);
  if !info.developers.is_empty() {
    print_stat("Developers", &info.developers.join(", "));
  }
  if !info.license.is_empty() {
    print_stat("License", &info.license);
  }
  if !info.tags.is_empty() {
    print_stat("Tags", &info.tags.join(", "));
  }
  print_stat("Dependencies", &info.total_deps_count.to_string());
  for provider in &info.providers {
    print_stat("Provider", &format!("{} ({})", provider.qname, short_id(&provider.pkg_id)));
  }

  if !app.transformations.is_empty() {
    println!();
    println!("Transformations:");
    for t in &app.transformations {
      println!("  {} {} {} {}", symbols::INFO, t.qname, symbols::ARROW, t.id);
    }
  }
}
