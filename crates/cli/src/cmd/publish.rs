//! Publish command implementation.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use hdtapps_lib::publish::PublishOptions;

use super::Services;
use crate::output::{print_json, print_stat, print_success, print_warning, short_id, symbols};

pub async fn cmd_publish(
  root: Option<PathBuf>,
  source: &str,
  name: Option<String>,
  deploy: bool,
  provider: Option<String>,
  json: bool,
) -> Result<()> {
  let services = Services::load(root)?;
  let source = resolve_source(source)?;
  let options = PublishOptions { name, deploy, provider };

  let published = services.publisher.publish(&source, &options).await?;
  let app = &published.app;

  if json {
    let rejected: Vec<_> = published
      .rejected
      .iter()
      .map(|r| serde_json::json!({ "location": r.location, "error": r.error.to_string() }))
      .collect();
    let json_output = serde_json::json!({
      "appID": app.app_info.id,
      "transformations": app.transformations.iter().map(|t| &t.id).collect::<Vec<_>>(),
      "providers": app.app_info.providers,
      "rejected": rejected,
    });
    return print_json(&json_output);
  }

  print_success(&format!("Published {} {}", app.app_info.name, app.app_info.version));
  print_stat("App ID", &app.app_info.id);
  print_stat("Transformations", &app.transformations.len().to_string());
  for provider in &app.app_info.providers {
    print_stat("Provider", &format!("{} ({})", provider.qname, short_id(&provider.pkg_id)));
  }
  for t in &app.transformations {
    println!("  {} {} {} {}", symbols::INFO, t.qname, symbols::ARROW, t.id);
  }
  for rejected in &published.rejected {
    print_warning(&format!("Skipped {}: {}", rejected.location, rejected.error));
  }

  Ok(())
}

/// URLs pass through untouched; local paths are made absolute.
fn resolve_source(source: &str) -> Result<String> {
  if source.starts_with("http://") || source.starts_with("https://") {
    return Ok(source.to_string());
  }
  let path = dunce::canonicalize(Path::new(source)).with_context(|| format!("Package not found: {}", source))?;
  Ok(path.to_string_lossy().into_owned())
}
