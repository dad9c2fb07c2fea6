//! Delivery of task outputs to a consumer's results endpoint.

use std::path::{Path, PathBuf};

use reqwest::header::CONTENT_TYPE;
use tracing::{info, warn};

use super::FetchError;

/// POST one file's raw bytes to `endpoint`.
pub async fn deliver_file(client: &reqwest::Client, endpoint: &str, path: &Path) -> Result<(), FetchError> {
  let data = tokio::fs::read(path).await.map_err(|source| FetchError::Io {
    path: path.to_path_buf(),
    source,
  })?;

  let response = client
    .post(endpoint)
    .header(CONTENT_TYPE, "application/octet-stream")
    .body(data)
    .send()
    .await
    .map_err(|source| FetchError::Request {
      url: endpoint.to_string(),
      source,
    })?;

  if !response.status().is_success() {
    return Err(FetchError::Status {
      url: endpoint.to_string(),
      status: response.status().as_u16(),
    });
  }
  Ok(())
}

/// POST every file to `endpoint`, one request per file, in order.
///
/// Failed deliveries are logged and not retried. Returns how many files were delivered.
pub async fn deliver_results(client: &reqwest::Client, endpoint: &str, files: &[PathBuf]) -> usize {
  let mut delivered = 0;
  for file in files {
    match deliver_file(client, endpoint, file).await {
      Ok(()) => {
        info!(endpoint = %endpoint, file = %file.display(), "delivered result");
        delivered += 1;
      }
      Err(e) => warn!(endpoint = %endpoint, file = %file.display(), error = %e, "failed to deliver result"),
    }
  }
  delivered
}
