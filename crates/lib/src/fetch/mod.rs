//! Remote archive fetching and results delivery.

mod archive;
mod deliver;

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;
use tracing::{debug, info};

pub use archive::{ArchiveKind, pack_dir, pack_dir_gz, pack_file, unpack};
pub use deliver::{deliver_file, deliver_results};

#[derive(Debug, Error)]
pub enum FetchError {
  #[error("request to {url} failed: {source}")]
  Request {
    url: String,
    #[source]
    source: reqwest::Error,
  },

  #[error("request to {url} failed: HTTP {status}")]
  Status { url: String, status: u16 },

  #[error("cannot determine archive format of {url} (content type {content_type:?})")]
  UnknownFormat { url: String, content_type: Option<String> },

  #[error("I/O error at {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to extract {path}: {message}")]
  Extract { path: PathBuf, message: String },
}

/// Downloads remote inputs: archives to extract and single files to keep as-is.
#[async_trait]
pub trait ArchiveFetcher: Send + Sync {
  /// Download the archive at `url` and extract its contents into `dest`.
  ///
  /// The downloaded archive itself is removed once extracted.
  async fn fetch_archive(&self, url: &str, dest: &Path) -> Result<(), FetchError>;

  /// Download the file at `url` to the file path `dest`, creating parent directories.
  async fn fetch_file(&self, url: &str, dest: &Path) -> Result<(), FetchError>;
}

/// [`ArchiveFetcher`] over HTTP(S).
///
/// The archive format comes from the response content type, then the URL
/// suffix, then the leading bytes of the body.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
  client: reqwest::Client,
}

impl HttpFetcher {
  pub fn new(client: reqwest::Client) -> Self {
    Self { client }
  }
}

#[async_trait]
impl ArchiveFetcher for HttpFetcher {
  async fn fetch_archive(&self, url: &str, dest: &Path) -> Result<(), FetchError> {
    info!(url = %url, dest = %dest.display(), "fetching archive");

    let request_err = |source: reqwest::Error| FetchError::Request {
      url: url.to_string(),
      source,
    };

    let response = self.client.get(url).send().await.map_err(request_err)?;
    if !response.status().is_success() {
      return Err(FetchError::Status {
        url: url.to_string(),
        status: response.status().as_u16(),
      });
    }

    let content_type = response
      .headers()
      .get(CONTENT_TYPE)
      .and_then(|v| v.to_str().ok())
      .map(str::to_string);
    let bytes = response.bytes().await.map_err(request_err)?;

    let kind = content_type
      .as_deref()
      .and_then(ArchiveKind::from_content_type)
      .or_else(|| ArchiveKind::from_name(url))
      .or_else(|| ArchiveKind::sniff(&bytes))
      .ok_or_else(|| FetchError::UnknownFormat {
        url: url.to_string(),
        content_type: content_type.clone(),
      })?;
    debug!(url = %url, content_type = ?content_type, kind = ?kind, "resolved archive format");

    let io_err = |path: &Path| {
      let path = path.to_path_buf();
      move |source: io::Error| FetchError::Io { path, source }
    };

    tokio::fs::create_dir_all(dest).await.map_err(io_err(dest))?;
    let archive_path = dest.join(format!("archive.{}", kind.extension()));
    tokio::fs::write(&archive_path, &bytes).await.map_err(io_err(&archive_path))?;

    let (src, target) = (archive_path.clone(), dest.to_path_buf());
    tokio::task::spawn_blocking(move || unpack(&src, kind, &target))
      .await
      .map_err(|e| FetchError::Extract {
        path: archive_path.clone(),
        message: e.to_string(),
      })??;

    tokio::fs::remove_file(&archive_path)
      .await
      .map_err(io_err(&archive_path))?;

    info!(url = %url, size = bytes.len(), "archive extracted");
    Ok(())
  }

  async fn fetch_file(&self, url: &str, dest: &Path) -> Result<(), FetchError> {
    info!(url = %url, dest = %dest.display(), "fetching file");

    let request_err = |source: reqwest::Error| FetchError::Request {
      url: url.to_string(),
      source,
    };
    let response = self.client.get(url).send().await.map_err(request_err)?;
    if !response.status().is_success() {
      return Err(FetchError::Status {
        url: url.to_string(),
        status: response.status().as_u16(),
      });
    }
    let bytes = response.bytes().await.map_err(request_err)?;

    let io_err = |source: io::Error| FetchError::Io {
      path: dest.to_path_buf(),
      source,
    };
    if let Some(parent) = dest.parent() {
      tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }
    tokio::fs::write(dest, &bytes).await.map_err(io_err)?;
    debug!(url = %url, size = bytes.len(), "file downloaded");
    Ok(())
  }
}
