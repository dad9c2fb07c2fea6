//! JSON-file document store.
//!
//! # Layout
//!
//! ```text
//! {db_dir}/
//! ├── applications/
//! │   └── <key>.json      # ApplicationSpec, key derived from the app id
//! └── transformations/
//!     └── <id>.json       # Transformation, file name is its id
//! ```
//!
//! Writes are atomic (write to a temp file, then rename). Lookups by signature
//! and qualified name scan the transformations directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::{DocumentStore, SignatureKind, StoreError};
use crate::spec::{ApplicationSpec, Transformation};

const APPLICATIONS_DIR: &str = "applications";
const TRANSFORMATIONS_DIR: &str = "transformations";

/// Length of the hex keys used for file names and transformation ids.
const KEY_LEN: usize = 24;

#[derive(Debug, Clone)]
pub struct JsonStore {
  base_path: PathBuf,
}

impl JsonStore {
  pub fn new(base_path: PathBuf) -> Self {
    Self { base_path }
  }

  pub fn base_path(&self) -> &Path {
    &self.base_path
  }

  fn app_path(&self, app_id: &str) -> PathBuf {
    self
      .base_path
      .join(APPLICATIONS_DIR)
      .join(format!("{}.json", key(&[app_id])))
  }

  fn transformation_path(&self, id: &str) -> PathBuf {
    self.base_path.join(TRANSFORMATIONS_DIR).join(format!("{}.json", id))
  }

  fn transformations(&self) -> Result<Vec<Transformation>, StoreError> {
    read_all(&self.base_path.join(TRANSFORMATIONS_DIR))
  }

  fn find_transformations(&self, predicate: impl Fn(&Transformation) -> bool) -> Result<Vec<Transformation>, StoreError> {
    Ok(self.transformations()?.into_iter().filter(|t| predicate(t)).collect())
  }
}

impl DocumentStore for JsonStore {
  fn insert_app(&self, app: &ApplicationSpec) -> Result<(), StoreError> {
    let path = self.app_path(&app.app_info.id);
    write_document(&path, app)?;
    debug!(app_id = %app.app_info.id, path = %path.display(), "stored application");
    Ok(())
  }

  fn find_app(&self, app_id: &str) -> Result<Option<ApplicationSpec>, StoreError> {
    read_document(&self.app_path(app_id))
  }

  fn list_apps(&self) -> Result<Vec<ApplicationSpec>, StoreError> {
    let mut apps: Vec<ApplicationSpec> = read_all(&self.base_path.join(APPLICATIONS_DIR))?;
    apps.sort_by(|a, b| a.app_info.id.cmp(&b.app_info.id));
    Ok(apps)
  }

  fn delete_app(&self, app_id: &str) -> Result<bool, StoreError> {
    remove_document(&self.app_path(app_id))
  }

  fn insert_transformation(&self, transformation: &Transformation) -> Result<String, StoreError> {
    let id = key(&[&transformation.app_id, &transformation.name]);
    let mut document = transformation.clone();
    document.id = id.clone();

    write_document(&self.transformation_path(&id), &document)?;
    debug!(id = %id, app_id = %transformation.app_id, name = %transformation.name, "stored transformation");
    Ok(id)
  }

  fn find_transformation(&self, id: &str) -> Result<Option<Transformation>, StoreError> {
    // Ids are hex keys; anything else cannot name a document.
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_hexdigit()) {
      return Ok(None);
    }
    read_document(&self.transformation_path(id))
  }

  fn find_by_signature(&self, signature: &str, kind: SignatureKind) -> Result<Vec<Transformation>, StoreError> {
    self.find_transformations(|t| match kind {
      SignatureKind::Strict => t.strict_signature == signature,
      SignatureKind::Relaxed => t.relaxed_signature == signature,
    })
  }

  fn find_by_qname(&self, qname: &str) -> Result<Vec<Transformation>, StoreError> {
    self.find_transformations(|t| t.qname == qname)
  }

  fn delete_transformations(&self, app_id: &str) -> Result<usize, StoreError> {
    let mut removed = 0;
    for transformation in self.find_transformations(|t| t.app_id == app_id)? {
      if remove_document(&self.transformation_path(&transformation.id))? {
        removed += 1;
      }
    }
    Ok(removed)
  }
}

/// Truncated SHA-256 of the given parts, separated by newlines.
fn key(parts: &[&str]) -> String {
  let mut hasher = Sha256::new();
  for (i, part) in parts.iter().enumerate() {
    if i > 0 {
      hasher.update(b"\n");
    }
    hasher.update(part.as_bytes());
  }
  let full = hex::encode(hasher.finalize());
  full[..KEY_LEN].to_string()
}

fn write_document<T: Serialize>(path: &Path, document: &T) -> Result<(), StoreError> {
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
      path: parent.to_path_buf(),
      source,
    })?;
  }

  let content = serde_json::to_string_pretty(document).map_err(StoreError::Serialize)?;
  let temp_path = path.with_extension("json.tmp");
  let write_err = |source: io::Error| StoreError::Write {
    path: path.to_path_buf(),
    source,
  };
  fs::write(&temp_path, content).map_err(write_err)?;
  fs::rename(&temp_path, path).map_err(write_err)?;
  Ok(())
}

fn read_document<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
  let content = match fs::read_to_string(path) {
    Ok(content) => content,
    Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
    Err(source) => {
      return Err(StoreError::Read {
        path: path.to_path_buf(),
        source,
      });
    }
  };

  serde_json::from_str(&content).map(Some).map_err(|source| StoreError::Parse {
    path: path.to_path_buf(),
    source,
  })
}

fn read_all<T: DeserializeOwned>(dir: &Path) -> Result<Vec<T>, StoreError> {
  let entries = match fs::read_dir(dir) {
    Ok(entries) => entries,
    Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
    Err(source) => {
      return Err(StoreError::Read {
        path: dir.to_path_buf(),
        source,
      });
    }
  };

  let mut documents = Vec::new();
  for entry in entries {
    let entry = entry.map_err(|source| StoreError::Read {
      path: dir.to_path_buf(),
      source,
    })?;
    let path = entry.path();
    if path.extension().and_then(|e| e.to_str()) != Some("json") {
      continue;
    }
    match read_document(&path) {
      Ok(Some(document)) => documents.push(document),
      Ok(None) => {}
      Err(e @ StoreError::Parse { .. }) => warn!(error = %e, "skipping unreadable document"),
      Err(e) => return Err(e),
    }
  }
  Ok(documents)
}

fn remove_document(path: &Path) -> Result<bool, StoreError> {
  match fs::remove_file(path) {
    Ok(()) => Ok(true),
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
    Err(source) => Err(StoreError::Write {
      path: path.to_path_buf(),
      source,
    }),
  }
}
