//! Document store for published applications and transformations.
//!
//! Applications are keyed by their derived id. Transformations are keyed by a
//! store-assigned id and can also be looked up by signature or qualified name.

mod json;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::spec::{ApplicationSpec, Transformation};

pub use json::JsonStore;

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("failed to create store directory {path}: {source}")]
  CreateDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to read document {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to write document {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse document {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("failed to serialize document: {0}")]
  Serialize(#[source] serde_json::Error),
}

/// Which of a transformation's two signatures a lookup matches against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureKind {
  Strict,
  Relaxed,
}

/// Persistence boundary for the catalog.
///
/// Implementations are shared across concurrently running tasks, so every
/// operation takes `&self`.
pub trait DocumentStore: Send + Sync {
  /// Insert or replace an application document.
  fn insert_app(&self, app: &ApplicationSpec) -> Result<(), StoreError>;

  fn find_app(&self, app_id: &str) -> Result<Option<ApplicationSpec>, StoreError>;

  fn list_apps(&self) -> Result<Vec<ApplicationSpec>, StoreError>;

  /// Returns `false` when no application had that id.
  fn delete_app(&self, app_id: &str) -> Result<bool, StoreError>;

  /// Insert or replace a transformation, returning its assigned id.
  fn insert_transformation(&self, transformation: &Transformation) -> Result<String, StoreError>;

  fn find_transformation(&self, id: &str) -> Result<Option<Transformation>, StoreError>;

  fn find_by_signature(&self, signature: &str, kind: SignatureKind) -> Result<Vec<Transformation>, StoreError>;

  fn find_by_qname(&self, qname: &str) -> Result<Vec<Transformation>, StoreError>;

  /// Remove every transformation of an application, returning how many were removed.
  fn delete_transformations(&self, app_id: &str) -> Result<usize, StoreError>;
}
