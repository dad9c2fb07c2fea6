//! Crate-level error with a machine-checkable kind.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;
use crate::execute::ExecuteError;
use crate::fetch::FetchError;
use crate::materialize::MaterializeError;
use crate::publish::PublishError;
use crate::runtime::RuntimeError;
use crate::spec::SpecError;
use crate::status::StatusError;
use crate::store::StoreError;
use crate::template::TemplateError;

/// Broad category of a failure, stable enough for callers to branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
  /// A specification document is missing or has an invalid field.
  SpecValidation,
  /// Task inputs could not be bound or fetched.
  Materialization,
  /// The invocation command could not be rendered.
  Templating,
  /// The container run itself went wrong.
  Execution,
  /// A store, container runtime or other external collaborator failed.
  Integration,
  /// A referenced application, transformation or task does not exist.
  NotFound,
}

impl std::fmt::Display for ErrorKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let name = match self {
      ErrorKind::SpecValidation => "spec validation",
      ErrorKind::Materialization => "materialization",
      ErrorKind::Templating => "templating",
      ErrorKind::Execution => "execution",
      ErrorKind::Integration => "integration",
      ErrorKind::NotFound => "not found",
    };
    f.write_str(name)
  }
}

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Spec(#[from] SpecError),

  #[error(transparent)]
  Materialize(#[from] MaterializeError),

  #[error(transparent)]
  Template(#[from] TemplateError),

  #[error(transparent)]
  Execute(#[from] ExecuteError),

  #[error(transparent)]
  Store(#[from] StoreError),

  #[error(transparent)]
  Runtime(#[from] RuntimeError),

  #[error(transparent)]
  Fetch(#[from] FetchError),

  #[error(transparent)]
  Status(#[from] StatusError),

  #[error(transparent)]
  Publish(#[from] PublishError),

  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error("application {0} not found")]
  AppNotFound(String),

  #[error("transformation {transformation_id} not found in application {app_id}")]
  TransformationNotFound { app_id: String, transformation_id: String },

  #[error("transformation {0} not found")]
  UnknownTransformation(String),

  #[error("application {0} has no provider to run on")]
  NoProvider(String),
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Error::Spec(_) => ErrorKind::SpecValidation,
      Error::Materialize(_) => ErrorKind::Materialization,
      Error::Template(_) => ErrorKind::Templating,
      Error::Execute(e) => e.kind(),
      Error::Publish(e) => e.kind(),
      Error::Status(StatusError::NotFound(_)) => ErrorKind::NotFound,
      Error::Store(_) | Error::Runtime(_) | Error::Fetch(_) | Error::Status(_) | Error::Config(_) => {
        ErrorKind::Integration
      }
      Error::AppNotFound(_) | Error::TransformationNotFound { .. } | Error::UnknownTransformation(_) => {
        ErrorKind::NotFound
      }
      Error::NoProvider(_) => ErrorKind::Execution,
    }
  }
}
