//! Container runtime boundary.
//!
//! The executor and the publisher only talk to containers through
//! [`ContainerRuntime`]. [`DockerCli`] implements it on top of the `docker`
//! command-line client.

mod docker;

use std::io;
use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

pub use docker::DockerCli;

#[derive(Debug, Error)]
pub enum RuntimeError {
  #[error("failed to run {program}: {source}")]
  Spawn {
    program: String,
    #[source]
    source: io::Error,
  },

  #[error("{command} failed with exit code {code:?}: {stderr}")]
  CommandFailed {
    command: String,
    code: Option<i32>,
    stderr: String,
  },

  #[error("unexpected output from {command}: {output:?}")]
  InvalidOutput { command: String, output: String },
}

/// Image build, container lifecycle and archive copy primitives.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
  /// Build an image from the build context at `context`, returning the image id.
  async fn build_image(&self, context: &Path, tag: &str) -> Result<String, RuntimeError>;

  /// Resolve an image reference (tag or id) to its id.
  async fn image_id(&self, reference: &str) -> Result<String, RuntimeError>;

  /// Create a container from `image` that runs `command` under `/bin/sh -c`.
  async fn create_container(&self, image: &str, command: &str) -> Result<String, RuntimeError>;

  async fn start_container(&self, id: &str) -> Result<(), RuntimeError>;

  /// Block until the container exits and return its exit code.
  async fn wait_container(&self, id: &str) -> Result<i64, RuntimeError>;

  async fn remove_container(&self, id: &str) -> Result<(), RuntimeError>;

  /// Runtime-reported status, e.g. `created`, `running` or `exited`.
  async fn container_status(&self, id: &str) -> Result<String, RuntimeError>;

  /// Extract a tar archive into the existing directory `path` of the container.
  async fn put_archive(&self, id: &str, path: &str, archive: Vec<u8>) -> Result<(), RuntimeError>;

  /// Tar up `path` of the container.
  async fn get_archive(&self, id: &str, path: &str) -> Result<Vec<u8>, RuntimeError>;
}
