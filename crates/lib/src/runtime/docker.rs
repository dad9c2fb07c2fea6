//! [`ContainerRuntime`] backed by the `docker` CLI.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use super::{ContainerRuntime, RuntimeError};

#[derive(Debug, Clone)]
pub struct DockerCli {
  program: String,
}

impl Default for DockerCli {
  fn default() -> Self {
    Self::new("docker")
  }
}

impl DockerCli {
  /// Use `program` as the docker client binary.
  pub fn new(program: impl Into<String>) -> Self {
    Self {
      program: program.into(),
    }
  }

  /// Run the client with `args`, feeding `stdin` if given, and return stdout.
  async fn run(&self, args: &[&str], stdin: Option<Vec<u8>>) -> Result<Vec<u8>, RuntimeError> {
    let command_name = format!("{} {}", self.program, args.first().copied().unwrap_or_default());
    debug!(program = %self.program, args = ?args, "running container client");

    let mut command = Command::new(&self.program);
    command
      .args(args)
      .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true);

    let spawn_err = |source: std::io::Error| RuntimeError::Spawn {
      program: self.program.clone(),
      source,
    };
    let mut child = command.spawn().map_err(spawn_err)?;

    if let Some(input) = stdin
      && let Some(mut pipe) = child.stdin.take()
    {
      pipe.write_all(&input).await.map_err(spawn_err)?;
      pipe.shutdown().await.map_err(spawn_err)?;
    }

    let output = child.wait_with_output().await.map_err(spawn_err)?;
    if !output.status.success() {
      return Err(RuntimeError::CommandFailed {
        command: command_name,
        code: output.status.code(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
      });
    }
    Ok(output.stdout)
  }

  async fn run_text(&self, args: &[&str]) -> Result<String, RuntimeError> {
    let stdout = self.run(args, None).await?;
    Ok(String::from_utf8_lossy(&stdout).trim().to_string())
  }

  fn invalid(&self, subcommand: &str, output: String) -> RuntimeError {
    RuntimeError::InvalidOutput {
      command: format!("{} {}", self.program, subcommand),
      output,
    }
  }
}

#[async_trait]
impl ContainerRuntime for DockerCli {
  async fn build_image(&self, context: &Path, tag: &str) -> Result<String, RuntimeError> {
    info!(context = %context.display(), tag = %tag, "building image");
    let context = context.to_string_lossy();
    let output = self.run_text(&["build", "-q", "-t", tag, &context]).await?;
    // Quiet builds print the image id as their last line.
    let id = output.lines().last().unwrap_or_default().trim().to_string();
    if id.is_empty() {
      return Err(self.invalid("build", output));
    }
    Ok(id)
  }

  async fn image_id(&self, reference: &str) -> Result<String, RuntimeError> {
    self.run_text(&["image", "inspect", "-f", "{{.Id}}", reference]).await
  }

  async fn create_container(&self, image: &str, command: &str) -> Result<String, RuntimeError> {
    let id = self.run_text(&["create", image, "/bin/sh", "-c", command]).await?;
    if id.is_empty() {
      return Err(self.invalid("create", id));
    }
    info!(image = %image, container = %id, "created container");
    Ok(id)
  }

  async fn start_container(&self, id: &str) -> Result<(), RuntimeError> {
    self.run(&["start", id], None).await?;
    Ok(())
  }

  async fn wait_container(&self, id: &str) -> Result<i64, RuntimeError> {
    let output = self.run_text(&["wait", id]).await?;
    output.parse().map_err(|_| self.invalid("wait", output))
  }

  async fn remove_container(&self, id: &str) -> Result<(), RuntimeError> {
    self.run(&["rm", "-v", id], None).await?;
    info!(container = %id, "removed container");
    Ok(())
  }

  async fn container_status(&self, id: &str) -> Result<String, RuntimeError> {
    self.run_text(&["inspect", "-f", "{{.State.Status}}", id]).await
  }

  async fn put_archive(&self, id: &str, path: &str, archive: Vec<u8>) -> Result<(), RuntimeError> {
    let target = format!("{}:{}", id, path);
    self.run(&["cp", "-", &target], Some(archive)).await?;
    Ok(())
  }

  async fn get_archive(&self, id: &str, path: &str) -> Result<Vec<u8>, RuntimeError> {
    let source = format!("{}:{}", id, path);
    self.run(&["cp", &source, "-"], None).await
  }
}
