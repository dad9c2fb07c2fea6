mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// hdt - application repository and transformation task manager
#[derive(Parser)]
#[command(name = "hdt")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable debug logging
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Root directory for the repository and task workspaces
  #[arg(long, global = true, env = "HDTAPPS_ROOT")]
  root: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Publish an application package from a local directory or an archive URL
  Publish {
    /// Package directory, or http(s) URL of a tar, tar.gz or zip archive
    source: String,

    /// Label of the temporary folder used while publishing
    #[arg(long)]
    name: Option<String>,

    /// Build the container image and register it as a provider
    #[arg(long)]
    deploy: bool,

    /// Provider name recorded for the built image
    #[arg(long, requires = "deploy")]
    provider: Option<String>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
  },

  /// Show a published application, or list all of them
  App {
    /// Application id; lists every application when omitted
    app_id: Option<String>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
  },

  /// Delete a published application and its transformations
  Delete {
    app_id: String,

    /// Output as JSON
    #[arg(long)]
    json: bool,
  },

  /// Show a transformation by id
  Transformation {
    transformation_id: String,

    /// Output as JSON
    #[arg(long)]
    json: bool,
  },

  /// Find transformations by qualified name or signature
  Find(cmd::FindArgs),

  /// Run a transformation from a task request document
  Submit {
    /// Path to the task request JSON, or `-` for stdin
    request: PathBuf,

    /// Output as JSON
    #[arg(long)]
    json: bool,
  },

  /// Show the status of a task
  Status {
    task_id: String,

    /// Output as JSON
    #[arg(long)]
    json: bool,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();

  let filter = if cli.verbose {
    EnvFilter::new("debug")
  } else {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
  };
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let root = cli.root;
  match cli.command {
    Commands::Publish {
      source,
      name,
      deploy,
      provider,
      json,
    } => cmd::cmd_publish(root, &source, name, deploy, provider, json).await,
    Commands::App { app_id, json } => cmd::cmd_app(root, app_id.as_deref(), json),
    Commands::Delete { app_id, json } => cmd::cmd_delete(root, &app_id, json),
    Commands::Transformation {
      transformation_id,
      json,
    } => cmd::cmd_transformation(root, &transformation_id, json),
    Commands::Find(args) => cmd::cmd_find(root, &args),
    Commands::Submit { request, json } => cmd::cmd_submit(root, &request, json).await,
    Commands::Status { task_id, json } => cmd::cmd_status(root, &task_id, json),
  }
}
