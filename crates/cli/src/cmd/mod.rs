mod app;
mod delete;
mod find;
mod publish;
mod status;
mod submit;
mod transformation;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use hdtapps_lib::config::Config;
use hdtapps_lib::fetch::HttpFetcher;
use hdtapps_lib::publish::Publisher;
use hdtapps_lib::runtime::DockerCli;
use hdtapps_lib::store::JsonStore;
use hdtapps_lib::task::TaskManager;

pub use app::cmd_app;
pub use delete::cmd_delete;
pub use find::{FindArgs, cmd_find};
pub use publish::cmd_publish;
pub use status::cmd_status;
pub use submit::cmd_submit;
pub use transformation::cmd_transformation;

/// Publisher and task manager sharing one store, runtime and fetcher.
struct Services {
  publisher: Publisher,
  tasks: TaskManager,
}

impl Services {
  fn load(root: Option<PathBuf>) -> Result<Self> {
    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(root) = root {
      config.root = root;
    }
    tracing::debug!(root = %config.root.display(), docker = %config.docker, "resolved configuration");

    let layout = config.layout();
    let store = Arc::new(JsonStore::new(layout.db_dir()));
    let runtime = Arc::new(DockerCli::new(config.docker.clone()));
    let client = reqwest::Client::new();
    let fetcher = Arc::new(HttpFetcher::new(client.clone()));

    Ok(Self {
      publisher: Publisher::new(
        store.clone(),
        runtime.clone(),
        fetcher.clone(),
        layout.clone(),
        config.image_prefix.clone(),
      ),
      tasks: TaskManager::new(store, runtime, fetcher, layout, client),
    })
  }
}
