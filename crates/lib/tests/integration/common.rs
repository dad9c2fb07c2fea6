//! Shared helpers for library integration tests.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use hdtapps_lib::fetch::HttpFetcher;
use hdtapps_lib::platform::paths::Layout;
use hdtapps_lib::publish::Publisher;
use hdtapps_lib::runtime::{ContainerRuntime, RuntimeError};
use hdtapps_lib::status::TaskStatus;
use hdtapps_lib::store::JsonStore;
use hdtapps_lib::task::TaskManager;
use serde_json::{Value, json};
use tempfile::TempDir;

/// Container runtime that "runs" a command by looking up a canned outcome.
///
/// Outcomes are keyed by the rendered command. A command with no outcome exits 127.
#[derive(Default)]
pub struct StubRuntime {
  outcomes: BTreeMap<String, (i64, Vec<(String, String)>)>,
  state: Mutex<StubState>,
}

#[derive(Default)]
struct StubState {
  containers: BTreeMap<String, String>,
  removed: Vec<String>,
  images: Vec<String>,
}

impl StubRuntime {
  /// When `command` runs, exit with `code` and expose `files` as `(container path, content)`.
  pub fn on(mut self, command: &str, code: i64, files: &[(&str, &str)]) -> Self {
    let files = files.iter().map(|(p, c)| (p.to_string(), c.to_string())).collect();
    self.outcomes.insert(command.to_string(), (code, files));
    self
  }

  pub fn removed(&self) -> Vec<String> {
    self.state.lock().unwrap().removed.clone()
  }

  pub fn images(&self) -> Vec<String> {
    self.state.lock().unwrap().images.clone()
  }

  fn command_of(&self, id: &str) -> String {
    self.state.lock().unwrap().containers.get(id).cloned().unwrap_or_default()
  }
}

fn failed(command: &str) -> RuntimeError {
  RuntimeError::CommandFailed {
    command: command.to_string(),
    code: Some(1),
    stderr: "stub".to_string(),
  }
}

#[async_trait]
impl ContainerRuntime for StubRuntime {
  async fn build_image(&self, _context: &Path, tag: &str) -> Result<String, RuntimeError> {
    self.state.lock().unwrap().images.push(tag.to_string());
    Ok(format!("sha256:{}", tag.len()))
  }

  async fn image_id(&self, reference: &str) -> Result<String, RuntimeError> {
    Ok(reference.to_string())
  }

  async fn create_container(&self, _image: &str, command: &str) -> Result<String, RuntimeError> {
    let mut state = self.state.lock().unwrap();
    let id = format!("ctr{}", state.containers.len() + 1);
    state.containers.insert(id.clone(), command.to_string());
    Ok(id)
  }

  async fn start_container(&self, _id: &str) -> Result<(), RuntimeError> {
    Ok(())
  }

  async fn wait_container(&self, id: &str) -> Result<i64, RuntimeError> {
    Ok(self.outcomes.get(&self.command_of(id)).map(|(code, _)| *code).unwrap_or(127))
  }

  async fn remove_container(&self, id: &str) -> Result<(), RuntimeError> {
    self.state.lock().unwrap().removed.push(id.to_string());
    Ok(())
  }

  async fn container_status(&self, _id: &str) -> Result<String, RuntimeError> {
    Ok("running".to_string())
  }

  async fn put_archive(&self, _id: &str, _path: &str, _archive: Vec<u8>) -> Result<(), RuntimeError> {
    Ok(())
  }

  async fn get_archive(&self, id: &str, path: &str) -> Result<Vec<u8>, RuntimeError> {
    let (_, files) = self.outcomes.get(&self.command_of(id)).ok_or_else(|| failed("docker cp"))?;
    let (_, content) = files.iter().find(|(p, _)| p == path).ok_or_else(|| failed("docker cp"))?;
    let name = path.rsplit('/').next().unwrap_or(path);

    let mut builder = tar::Builder::new(Vec::new());
    let mut header = tar::Header::new_gnu();
    header.set_size(content.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append_data(&mut header, name, content.as_bytes()).unwrap();
    Ok(builder.into_inner().unwrap())
  }
}

/// A full service wired the way the CLI wires it, with a stubbed container runtime.
pub struct TestService {
  pub temp: TempDir,
  pub layout: Layout,
  pub runtime: Arc<StubRuntime>,
  pub publisher: Publisher,
  pub tasks: Arc<TaskManager>,
}

impl TestService {
  pub fn new(runtime: StubRuntime) -> Self {
    let temp = TempDir::new().unwrap();
    let layout = Layout::new(temp.path().join("root"));
    let store = Arc::new(JsonStore::new(layout.db_dir()));
    let runtime = Arc::new(runtime);
    let fetcher = Arc::new(HttpFetcher::default());

    let publisher = Publisher::new(
      store.clone(),
      runtime.clone(),
      fetcher.clone(),
      layout.clone(),
      "hdtapps/",
    );
    let tasks = Arc::new(TaskManager::new(
      store,
      runtime.clone(),
      fetcher,
      layout.clone(),
      reqwest::Client::new(),
    ));

    Self {
      temp,
      layout,
      runtime,
      publisher,
      tasks,
    }
  }

  /// Write a package directory holding `document` and return its path.
  pub fn package(&self, document: &Value) -> PathBuf {
    let dir = self.temp.path().join("package");
    fs::create_dir_all(dir.join("app")).unwrap();
    fs::write(dir.join("app").join("run.py"), "print('simulating')").unwrap();
    fs::write(dir.join("app-spec.json"), serde_json::to_string_pretty(document).unwrap()).unwrap();
    dir
  }

  /// Poll until the task reaches a terminal state.
  pub async fn wait_for(&self, task_id: &str) -> TaskStatus {
    for _ in 0..200 {
      let status = self.tasks.status(task_id).unwrap();
      if status.state.is_terminal() {
        return status;
      }
      tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("task {} did not finish", task_id);
  }
}

/// Specification of a simulator with one numeric parameter and one text output.
pub fn simulator_spec() -> Value {
  json!({
    "appInfo": {
      "appName": "Simulator",
      "appVersion": "2.1",
      "appPublisher": "Fluid Lab",
      "appDevelopers": ["Ada Lovelace"],
      "appLicense": "MIT",
      "tags": ["cfd"]
    },
    "transformations": [{
      "name": "simulate",
      "qname": "lab.simulator.simulate",
      "inputParams": [
        {"inputName": "steps", "alias": "$n", "type": "integer", "isOptional": false}
      ],
      "inputFileSets": [
        {"inputName": "frames", "alias": "$frames", "format": "png", "requiredPath": "{r}/frames/", "isOptional": true}
      ],
      "outputFiles": [
        {"outputName": "result", "alias": "$result", "format": "txt", "accessPath": "{r}/out/"}
      ]
    }],
    "dependencies": {
      "envDeps": [{"depName": "SIM_HOME", "alias": "$home", "value": "/app"}],
      "softDeps": [{"depName": "python", "alias": "$py", "commands": ["apt-get update", "apt-get install -y python"]}]
    },
    "invocations": {"invocationsCLI": [{"invName": "run", "command": "python run.py $n"}]}
  })
}
