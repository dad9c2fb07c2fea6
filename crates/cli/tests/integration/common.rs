//! Shared test helpers for CLI integration tests.

use std::path::PathBuf;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::{Value, json};
use tempfile::TempDir;

/// Isolated test environment.
///
/// Each test gets its own temporary root, so the repository, document store
/// and task workspaces never leak between tests.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  pub fn new() -> Self {
    Self {
      temp: TempDir::new().unwrap(),
    }
  }

  /// Write a file relative to the temp directory.
  pub fn write_file(&self, relative_path: &str, content: &str) -> PathBuf {
    let path = self.temp.path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
  }

  /// Root the binary works in.
  pub fn root_path(&self) -> PathBuf {
    let p = self.temp.path().join("hdtapps");
    std::fs::create_dir_all(&p).unwrap();
    dunce::canonicalize(&p).unwrap_or(p)
  }

  /// Write a package directory holding `document` and return its path.
  pub fn package(&self, document: &Value) -> PathBuf {
    self.write_file("package/app/run.sh", "echo converting");
    self.write_file("package/app-spec.json", &serde_json::to_string_pretty(document).unwrap());
    self.temp.path().join("package")
  }

  /// Get a pre-configured Command for the hdt binary.
  ///
  /// Sets `HDTAPPS_ROOT` to the isolated root and points `HDTAPPS_CONFIG` at a
  /// file that does not exist, so no user configuration is picked up.
  pub fn hdt_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("hdt");
    cmd.env("HDTAPPS_ROOT", self.root_path());
    cmd.env("HDTAPPS_CONFIG", self.temp.path().join("config.toml"));
    cmd
  }

  /// Run hdt with `args` and parse its stdout as JSON. Panics if the command fails.
  pub fn json(&self, args: &[&str]) -> Value {
    let output = self.hdt_cmd().args(args).arg("--json").output().unwrap();
    assert!(
      output.status.success(),
      "hdt {:?} failed: {}",
      args,
      String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
  }

  /// Publish `document` without deploying and return the JSON summary.
  pub fn publish(&self, document: &Value) -> Value {
    let package = self.package(document);
    self.json(&["publish", package.to_str().unwrap()])
  }
}

/// Specification of a converter with one string parameter, one input file and one output.
pub fn converter_spec() -> Value {
  json!({
    "appInfo": {
      "appName": "Converter",
      "appVersion": "0.9",
      "appPublisher": "Imaging Group",
      "appDevelopers": ["Grace Hopper"],
      "tags": ["imaging"]
    },
    "transformations": [{
      "name": "convert",
      "qname": "imaging.converter.convert",
      "inputParams": [
        {"inputName": "mode", "alias": "$mode", "type": "string", "isOptional": false}
      ],
      "inputFiles": [
        {"inputName": "source", "alias": "$src", "format": "tif", "requiredPath": "{r}/in/", "isOptional": false}
      ],
      "outputFiles": [
        {"outputName": "converted", "alias": "$dst", "format": "png", "accessPath": "{r}/out/"}
      ]
    }],
    "invocations": {"invocationsCLI": [{"invName": "run", "command": "sh run.sh $mode $src $dst"}]}
  })
}
