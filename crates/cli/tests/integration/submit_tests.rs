//! Task submission failures that surface before any container is created.

use predicates::prelude::*;
use serde_json::json;

use super::common::{TestEnv, converter_spec};

#[test]
fn submit_for_unknown_app_fails() {
  let env = TestEnv::new();
  let request = json!({"appID": "nobody_nothing_1.0", "transformationID": "x"});
  let path = env.write_file("request.json", &request.to_string());

  env
    .hdt_cmd()
    .arg("submit")
    .arg(&path)
    .assert()
    .failure()
    .stderr(predicate::str::contains("nobody_nothing_1.0"));
}

#[test]
fn submit_without_provider_fails() {
  let env = TestEnv::new();
  let summary = env.publish(&converter_spec());
  let request = json!({
    "appID": summary["appID"],
    "transformationID": summary["transformations"][0],
    "inputParams": [{"paramType": "string", "value": "gray"}],
  });

  env
    .hdt_cmd()
    .args(["submit", "-"])
    .write_stdin(request.to_string())
    .assert()
    .failure()
    .stderr(predicate::str::contains("provider"));
}

#[test]
fn malformed_request_is_rejected() {
  let env = TestEnv::new();
  let path = env.write_file("request.json", "{\"appID\": 3}");

  env
    .hdt_cmd()
    .arg("submit")
    .arg(&path)
    .assert()
    .failure()
    .stderr(predicate::str::contains("Invalid task request"));
}
