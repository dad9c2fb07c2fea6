//! Publishing packages and querying the catalog from the command line.

use predicates::prelude::*;

use super::common::{TestEnv, converter_spec};

#[test]
fn published_app_is_listed_and_shown() {
  let env = TestEnv::new();
  let summary = env.publish(&converter_spec());

  let app_id = summary["appID"].as_str().unwrap();
  assert_eq!(app_id, "imaginggroup_gehr_converter_0.9");
  assert_eq!(summary["rejected"].as_array().unwrap().len(), 0);

  let apps = env.json(&["app"]);
  assert_eq!(apps.as_array().unwrap().len(), 1);

  let app = env.json(&["app", app_id]);
  assert_eq!(app["appInfo"]["appName"], "Converter");
  assert_eq!(app["transformations"][0]["qname"], "imaging.converter.convert");

  env
    .hdt_cmd()
    .args(["app", app_id])
    .assert()
    .success()
    .stdout(predicate::str::contains("Imaging Group"));
}

#[test]
fn transformation_is_found_by_qname_and_shape() {
  let env = TestEnv::new();
  let summary = env.publish(&converter_spec());
  let id = summary["transformations"][0].as_str().unwrap().to_string();

  let by_qname = env.json(&["find", "--qname", "imaging.converter.convert"]);
  assert_eq!(by_qname[0]["transformationID"], id.as_str());

  let by_shape = env.json(&["find", "--params", "1", "--input-file", "tif", "--output", "png"]);
  assert_eq!(by_shape.as_array().unwrap().len(), 1);

  let mismatch = env.json(&["find", "--params", "2", "--input-file", "tif", "--output", "png"]);
  assert!(mismatch.as_array().unwrap().is_empty());

  let shown = env.json(&["transformation", &id]);
  assert_eq!(shown["strictSignature"], by_qname[0]["strictSignature"]);
}

#[test]
fn deleted_app_is_gone() {
  let env = TestEnv::new();
  let summary = env.publish(&converter_spec());
  let app_id = summary["appID"].as_str().unwrap();
  let id = summary["transformations"][0].as_str().unwrap();

  env.hdt_cmd().args(["delete", app_id]).assert().success();

  env.hdt_cmd().args(["app", app_id]).assert().failure();
  env.hdt_cmd().args(["transformation", id]).assert().failure();
  assert!(env.json(&["find", "--qname", "imaging.converter.convert"]).as_array().unwrap().is_empty());
}

#[test]
fn republishing_keeps_one_copy() {
  let env = TestEnv::new();
  let first = env.publish(&converter_spec());
  let second = env.publish(&converter_spec());

  assert_eq!(first["transformations"], second["transformations"]);
  assert_eq!(env.json(&["app"]).as_array().unwrap().len(), 1);
}

#[test]
fn rejected_transformation_is_reported() {
  let env = TestEnv::new();
  let mut spec = converter_spec();
  spec["transformations"]
    .as_array_mut()
    .unwrap()
    .push(serde_json::json!({"name": "no-outputs", "inputParams": [{"inputName": "x", "alias": "$x", "type": "int"}]}));
  let package = env.package(&spec);

  env
    .hdt_cmd()
    .arg("publish")
    .arg(&package)
    .assert()
    .success()
    .stderr(predicate::str::contains("Skipped transformations[1]"));
}

#[test]
fn package_without_spec_document_fails() {
  let env = TestEnv::new();
  env.write_file("empty/app/run.sh", "true");

  env
    .hdt_cmd()
    .arg("publish")
    .arg(env.temp.path().join("empty"))
    .assert()
    .failure()
    .stderr(predicate::str::contains("app-spec.json"));
}
