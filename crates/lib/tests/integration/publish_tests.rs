//! Publishing packages and querying the catalog.

use hdtapps_lib::ErrorKind;
use hdtapps_lib::publish::PublishOptions;
use hdtapps_lib::store::SignatureKind;
use serde_json::json;

use super::common::{StubRuntime, TestService, simulator_spec};

#[tokio::test]
async fn deployed_application_is_findable_by_signature() {
  let service = TestService::new(StubRuntime::default());
  let package = service.package(&simulator_spec());
  let options = PublishOptions {
    deploy: true,
    ..PublishOptions::default()
  };

  let published = service.publisher.publish(package.to_str().unwrap(), &options).await.unwrap();

  assert_eq!(service.runtime.images(), vec!["hdtapps/simulator:2.1"]);
  let app_id = published.app.app_info.id.clone();
  assert_eq!(published.app.app_info.providers.len(), 1);
  assert_eq!(published.app.app_info.total_deps_count, 2);

  let strict = service
    .publisher
    .find_matching(1, &["png"; 0], &["png"], &["txt"], SignatureKind::Strict)
    .unwrap();
  assert_eq!(strict.len(), 1);
  assert_eq!(strict[0].app_id, app_id);

  // The file-set is optional, so the relaxed signature does not count it.
  let relaxed = service
    .publisher
    .find_by_signature("[pi:1][fsi:0:png][fo:1:txt]", SignatureKind::Relaxed)
    .unwrap();
  assert_eq!(relaxed.len(), 1);

  let by_qname = service.publisher.find_by_qname("lab.simulator.simulate").unwrap();
  assert_eq!(by_qname[0].id, strict[0].id);
}

#[tokio::test]
async fn published_package_is_archived_with_dockerfile() {
  let service = TestService::new(StubRuntime::default());
  let package = service.package(&simulator_spec());

  let published = service
    .publisher
    .publish(package.to_str().unwrap(), &PublishOptions::default())
    .await
    .unwrap();

  let app_dir = service.layout.applications_dir().join(&published.app.app_info.id);
  let dockerfile = std::fs::read_to_string(app_dir.join("Dockerfile")).unwrap();
  assert!(dockerfile.contains("LABEL maintainer=\"Fluid Lab\""));
  assert!(dockerfile.contains("ENV SIM_HOME /app"));
  assert!(dockerfile.contains("RUN apt-get update;apt-get install -y python"));
  assert!(app_dir.join("prov-pkg.tar.gz").exists());
  assert!(service.runtime.images().is_empty());
}

#[tokio::test]
async fn invalid_elements_are_reported_not_fatal() {
  let service = TestService::new(StubRuntime::default());
  let mut spec = simulator_spec();
  spec["transformations"]
    .as_array_mut()
    .unwrap()
    .push(json!({"name": "no-outputs", "inputParams": [{"inputName": "x", "alias": "$x", "type": "int"}]}));
  let package = service.package(&spec);

  let published = service
    .publisher
    .publish(package.to_str().unwrap(), &PublishOptions::default())
    .await
    .unwrap();

  assert_eq!(published.app.transformations.len(), 1);
  assert_eq!(published.rejected.len(), 1);
  assert_eq!(published.rejected[0].location, "transformations[1]");
}

#[tokio::test]
async fn missing_app_info_is_a_validation_error() {
  let service = TestService::new(StubRuntime::default());
  let mut spec = simulator_spec();
  spec.as_object_mut().unwrap().remove("appInfo");
  let package = service.package(&spec);

  let err = service
    .publisher
    .publish(package.to_str().unwrap(), &PublishOptions::default())
    .await
    .unwrap_err();

  assert_eq!(err.kind(), ErrorKind::SpecValidation);
  assert!(service.publisher.list_apps().unwrap().is_empty());
}

#[tokio::test]
async fn publishes_from_http_archive() {
  let service = TestService::new(StubRuntime::default());
  let package = service.package(&simulator_spec());
  let archive = service.temp.path().join("simulator.tar.gz");
  hdtapps_lib::fetch::pack_dir_gz(&package, &archive).unwrap();

  let mut server = mockito::Server::new_async().await;
  let _mock = server
    .mock("GET", "/pkgs/simulator.tar.gz")
    .with_status(200)
    .with_header("content-type", "application/gzip")
    .with_body(std::fs::read(&archive).unwrap())
    .create_async()
    .await;

  let url = format!("{}/pkgs/simulator.tar.gz", server.url());
  let published = service.publisher.publish(&url, &PublishOptions::default()).await.unwrap();

  let app_dir = service.layout.applications_dir().join(&published.app.app_info.id);
  assert!(app_dir.join("app").join("run.py").exists());
}
