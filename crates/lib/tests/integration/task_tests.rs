//! Running transformations end to end.

use hdtapps_lib::publish::PublishOptions;
use hdtapps_lib::status::{FailureReason, TaskState};
use hdtapps_lib::task::{FileSetLink, ParamValue, TaskRequest};
use hdtapps_lib::{Error, ErrorKind};

use super::common::{StubRuntime, TestService, simulator_spec};

async fn deployed(runtime: StubRuntime) -> (TestService, TaskRequest) {
  let service = TestService::new(runtime);
  let package = service.package(&simulator_spec());
  let options = PublishOptions {
    deploy: true,
    ..PublishOptions::default()
  };
  let published = service.publisher.publish(package.to_str().unwrap(), &options).await.unwrap();

  let request = TaskRequest {
    app_id: published.app.app_info.id.clone(),
    transformation_id: published.app.transformations[0].id.clone(),
    input_params: vec![ParamValue::new("integer", "5")],
    input_files: vec![],
    input_file_sets: vec![],
    providers: vec![],
    results_endpoint: String::new(),
  };
  (service, request)
}

#[tokio::test]
async fn submitted_task_succeeds_and_delivers_results() {
  let runtime = StubRuntime::default().on("python run.py 5", 0, &[("/app/out/result.txt", "steps=5")]);
  let (service, mut request) = deployed(runtime).await;

  let mut server = mockito::Server::new_async().await;
  let results = server
    .mock("POST", "/callback")
    .match_header("content-type", "application/octet-stream")
    .match_body("steps=5")
    .with_status(204)
    .create_async()
    .await;
  request.results_endpoint = format!("{}/callback", server.url());

  let task_id = service.tasks.submit(request).unwrap();
  let status = service.wait_for(&task_id).await;

  assert_eq!(status.state, TaskState::Success);
  assert_eq!(status.container_id.as_deref(), Some("REMOVED"));
  assert_eq!(service.runtime.removed(), vec!["ctr1"]);

  let output = service.tasks.workspace(&task_id).join("output").join("result.txt");
  assert_eq!(std::fs::read_to_string(output).unwrap(), "steps=5");

  // Delivery happens after the terminal status is recorded.
  for _ in 0..100 {
    if results.matched_async().await {
      break;
    }
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
  }
  results.assert_async().await;
}

#[tokio::test]
async fn failing_transformation_keeps_its_container() {
  let runtime = StubRuntime::default().on("python run.py 7", 2, &[]);
  let (service, mut request) = deployed(runtime).await;
  request.input_params = vec![ParamValue::new("int", "7")];

  let status = service.tasks.run_to_completion(request).await.unwrap();

  assert_eq!(status.state, TaskState::Failure);
  assert_eq!(status.failure, Some(FailureReason::ExitCode(2)));
  assert_eq!(status.container_id.as_deref(), Some("ctr1"));
  assert!(service.runtime.removed().is_empty());
}

#[tokio::test]
async fn file_set_archive_is_fetched_and_cleaned_up() {
  let runtime = StubRuntime::default().on("python run.py 5", 0, &[("/app/out/result.txt", "ok")]);
  let (service, mut request) = deployed(runtime).await;

  let frames = service.temp.path().join("frames");
  std::fs::create_dir_all(&frames).unwrap();
  std::fs::write(frames.join("f1.png"), "png").unwrap();
  let archive = service.temp.path().join("frames.tar.gz");
  hdtapps_lib::fetch::pack_dir_gz(&frames, &archive).unwrap();

  let mut server = mockito::Server::new_async().await;
  let download = server
    .mock("GET", "/frames.tar.gz")
    .with_status(200)
    .with_body(std::fs::read(&archive).unwrap())
    .create_async()
    .await;
  request.input_file_sets = vec![FileSetLink {
    format: "png".to_string(),
    link: format!("{}/frames.tar.gz", server.url()),
  }];

  let status = service.tasks.run_to_completion(request).await.unwrap();

  download.assert_async().await;
  assert_eq!(status.state, TaskState::Success);
  let workspace = service.tasks.workspace(&status.task_id);
  assert!(!workspace.join("frames").exists());
  assert!(workspace.join("output").join("result.txt").exists());
}

#[tokio::test]
async fn unbound_values_fail_the_task_not_the_submission() {
  let (service, mut request) = deployed(StubRuntime::default()).await;
  request.input_params.push(ParamValue::new("string", "extra"));

  let task_id = service.tasks.submit(request).unwrap();
  let status = service.wait_for(&task_id).await;

  assert!(matches!(
    status.failure,
    Some(FailureReason::Internal {
      kind: ErrorKind::Materialization,
      ..
    })
  ));
}

#[tokio::test]
async fn unknown_transformation_is_rejected_at_submission() {
  let (service, mut request) = deployed(StubRuntime::default()).await;
  request.transformation_id = "ffffffffffffffffffffffff".to_string();

  let err = service.tasks.submit(request).unwrap_err();

  assert!(matches!(err, Error::TransformationNotFound { .. }));
}

#[tokio::test]
async fn unknown_task_has_no_status() {
  let service = TestService::new(StubRuntime::default());
  let err = service.tasks.status("zz_0000").unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
}
