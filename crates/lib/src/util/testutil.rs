//! Test helpers: catalog builders and in-memory stand-ins for the external boundaries.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::fetch::{ArchiveFetcher, FetchError};
use crate::runtime::{ContainerRuntime, RuntimeError};
use crate::signature::signatures;
use crate::spec::{
  AppInfo, ApplicationSpec, DependencySpec, InputFile, InputFileSet, InputParameter, InvocationCli, Invocations,
  OutputFile, Transformation,
};

pub fn param(alias: &str, param_type: &str, optional: bool) -> InputParameter {
  InputParameter {
    name: alias.trim_start_matches('$').to_string(),
    alias: alias.to_string(),
    is_optional: optional,
    value: String::new(),
    param_type: param_type.to_string(),
  }
}

pub fn input_file(alias: &str, format: &str, optional: bool) -> InputFile {
  InputFile {
    name: alias.trim_start_matches('$').to_string(),
    alias: alias.to_string(),
    is_optional: optional,
    format: format.to_string(),
    schema: String::new(),
    required_path: format!("{{r}}/{}", alias.trim_start_matches('$')),
  }
}

pub fn file_set(alias: &str, format: &str, required_path: &str, optional: bool) -> InputFileSet {
  InputFileSet {
    name: alias.trim_start_matches('$').to_string(),
    alias: alias.to_string(),
    is_optional: optional,
    format: format.to_string(),
    schema: String::new(),
    required_path: required_path.to_string(),
    size: -1,
  }
}

pub fn output(name: &str, format: &str, access_path: &str) -> OutputFile {
  OutputFile {
    name: name.to_string(),
    alias: format!("${}", name),
    format: format.to_string(),
    schema: String::new(),
    access_path: access_path.to_string(),
  }
}

/// A stored-looking transformation with a single `result.txt` output under `{r}/out/`.
pub fn transformation(
  input_params: Vec<InputParameter>,
  input_files: Vec<InputFile>,
  input_file_sets: Vec<InputFileSet>,
) -> Transformation {
  let output_files = vec![output("result", "txt", "{r}/out/")];
  let sigs = signatures(&input_params, &input_files, &input_file_sets, &output_files);
  Transformation {
    id: String::new(),
    app_id: "app".to_string(),
    name: "simulate".to_string(),
    qname: "sim.simulate".to_string(),
    strict_signature: sigs.strict,
    relaxed_signature: sigs.relaxed,
    providers: Vec::new(),
    input_param_count: input_params.len(),
    input_str_param_count: input_params.iter().filter(|p| p.is_string()).count(),
    input_num_param_count: input_params.iter().filter(|p| !p.is_string()).count(),
    input_opt_param_count: input_params.iter().filter(|p| p.is_optional).count(),
    input_files_count: input_files.len(),
    input_file_sets_count: input_file_sets.len(),
    output_files_count: output_files.len(),
    input_params,
    input_files,
    input_file_sets,
    output_files,
  }
}

/// A validated application with one CLI invocation running `command`.
pub fn application(app_id: &str, name: &str, command: &str, transformations: Vec<Transformation>) -> ApplicationSpec {
  ApplicationSpec {
    app_info: AppInfo {
      id: app_id.to_string(),
      name: name.to_string(),
      version: "1.0".to_string(),
      publisher: "lab".to_string(),
      description: String::new(),
      developers: Vec::new(),
      license: "MIT".to_string(),
      tags: Vec::new(),
      providers: Vec::new(),
      is_validated: true,
      path: String::new(),
      transformations_count: transformations.len(),
      total_deps_count: 0,
      env_deps_count: 0,
      soft_deps_count: 0,
      file_deps_count: 0,
    },
    transformations,
    dependencies: DependencySpec::default(),
    configs: Vec::new(),
    invocations: Invocations {
      cli: vec![InvocationCli {
        name: "run".to_string(),
        description: String::new(),
        command: command.to_string(),
      }],
    },
    test_runs: Vec::new(),
  }
}

/// Serves canned archives and files by URL; unknown URLs answer 404.
#[derive(Debug, Default)]
pub struct FakeFetcher {
  archives: BTreeMap<String, Vec<(String, String)>>,
  files: BTreeMap<String, String>,
  fetched: Mutex<Vec<String>>,
}

impl FakeFetcher {
  pub fn with_archive(mut self, url: &str, files: &[(&str, &str)]) -> Self {
    let files = files.iter().map(|(n, c)| (n.to_string(), c.to_string())).collect();
    self.archives.insert(url.to_string(), files);
    self
  }

  pub fn with_file(mut self, url: &str, content: &str) -> Self {
    self.files.insert(url.to_string(), content.to_string());
    self
  }

  pub fn fetched(&self) -> Vec<String> {
    self.fetched.lock().unwrap().clone()
  }
}

#[async_trait]
impl ArchiveFetcher for FakeFetcher {
  async fn fetch_archive(&self, url: &str, dest: &Path) -> Result<(), FetchError> {
    let files = self.archives.get(url).ok_or_else(|| FetchError::Status {
      url: url.to_string(),
      status: 404,
    })?;
    for (name, content) in files {
      let path = dest.join(name);
      if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
      }
      std::fs::write(path, content).unwrap();
    }
    self.fetched.lock().unwrap().push(url.to_string());
    Ok(())
  }

  async fn fetch_file(&self, url: &str, dest: &Path) -> Result<(), FetchError> {
    let content = self.files.get(url).ok_or_else(|| FetchError::Status {
      url: url.to_string(),
      status: 404,
    })?;
    if let Some(parent) = dest.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(dest, content).unwrap();
    self.fetched.lock().unwrap().push(url.to_string());
    Ok(())
  }
}

#[derive(Debug, Default)]
struct RuntimeLog {
  commands: Vec<String>,
  images: Vec<String>,
  removed: Vec<String>,
  copied_in: Vec<(String, Vec<String>)>,
  built: Vec<(PathBuf, String)>,
}

/// In-memory container runtime.
///
/// Containers are named `c1`, `c2`, ... in creation order. `get_archive` serves
/// the files registered with [`FakeRuntime::with_file`] as single-entry tars.
#[derive(Debug, Default)]
pub struct FakeRuntime {
  exit_code: i64,
  fail_start: bool,
  missing_image: bool,
  files: BTreeMap<String, (String, String)>,
  log: Mutex<RuntimeLog>,
}

impl FakeRuntime {
  pub fn with_exit_code(mut self, code: i64) -> Self {
    self.exit_code = code;
    self
  }

  pub fn failing_start(mut self) -> Self {
    self.fail_start = true;
    self
  }

  /// Every image lookup fails as if the image was never built.
  pub fn without_images(mut self) -> Self {
    self.missing_image = true;
    self
  }

  /// Serve `content` as `entry` when `container_path` is copied out.
  pub fn with_file(mut self, container_path: &str, entry: &str, content: &str) -> Self {
    self
      .files
      .insert(container_path.to_string(), (entry.to_string(), content.to_string()));
    self
  }

  pub fn commands(&self) -> Vec<String> {
    self.log.lock().unwrap().commands.clone()
  }

  /// Image ids containers were created from.
  pub fn images(&self) -> Vec<String> {
    self.log.lock().unwrap().images.clone()
  }

  pub fn removed(&self) -> Vec<String> {
    self.log.lock().unwrap().removed.clone()
  }

  /// Target path and regular-file entry names of every archive copied in.
  pub fn copied_in(&self) -> Vec<(String, Vec<String>)> {
    self.log.lock().unwrap().copied_in.clone()
  }

  /// Build contexts and tags of every image built.
  pub fn built(&self) -> Vec<(PathBuf, String)> {
    self.log.lock().unwrap().built.clone()
  }
}

fn failed(command: &str, stderr: &str) -> RuntimeError {
  RuntimeError::CommandFailed {
    command: command.to_string(),
    code: Some(1),
    stderr: stderr.to_string(),
  }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
  async fn build_image(&self, context: &Path, tag: &str) -> Result<String, RuntimeError> {
    if !context.join("Dockerfile").exists() {
      return Err(failed("docker build", "no Dockerfile in context"));
    }
    let mut log = self.log.lock().unwrap();
    log.built.push((context.to_path_buf(), tag.to_string()));
    Ok(format!("sha256:image{}", log.built.len()))
  }

  async fn image_id(&self, reference: &str) -> Result<String, RuntimeError> {
    if self.missing_image {
      return Err(failed("docker image inspect", &format!("no such image: {}", reference)));
    }
    Ok(format!("sha256:{}", reference.trim_start_matches("sha256:")))
  }

  async fn create_container(&self, image: &str, command: &str) -> Result<String, RuntimeError> {
    let mut log = self.log.lock().unwrap();
    log.images.push(image.to_string());
    log.commands.push(command.to_string());
    Ok(format!("c{}", log.commands.len()))
  }

  async fn start_container(&self, _id: &str) -> Result<(), RuntimeError> {
    if self.fail_start {
      return Err(failed("docker start", "daemon unreachable"));
    }
    Ok(())
  }

  async fn wait_container(&self, _id: &str) -> Result<i64, RuntimeError> {
    Ok(self.exit_code)
  }

  async fn remove_container(&self, id: &str) -> Result<(), RuntimeError> {
    self.log.lock().unwrap().removed.push(id.to_string());
    Ok(())
  }

  async fn container_status(&self, _id: &str) -> Result<String, RuntimeError> {
    Ok("created".to_string())
  }

  async fn put_archive(&self, _id: &str, path: &str, archive: Vec<u8>) -> Result<(), RuntimeError> {
    let mut entries = Vec::new();
    let mut reader = tar::Archive::new(archive.as_slice());
    for entry in reader.entries().unwrap() {
      let entry = entry.unwrap();
      if entry.header().entry_type().is_file() {
        let path = entry.path().unwrap().to_string_lossy().into_owned();
        entries.push(path.trim_start_matches("./").to_string());
      }
    }
    entries.sort();
    self.log.lock().unwrap().copied_in.push((path.to_string(), entries));
    Ok(())
  }

  async fn get_archive(&self, _id: &str, path: &str) -> Result<Vec<u8>, RuntimeError> {
    let (entry, content) = self
      .files
      .get(path)
      .ok_or_else(|| failed("docker cp", &format!("no such file: {}", path)))?;

    let mut builder = tar::Builder::new(Vec::new());
    let mut header = tar::Header::new_gnu();
    header.set_size(content.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append_data(&mut header, entry, content.as_bytes()).unwrap();
    Ok(builder.into_inner().unwrap())
  }
}
