//! Publishing application packages into the repository.
//!
//! A package is a directory (or an archive of one) holding `app-spec.json`
//! and an `app/` folder. Publishing goes through these steps:
//!
//! 1. Fetch or copy the package into `<repo>/temp/<label>_<uuid>/`
//! 2. Parse `app-spec.json` and write a `Dockerfile` next to it
//! 3. Optionally build the image and record it as a provider
//! 4. Move the package to `<repo>/applications/<appID>/` with a provenance archive
//! 5. Store the transformations and the application
//!
//! Republishing the same application replaces the stored package and documents.

pub mod dockerfile;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::consts::{DEFAULT_PROVIDER_QNAME, PROVENANCE_ARCHIVE, SPEC_FILENAME};
use crate::error::{Error, ErrorKind};
use crate::fetch::{ArchiveFetcher, FetchError, pack_dir_gz};
use crate::platform::paths::Layout;
use crate::runtime::{ContainerRuntime, RuntimeError};
use crate::signature::query_signature;
use crate::spec::{ApplicationSpec, Provider, Rejected, SpecError, Transformation};
use crate::store::{DocumentStore, SignatureKind};

#[derive(Debug, Error)]
pub enum PublishError {
  #[error("package source {0:?} is neither an http(s) URL nor a directory")]
  InvalidSource(String),

  #[error("package has no app-spec.json at {0}")]
  MissingSpec(PathBuf),

  #[error("{path} is not valid JSON: {source}")]
  InvalidJson {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("invalid application specification: {0}")]
  Spec(#[from] SpecError),

  #[error("failed to fetch package: {0}")]
  Fetch(#[from] FetchError),

  #[error("failed to build image {tag}: {source}")]
  Deploy {
    tag: String,
    #[source]
    source: RuntimeError,
  },

  #[error("I/O error at {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

impl PublishError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      PublishError::InvalidSource(_)
      | PublishError::MissingSpec(_)
      | PublishError::InvalidJson { .. }
      | PublishError::Spec(_) => ErrorKind::SpecValidation,
      PublishError::Fetch(_) | PublishError::Deploy { .. } | PublishError::Io { .. } => ErrorKind::Integration,
    }
  }
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> PublishError {
  let path = path.to_path_buf();
  move |source| PublishError::Io { path, source }
}

#[derive(Debug, Clone, Default)]
pub struct PublishOptions {
  /// Label of the temporary folder; derived from the source when absent.
  pub name: Option<String>,
  /// Build the image and register it as a provider.
  pub deploy: bool,
  /// Provider name recorded for the built image, `default` when absent.
  pub provider: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Published {
  pub app: ApplicationSpec,
  /// Elements of the document that failed validation and were left out.
  pub rejected: Vec<Rejected>,
}

/// Publishes packages and answers catalog queries.
pub struct Publisher {
  store: Arc<dyn DocumentStore>,
  runtime: Arc<dyn ContainerRuntime>,
  fetcher: Arc<dyn ArchiveFetcher>,
  layout: Layout,
  image_prefix: String,
}

impl Publisher {
  pub fn new(
    store: Arc<dyn DocumentStore>,
    runtime: Arc<dyn ContainerRuntime>,
    fetcher: Arc<dyn ArchiveFetcher>,
    layout: Layout,
    image_prefix: impl Into<String>,
  ) -> Self {
    Self {
      store,
      runtime,
      fetcher,
      layout,
      image_prefix: image_prefix.into(),
    }
  }

  /// Publish the package at `source`, an http(s) archive URL or a local directory.
  pub async fn publish(&self, source: &str, options: &PublishOptions) -> Result<Published, Error> {
    let label = options.name.clone().unwrap_or_else(|| source_label(source));
    let temp = self
      .layout
      .temp_dir()
      .join(format!("{}_{}", label, uuid::Uuid::new_v4().simple()));
    info!(source = %source, temp = %temp.display(), "publishing package");

    let result = self.publish_from(source, &temp, options).await;
    if temp.exists()
      && let Err(e) = fs::remove_dir_all(&temp)
    {
      warn!(path = %temp.display(), error = %e, "failed to remove temporary package");
    }
    result
  }

  async fn publish_from(&self, source: &str, temp: &Path, options: &PublishOptions) -> Result<Published, Error> {
    if source.starts_with("http://") || source.starts_with("https://") {
      self
        .fetcher
        .fetch_archive(source, temp)
        .await
        .map_err(PublishError::Fetch)?;
    } else if Path::new(source).is_dir() {
      copy_tree(Path::new(source), temp)?;
    } else {
      return Err(PublishError::InvalidSource(source.to_string()).into());
    }

    let parsed = read_spec(temp)?;
    let mut app = parsed.spec;
    for rejected in &parsed.rejected {
      debug!(location = %rejected.location, error = %rejected.error, "element left out of the catalog");
    }

    let dockerfile_path = temp.join("Dockerfile");
    fs::write(&dockerfile_path, dockerfile::render(&app)).map_err(io_err(&dockerfile_path))?;

    if options.deploy {
      let provider = self.deploy(&app, temp, options.provider.as_deref()).await?;
      app.app_info.providers.push(provider.clone());
      for transformation in &mut app.transformations {
        transformation.providers.push(provider.clone());
      }
    }

    let app_dir = self.store_files(temp, &app.app_info.id)?;
    app.app_info.path = app_dir.to_string_lossy().into_owned();

    let removed = self.store.delete_transformations(&app.app_info.id)?;
    if removed > 0 {
      debug!(app_id = %app.app_info.id, removed, "replaced previously published transformations");
    }
    for transformation in &mut app.transformations {
      transformation.id = self.store.insert_transformation(transformation)?;
    }
    self.store.insert_app(&app)?;

    info!(
      app_id = %app.app_info.id,
      transformations = app.transformations.len(),
      rejected = parsed.rejected.len(),
      "application published"
    );
    Ok(Published {
      app,
      rejected: parsed.rejected,
    })
  }

  async fn deploy(&self, app: &ApplicationSpec, context: &Path, provider: Option<&str>) -> Result<Provider, Error> {
    let tag = dockerfile::image_tag(&self.image_prefix, &app.app_info.name, &app.app_info.version);
    let image = self
      .runtime
      .build_image(context, &tag)
      .await
      .map_err(|source| PublishError::Deploy {
        tag: tag.clone(),
        source,
      })?;
    info!(tag = %tag, image = %image, "image built");
    Ok(Provider {
      qname: provider.unwrap_or(DEFAULT_PROVIDER_QNAME).to_string(),
      pkg_id: image,
    })
  }

  /// Copy the package into the applications folder and archive it there.
  fn store_files(&self, temp: &Path, app_id: &str) -> Result<PathBuf, PublishError> {
    let app_dir = self.layout.applications_dir().join(app_id);
    if app_dir.exists() {
      fs::remove_dir_all(&app_dir).map_err(io_err(&app_dir))?;
    }
    copy_tree(temp, &app_dir)?;

    let archive = app_dir.join(PROVENANCE_ARCHIVE);
    pack_dir_gz(temp, &archive).map_err(io_err(&archive))?;
    debug!(app_dir = %app_dir.display(), "package files stored");
    Ok(app_dir)
  }

  /// The stored application, without its storage path.
  pub fn get_app(&self, app_id: &str) -> Result<ApplicationSpec, Error> {
    let mut app = self.find_app(app_id)?;
    app.app_info.path.clear();
    Ok(app)
  }

  pub fn list_apps(&self) -> Result<Vec<ApplicationSpec>, Error> {
    let mut apps = self.store.list_apps()?;
    for app in &mut apps {
      app.app_info.path.clear();
    }
    Ok(apps)
  }

  /// Remove the application's package files and documents.
  pub fn delete_app(&self, app_id: &str) -> Result<(), Error> {
    let app = self.find_app(app_id)?;

    let path = PathBuf::from(&app.app_info.path);
    if !app.app_info.path.is_empty() && path.exists() {
      fs::remove_dir_all(&path).map_err(io_err(&path))?;
    }
    let removed = self.store.delete_transformations(app_id)?;
    self.store.delete_app(app_id)?;
    info!(app_id = %app_id, transformations = removed, "application deleted");
    Ok(())
  }

  pub fn transformation(&self, id: &str) -> Result<Transformation, Error> {
    self
      .store
      .find_transformation(id)?
      .ok_or_else(|| Error::UnknownTransformation(id.to_string()))
  }

  pub fn find_by_signature(&self, signature: &str, kind: SignatureKind) -> Result<Vec<Transformation>, Error> {
    Ok(self.store.find_by_signature(signature, kind)?)
  }

  pub fn find_by_qname(&self, qname: &str) -> Result<Vec<Transformation>, Error> {
    Ok(self.store.find_by_qname(qname)?)
  }

  /// Transformations whose signature matches the given input and output shape.
  pub fn find_matching<S: AsRef<str>>(
    &self,
    param_count: usize,
    input_files: &[S],
    input_file_sets: &[S],
    output_files: &[S],
    kind: SignatureKind,
  ) -> Result<Vec<Transformation>, Error> {
    let signature = query_signature(param_count, input_files, input_file_sets, output_files);
    debug!(signature = %signature, kind = ?kind, "querying transformations");
    self.find_by_signature(&signature, kind)
  }

  fn find_app(&self, app_id: &str) -> Result<ApplicationSpec, Error> {
    self
      .store
      .find_app(app_id)?
      .ok_or_else(|| Error::AppNotFound(app_id.to_string()))
  }
}

fn read_spec(package: &Path) -> Result<crate::spec::ParsedSpec, PublishError> {
  let path = package.join(SPEC_FILENAME);
  let content = match fs::read_to_string(&path) {
    Ok(content) => content,
    Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(PublishError::MissingSpec(path)),
    Err(source) => return Err(PublishError::Io { path, source }),
  };
  let document: serde_json::Value =
    serde_json::from_str(&content).map_err(|source| PublishError::InvalidJson { path, source })?;
  Ok(ApplicationSpec::from_document(&document)?)
}

/// Folder label for a source: the last path segment without extensions.
fn source_label(source: &str) -> String {
  let trimmed = source.split(['?', '#']).next().unwrap_or_default().trim_end_matches('/');
  let last = trimmed.rsplit('/').next().unwrap_or_default();
  let stem = last.split('.').next().unwrap_or_default();
  let label: String = stem
    .chars()
    .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
    .collect();
  if label.is_empty() { "package".to_string() } else { label }
}

/// Recursively copy the contents of `src` into `dest`.
fn copy_tree(src: &Path, dest: &Path) -> Result<(), PublishError> {
  for entry in WalkDir::new(src).follow_links(false) {
    let entry = entry.map_err(|e| {
      let path = e.path().unwrap_or(src).to_path_buf();
      PublishError::Io {
        path,
        source: io::Error::other(e),
      }
    })?;
    let relative = entry.path().strip_prefix(src).unwrap_or(entry.path());
    let target = dest.join(relative);
    if entry.file_type().is_dir() {
      fs::create_dir_all(&target).map_err(io_err(&target))?;
    } else {
      fs::copy(entry.path(), &target).map_err(io_err(&target))?;
    }
  }
  Ok(())
}
