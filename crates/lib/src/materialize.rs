//! Binding a task request's supplied values to a transformation's declared inputs.
//!
//! Supplied values are grouped into buckets (parameters by numeric/string type,
//! files and file-sets by format). Every bucket is a LIFO stack: declared inputs
//! are visited in declaration order and each one takes the most recently
//! supplied value of its bucket.
//!
//! Declarations are never modified. The result of binding is a [`Bindings`]
//! value pairing a copy of each declaration with the value bound to it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::consts::ALIAS_SIGIL;
use crate::fetch::{ArchiveFetcher, FetchError};
use crate::spec::{InputFile, InputFileSet, InputParameter, Transformation};
use crate::task::{FileLink, FileSetLink, ParamValue, TaskRequest};

#[derive(Debug, Error)]
pub enum MaterializeError {
  #[error("no {bucket} value supplied for parameter {alias}")]
  MissingParameter { alias: String, bucket: &'static str },

  #[error("{} supplied parameter value(s) left unbound: {}", values.len(), values.join(", "))]
  UnusedParameters { values: Vec<String> },

  #[error("no {format} file supplied for {alias}")]
  MissingFile { alias: String, format: String },

  #[error("{} supplied file link(s) left unbound: {}", links.len(), links.join(", "))]
  UnusedFiles { links: Vec<String> },

  #[error("no {format} archive supplied for file-set {alias}")]
  MissingFileSet { alias: String, format: String },

  #[error("{} supplied archive link(s) left unbound: {}", links.len(), links.join(", "))]
  UnusedFileSets { links: Vec<String> },

  #[error("failed to fetch input {alias}: {source}")]
  Fetch {
    alias: String,
    #[source]
    source: FetchError,
  },
}

/// A declared input paired with the value bound to it for one task.
#[derive(Debug, Clone, PartialEq)]
pub struct Bound<S> {
  pub spec: S,
  pub value: String,
}

/// Alias-keyed bindings of one task.
///
/// For files and file-sets, `value` is the supplied link until it is fetched,
/// then the local file or the directory the archive was extracted into.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
  pub params: BTreeMap<String, Bound<InputParameter>>,
  pub files: BTreeMap<String, Bound<InputFile>>,
  pub file_sets: BTreeMap<String, Bound<InputFileSet>>,
}

/// Per-key LIFO stacks, preserving supply order within a key.
#[derive(Debug)]
struct Stacks<V> {
  buckets: BTreeMap<String, Vec<V>>,
}

impl<V> Stacks<V> {
  fn new() -> Self {
    Self {
      buckets: BTreeMap::new(),
    }
  }

  fn push(&mut self, key: &str, value: V) {
    self.buckets.entry(key.to_string()).or_default().push(value);
  }

  fn pop(&mut self, key: &str) -> Option<V> {
    self.buckets.get_mut(key).and_then(Vec::pop)
  }

  fn into_leftover(self) -> Vec<V> {
    self.buckets.into_values().flatten().collect()
  }
}

/// Workspace folder that receives downloaded input files.
const INPUT_FILES_DIR: &str = "files";

const NUMERIC: &str = "numeric";
const STRING: &str = "string";

/// Bind supplied parameter values to declared parameters.
///
/// An empty bucket falls back to the declared default value; with no default
/// the parameter is missing. Values nobody consumed are an error.
pub fn bind_params(
  declared: &[InputParameter],
  supplied: &[ParamValue],
) -> Result<BTreeMap<String, Bound<InputParameter>>, MaterializeError> {
  let mut stacks = Stacks::new();
  for value in supplied {
    let bucket = if value.is_numeric() { NUMERIC } else { STRING };
    stacks.push(bucket, value.value.clone());
  }

  let mut bound = BTreeMap::new();
  for param in declared {
    let bucket = if param.is_string() { STRING } else { NUMERIC };
    let value = match stacks.pop(bucket) {
      Some(value) => value,
      None if !param.value.is_empty() => {
        debug!(alias = %param.alias, "binding declared default value");
        param.value.clone()
      }
      None => {
        return Err(MaterializeError::MissingParameter {
          alias: param.alias.clone(),
          bucket,
        });
      }
    };
    bound.insert(
      param.alias.clone(),
      Bound {
        spec: param.clone(),
        value,
      },
    );
  }

  let leftover = stacks.into_leftover();
  if !leftover.is_empty() {
    return Err(MaterializeError::UnusedParameters { values: leftover });
  }
  Ok(bound)
}

/// Bind supplied file links to declared input files by format.
///
/// Optional files with no link left in their format are skipped.
pub fn bind_files(
  declared: &[InputFile],
  supplied: &[FileLink],
) -> Result<BTreeMap<String, Bound<InputFile>>, MaterializeError> {
  let mut stacks = Stacks::new();
  for file in supplied {
    stacks.push(&file.format, file.link.clone());
  }

  let mut bound = BTreeMap::new();
  for file in declared {
    match stacks.pop(&file.format) {
      Some(link) => {
        bound.insert(
          file.alias.clone(),
          Bound {
            spec: file.clone(),
            value: link,
          },
        );
      }
      None if file.is_optional => debug!(alias = %file.alias, "optional file not supplied"),
      None => {
        return Err(MaterializeError::MissingFile {
          alias: file.alias.clone(),
          format: file.format.clone(),
        });
      }
    }
  }

  let leftover = stacks.into_leftover();
  if !leftover.is_empty() {
    return Err(MaterializeError::UnusedFiles { links: leftover });
  }
  Ok(bound)
}

/// Bind supplied archive links to declared file-sets by format.
pub fn bind_file_sets(
  declared: &[InputFileSet],
  supplied: &[FileSetLink],
) -> Result<BTreeMap<String, Bound<InputFileSet>>, MaterializeError> {
  let mut stacks = Stacks::new();
  for set in supplied {
    stacks.push(&set.format, set.link.clone());
  }

  let mut bound = BTreeMap::new();
  for set in declared {
    match stacks.pop(&set.format) {
      Some(link) => {
        bound.insert(
          set.alias.clone(),
          Bound {
            spec: set.clone(),
            value: link,
          },
        );
      }
      None if set.is_optional => debug!(alias = %set.alias, "optional file-set not supplied"),
      None => {
        return Err(MaterializeError::MissingFileSet {
          alias: set.alias.clone(),
          format: set.format.clone(),
        });
      }
    }
  }

  let leftover = stacks.into_leftover();
  if !leftover.is_empty() {
    return Err(MaterializeError::UnusedFileSets { links: leftover });
  }
  Ok(bound)
}

/// Bind every input of `transformation` and fetch bound files and file-sets into `workspace`.
///
/// Each file is downloaded to `<workspace>/files/<input name>.<format>` and each
/// file-set archive is extracted into `<workspace>/<alias without sigil>/`.
pub async fn materialize(
  transformation: &Transformation,
  request: &TaskRequest,
  workspace: &Path,
  fetcher: &dyn ArchiveFetcher,
) -> Result<Bindings, MaterializeError> {
  let mut bindings = Bindings {
    params: bind_params(&transformation.input_params, &request.input_params)?,
    files: bind_files(&transformation.input_files, &request.input_files)?,
    file_sets: bind_file_sets(&transformation.input_file_sets, &request.input_file_sets)?,
  };

  for (alias, bound) in bindings.files.iter_mut() {
    let dest = input_file_path(workspace, &bound.spec);
    fetcher
      .fetch_file(&bound.value, &dest)
      .await
      .map_err(|source| MaterializeError::Fetch {
        alias: alias.clone(),
        source,
      })?;
    info!(alias = %alias, dest = %dest.display(), "file materialized");
    bound.value = dest.to_string_lossy().into_owned();
  }

  for (alias, bound) in bindings.file_sets.iter_mut() {
    let dest = file_set_dir(workspace, alias);
    fetcher
      .fetch_archive(&bound.value, &dest)
      .await
      .map_err(|source| MaterializeError::Fetch {
        alias: alias.clone(),
        source,
      })?;
    info!(alias = %alias, dest = %dest.display(), "file-set materialized");
    bound.value = dest.to_string_lossy().into_owned();
  }

  Ok(bindings)
}

/// Workspace directory of a file-set; path separators in the alias are neutralized.
pub fn file_set_dir(workspace: &Path, alias: &str) -> PathBuf {
  workspace.join(safe_name(alias.trim_start_matches(ALIAS_SIGIL), "fileset"))
}

/// Workspace path of a downloaded input file, named `<input name>.<format>`.
pub fn input_file_path(workspace: &Path, file: &InputFile) -> PathBuf {
  let name = format!("{}.{}", file.name, file.format);
  workspace.join(INPUT_FILES_DIR).join(safe_name(&name, "input"))
}

fn safe_name(raw: &str, fallback: &str) -> String {
  let name: String = raw
    .chars()
    .map(|c| {
      if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
        c
      } else {
        '_'
      }
    })
    .collect();
  if name.is_empty() || name == "." || name == ".." {
    fallback.to_string()
  } else {
    name
  }
}
