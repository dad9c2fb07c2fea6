//! Validating construction of catalog entities from an untrusted document.
//!
//! Required fields fail with [`SpecError::PropertyNotSpecified`] when absent and
//! [`SpecError::EmptyProperty`] when blank. Lists of sub-entities are lenient:
//! every element is validated on its own, and a failing element is logged and
//! recorded in [`ParsedSpec::rejected`] while the rest of the list is kept.

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use crate::consts::DEFAULT_PROVIDER_QNAME;
use crate::signature::signatures;

use super::identity::application_id;
use super::types::*;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
  #[error("property {0} is missing")]
  PropertyNotSpecified(String),

  #[error("property {0} cannot be empty")]
  EmptyProperty(String),

  #[error("property {path} must be {expected}")]
  InvalidType { path: String, expected: &'static str },
}

/// A list element that failed validation and was left out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejected {
  /// Path of list names and indices from the document root, e.g.
  /// `transformations[0].inputParams[2]`.
  pub location: String,
  pub error: SpecError,
}

/// An application together with every list element rejected while building it.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSpec {
  pub spec: ApplicationSpec,
  pub rejected: Vec<Rejected>,
}

impl ApplicationSpec {
  /// Build a validated application from its wire document.
  ///
  /// Fails only when `appInfo` is missing or invalid. Invalid elements of any
  /// list, including whole transformations, are skipped and reported.
  pub fn from_document(document: &Value) -> Result<ParsedSpec, SpecError> {
    let root = Fields::new("document", document)?;
    let mut rejected = Vec::new();

    let app_info = root
      .object("appInfo")?
      .ok_or_else(|| SpecError::PropertyNotSpecified("appInfo".to_string()))?;
    let mut app_info = parse_app_info(&app_info)?;

    let mut transformations = lenient(&mut rejected, "transformations", root.array("transformations")?, |v, r| {
      parse_transformation(v, r)
    });
    for transformation in &mut transformations {
      transformation.app_id = app_info.id.clone();
    }

    let dependencies = match root.object("dependencies")? {
      Some(deps) => {
        let start = rejected.len();
        let dependencies = parse_dependencies(&deps, &mut rejected)?;
        prefix_locations(&mut rejected[start..], "dependencies");
        dependencies
      }
      None => DependencySpec::default(),
    };

    let configs = lenient(&mut rejected, "configs", root.array("configs")?, |v, _| parse_configuration(v));

    let invocations = match root.object("invocations")? {
      Some(inv) => {
        let start = rejected.len();
        let cli = lenient(&mut rejected, "invocationsCLI", inv.array("invocationsCLI")?, |v, _| {
          parse_invocation(v)
        });
        prefix_locations(&mut rejected[start..], "invocations");
        Invocations { cli }
      }
      None => Invocations::default(),
    };

    let test_runs = lenient(&mut rejected, "testRuns", root.array("testRuns")?, |v, r| parse_test_run(v, r));

    for r in &rejected {
      warn!(location = %r.location, error = %r.error, "skipping invalid element");
    }

    app_info.transformations_count = transformations.len();
    app_info.env_deps_count = dependencies.env_deps.len();
    app_info.soft_deps_count = dependencies.soft_deps.len();
    app_info.file_deps_count = dependencies.file_deps.len();
    app_info.total_deps_count = dependencies.total();

    Ok(ParsedSpec {
      spec: ApplicationSpec {
        app_info,
        transformations,
        dependencies,
        configs,
        invocations,
        test_runs,
      },
      rejected,
    })
  }
}

/// Parse every element of `items`, keeping successes and recording failures.
fn lenient<T>(
  rejected: &mut Vec<Rejected>,
  list: &str,
  items: &[Value],
  mut parse: impl FnMut(&Value, &mut Vec<Rejected>) -> Result<T, SpecError>,
) -> Vec<T> {
  let mut parsed = Vec::with_capacity(items.len());
  for (index, item) in items.iter().enumerate() {
    let element = format!("{}[{}]", list, index);
    let start = rejected.len();
    let result = parse(item, rejected);
    prefix_locations(&mut rejected[start..], &element);
    match result {
      Ok(value) => parsed.push(value),
      Err(error) => rejected.push(Rejected {
        location: element,
        error,
      }),
    }
  }
  parsed
}

/// Qualify locations recorded while parsing a nested element with the element's own location.
fn prefix_locations(rejected: &mut [Rejected], parent: &str) {
  for r in rejected {
    r.location = format!("{}.{}", parent, r.location);
  }
}

fn parse_app_info(fields: &Fields) -> Result<AppInfo, SpecError> {
  let name = fields.required("appName")?;
  let developers = fields.required_strings("appDevelopers")?;
  let publisher = fields.required("appPublisher")?;
  let version = fields.required("appVersion")?;
  let id = application_id(&publisher, &developers, &name, &version);

  Ok(AppInfo {
    id,
    description: fields.optional("appDesc")?,
    license: fields.optional("appLicense")?,
    tags: fields.strings("tags")?,
    providers: fields.providers()?,
    is_validated: fields.flag("isValidated", false)?,
    path: fields.optional("path")?,
    name,
    version,
    publisher,
    developers,
    transformations_count: 0,
    total_deps_count: 0,
    env_deps_count: 0,
    soft_deps_count: 0,
    file_deps_count: 0,
  })
}

fn parse_transformation(value: &Value, rejected: &mut Vec<Rejected>) -> Result<Transformation, SpecError> {
  let fields = Fields::new("transformation", value)?;
  let name = fields.required("name")?;

  let input_params = lenient(rejected, "inputParams", fields.array("inputParams")?, |v, _| parse_param(v));
  let input_files = lenient(rejected, "inputFiles", fields.array("inputFiles")?, |v, _| parse_input_file(v));
  let input_file_sets = lenient(rejected, "inputFileSets", fields.array("inputFileSets")?, |v, _| {
    parse_input_file_set(v)
  });
  if input_params.is_empty() && input_files.is_empty() && input_file_sets.is_empty() {
    return Err(SpecError::EmptyProperty("transformation.inputs".to_string()));
  }

  let output_files = lenient(rejected, "outputFiles", fields.array("outputFiles")?, |v, _| parse_output_file(v));
  if output_files.is_empty() {
    return Err(SpecError::EmptyProperty("transformation.outputs".to_string()));
  }

  let sigs = signatures(&input_params, &input_files, &input_file_sets, &output_files);
  let str_params = input_params.iter().filter(|p| p.is_string()).count();

  Ok(Transformation {
    id: fields.optional("transformationID")?,
    app_id: String::new(),
    name,
    qname: fields.optional("qname")?,
    strict_signature: sigs.strict,
    relaxed_signature: sigs.relaxed,
    providers: fields.providers()?,
    input_param_count: input_params.len(),
    input_str_param_count: str_params,
    input_num_param_count: input_params.len() - str_params,
    input_opt_param_count: input_params.iter().filter(|p| p.is_optional).count(),
    input_files_count: input_files.len(),
    input_file_sets_count: input_file_sets.len(),
    output_files_count: output_files.len(),
    input_params,
    input_files,
    input_file_sets,
    output_files,
  })
}

fn parse_param(value: &Value) -> Result<InputParameter, SpecError> {
  let fields = Fields::new("inputParam", value)?;
  Ok(InputParameter {
    name: fields.required("inputName")?,
    alias: fields.required("alias")?,
    param_type: fields.required("type")?,
    is_optional: fields.flag("isOptional", true)?,
    value: fields.optional("value")?,
  })
}

fn parse_input_file(value: &Value) -> Result<InputFile, SpecError> {
  let fields = Fields::new("inputFile", value)?;
  Ok(InputFile {
    name: fields.required("inputName")?,
    alias: fields.required("alias")?,
    format: fields.required("format")?,
    is_optional: fields.flag("isOptional", true)?,
    schema: fields.optional("schema")?,
    required_path: fields.optional("requiredPath")?,
  })
}

fn parse_input_file_set(value: &Value) -> Result<InputFileSet, SpecError> {
  let fields = Fields::new("inputFileSet", value)?;
  Ok(InputFileSet {
    name: fields.required("inputName")?,
    alias: fields.required("alias")?,
    format: fields.required("format")?,
    required_path: fields.required("requiredPath")?,
    is_optional: fields.flag("isOptional", true)?,
    schema: fields.optional("schema")?,
    size: fields.integer("fileSetSize", -1)?,
  })
}

fn parse_output_file(value: &Value) -> Result<OutputFile, SpecError> {
  let fields = Fields::new("outputFile", value)?;
  Ok(OutputFile {
    name: fields.required("outputName")?,
    alias: fields.required("alias")?,
    format: fields.required("format")?,
    access_path: fields.required("accessPath")?,
    schema: fields.optional("schema")?,
  })
}

fn parse_dependencies(fields: &Fields, rejected: &mut Vec<Rejected>) -> Result<DependencySpec, SpecError> {
  let env_deps = lenient(rejected, "envDeps", fields.array("envDeps")?, |v, _| {
    let dep = Fields::new("envDep", v)?;
    Ok(EnvironmentDependency {
      name: dep.required("depName")?,
      alias: dep.required("alias")?,
      value: dep.required("value")?,
      description: dep.optional("depDesc")?,
    })
  });

  let soft_deps = lenient(rejected, "softDeps", fields.array("softDeps")?, |v, _| {
    let dep = Fields::new("softDep", v)?;
    Ok(SoftwareDependency {
      name: dep.required("depName")?,
      alias: dep.required("alias")?,
      commands: dep.required_strings("commands")?,
      description: dep.optional("depDesc")?,
      version: dep.optional("depVersion")?,
      path: dep.optional("depPath")?,
    })
  });

  let file_deps = lenient(rejected, "fileDeps", fields.array("fileDeps")?, |v, _| {
    let dep = Fields::new("fileDep", v)?;
    Ok(FileDependency {
      name: dep.required("depName")?,
      alias: dep.required("alias")?,
      path: dep.required("filePath")?,
      description: dep.optional("depDesc")?,
    })
  });

  Ok(DependencySpec {
    env_deps,
    soft_deps,
    file_deps,
  })
}

fn parse_configuration(value: &Value) -> Result<Configuration, SpecError> {
  let fields = Fields::new("config", value)?;
  let commands = fields.strings("commands")?;
  if commands.is_empty() {
    return Err(SpecError::EmptyProperty("config.commands".to_string()));
  }
  Ok(Configuration {
    name: fields.optional("confName")?,
    commands,
  })
}

fn parse_invocation(value: &Value) -> Result<InvocationCli, SpecError> {
  let fields = Fields::new("invocation", value)?;
  Ok(InvocationCli {
    name: fields.required("invName")?,
    command: fields.required("command")?,
    description: fields.optional("invDesc")?,
  })
}

fn parse_test_run(value: &Value, rejected: &mut Vec<Rejected>) -> Result<TestRun, SpecError> {
  let fields = Fields::new("testrun", value)?;
  let name = fields.required("name")?;
  let transformation = fields.required("transformation")?;

  let sample_input_params = lenient(rejected, "sampleInputParams", fields.array("sampleInputParams")?, |v, _| {
    let param = Fields::new("sampleInputParam", v)?;
    Ok(SampleInputParameter {
      alias: param.required("alias")?,
      value: param.required("value")?,
    })
  });
  let sample_input_files = lenient(rejected, "sampleInputFiles", fields.array("sampleInputFiles")?, |v, _| {
    parse_sample_input("sampleInputFile", v)
  });
  let sample_input_file_sets = lenient(
    rejected,
    "sampleInputFileSets",
    fields.array("sampleInputFileSets")?,
    |v, _| parse_sample_input("sampleInputFileSet", v),
  );
  if sample_input_params.is_empty() && sample_input_files.is_empty() && sample_input_file_sets.is_empty() {
    return Err(SpecError::EmptyProperty("testrun.inputs".to_string()));
  }

  let resulting_output_files = lenient(
    rejected,
    "resultingOutputFiles",
    fields.array("resultingOutputFiles")?,
    |v, _| {
      let output = Fields::new("sampleOutputFile", v)?;
      Ok(SampleOutputFile {
        alias: output.required("alias")?,
        output_path: output.required("outputPath")?,
      })
    },
  );
  if resulting_output_files.is_empty() {
    return Err(SpecError::EmptyProperty("testrun.outputs".to_string()));
  }

  Ok(TestRun {
    name,
    transformation,
    description: fields.optional("description")?,
    sample_input_params,
    sample_input_files,
    sample_input_file_sets,
    resulting_output_files,
  })
}

fn parse_sample_input(entity: &'static str, value: &Value) -> Result<SampleInput, SpecError> {
  let fields = Fields::new(entity, value)?;
  Ok(SampleInput {
    alias: fields.required("alias")?,
    access_path: fields.required("accessPath")?,
  })
}

/// Typed accessors over one JSON object, reporting errors as `<entity>.<key>`.
struct Fields<'a> {
  entity: &'static str,
  map: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
  fn new(entity: &'static str, value: &'a Value) -> Result<Self, SpecError> {
    match value {
      Value::Object(map) => Ok(Self { entity, map }),
      _ => Err(SpecError::InvalidType {
        path: entity.to_string(),
        expected: "an object",
      }),
    }
  }

  fn path(&self, key: &str) -> String {
    format!("{}.{}", self.entity, key)
  }

  /// Explicit nulls count as absent.
  fn get(&self, key: &str) -> Option<&'a Value> {
    self.map.get(key).filter(|v| !v.is_null())
  }

  fn invalid(&self, key: &str, expected: &'static str) -> SpecError {
    SpecError::InvalidType {
      path: self.path(key),
      expected,
    }
  }

  /// Strings are taken as-is; numbers and booleans are accepted in their text form.
  fn scalar(&self, key: &str, value: &Value) -> Result<String, SpecError> {
    match value {
      Value::String(s) => Ok(s.clone()),
      Value::Number(n) => Ok(n.to_string()),
      Value::Bool(b) => Ok(b.to_string()),
      _ => Err(self.invalid(key, "a string")),
    }
  }

  fn required(&self, key: &str) -> Result<String, SpecError> {
    let value = self
      .get(key)
      .ok_or_else(|| SpecError::PropertyNotSpecified(self.path(key)))?;
    let value = self.scalar(key, value)?;
    if value.trim().is_empty() {
      return Err(SpecError::EmptyProperty(self.path(key)));
    }
    Ok(value)
  }

  fn optional(&self, key: &str) -> Result<String, SpecError> {
    match self.get(key) {
      Some(value) => self.scalar(key, value),
      None => Ok(String::new()),
    }
  }

  fn flag(&self, key: &str, default: bool) -> Result<bool, SpecError> {
    match self.get(key) {
      None => Ok(default),
      Some(Value::Bool(b)) => Ok(*b),
      Some(Value::String(s)) if s.eq_ignore_ascii_case("true") => Ok(true),
      Some(Value::String(s)) if s.eq_ignore_ascii_case("false") => Ok(false),
      Some(_) => Err(self.invalid(key, "a boolean")),
    }
  }

  fn integer(&self, key: &str, default: i64) -> Result<i64, SpecError> {
    match self.get(key) {
      None => Ok(default),
      Some(Value::Number(n)) => n.as_i64().ok_or_else(|| self.invalid(key, "an integer")),
      Some(Value::String(s)) => s.trim().parse().map_err(|_| self.invalid(key, "an integer")),
      Some(_) => Err(self.invalid(key, "an integer")),
    }
  }

  fn array(&self, key: &str) -> Result<&'a [Value], SpecError> {
    match self.get(key) {
      None => Ok(&[]),
      Some(Value::Array(items)) => Ok(items.as_slice()),
      Some(_) => Err(self.invalid(key, "a list")),
    }
  }

  /// Nested sections report their errors under their own key.
  fn object(&self, key: &'static str) -> Result<Option<Fields<'a>>, SpecError> {
    match self.get(key) {
      None => Ok(None),
      Some(Value::Object(map)) => Ok(Some(Fields { entity: key, map })),
      Some(_) => Err(self.invalid(key, "an object")),
    }
  }

  fn strings(&self, key: &str) -> Result<Vec<String>, SpecError> {
    self.array(key)?.iter().map(|v| self.scalar(key, v)).collect()
  }

  fn required_strings(&self, key: &str) -> Result<Vec<String>, SpecError> {
    if self.get(key).is_none() {
      return Err(SpecError::PropertyNotSpecified(self.path(key)));
    }
    let values = self.strings(key)?;
    if values.is_empty() {
      return Err(SpecError::EmptyProperty(self.path(key)));
    }
    Ok(values)
  }

  fn providers(&self) -> Result<Vec<Provider>, SpecError> {
    self
      .array("providers")?
      .iter()
      .map(|v| {
        let provider = Fields::new("provider", v)?;
        let qname = provider.optional("providerQName")?;
        Ok(Provider {
          qname: if qname.is_empty() {
            DEFAULT_PROVIDER_QNAME.to_string()
          } else {
            qname
          },
          pkg_id: provider.required("pkgID")?,
        })
      })
      .collect()
  }
}
