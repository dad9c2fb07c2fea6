//! Catalog entities and their wire representation.
//!
//! Field names on the wire are camelCase and match the package specification
//! document (`app-spec.json`) as well as the stored documents.

use serde::{Deserialize, Serialize};

/// An opaque reference to a built, runnable image of an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
  #[serde(rename = "providerQName")]
  pub qname: String,
  #[serde(rename = "pkgID")]
  pub pkg_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSpec {
  pub app_info: AppInfo,
  pub transformations: Vec<Transformation>,
  pub dependencies: DependencySpec,
  pub configs: Vec<Configuration>,
  pub invocations: Invocations,
  pub test_runs: Vec<TestRun>,
}

impl ApplicationSpec {
  /// Serialize to the wire representation.
  pub fn to_document(&self) -> Result<serde_json::Value, serde_json::Error> {
    serde_json::to_value(self)
  }

  /// The invocation used to run transformations of this application.
  ///
  /// Only the first declared CLI invocation is usable.
  pub fn invocation(&self) -> Option<&InvocationCli> {
    self.invocations.cli.first()
  }

  pub fn transformation(&self, name: &str) -> Option<&Transformation> {
    self.transformations.iter().find(|t| t.name == name)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppInfo {
  #[serde(rename = "appID")]
  pub id: String,
  #[serde(rename = "appName")]
  pub name: String,
  #[serde(rename = "appVersion")]
  pub version: String,
  #[serde(rename = "appPublisher")]
  pub publisher: String,
  #[serde(rename = "appDesc")]
  pub description: String,
  #[serde(rename = "appDevelopers")]
  pub developers: Vec<String>,
  #[serde(rename = "appLicense")]
  pub license: String,
  pub tags: Vec<String>,
  pub providers: Vec<Provider>,
  pub is_validated: bool,
  /// Where the package files live once persisted; empty before.
  pub path: String,
  pub transformations_count: usize,
  pub total_deps_count: usize,
  pub env_deps_count: usize,
  pub soft_deps_count: usize,
  pub file_deps_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transformation {
  /// Assigned by the document store; empty until stored.
  #[serde(rename = "transformationID")]
  pub id: String,
  #[serde(rename = "appID")]
  pub app_id: String,
  pub name: String,
  pub qname: String,
  pub strict_signature: String,
  pub relaxed_signature: String,
  pub providers: Vec<Provider>,
  pub input_params: Vec<InputParameter>,
  pub input_files: Vec<InputFile>,
  pub input_file_sets: Vec<InputFileSet>,
  pub output_files: Vec<OutputFile>,
  pub input_param_count: usize,
  pub input_str_param_count: usize,
  pub input_num_param_count: usize,
  pub input_opt_param_count: usize,
  pub input_files_count: usize,
  pub input_file_sets_count: usize,
  pub output_files_count: usize,
}

impl Transformation {
  pub fn input_count(&self) -> usize {
    self.input_params.len() + self.input_files.len() + self.input_file_sets.len()
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputParameter {
  #[serde(rename = "inputName")]
  pub name: String,
  pub alias: String,
  pub is_optional: bool,
  /// Default or fixed value, empty when none is declared.
  pub value: String,
  #[serde(rename = "type")]
  pub param_type: String,
}

impl InputParameter {
  /// Declared types `string` and `str` are strings, everything else is numeric.
  pub fn is_string(&self) -> bool {
    matches!(self.param_type.as_str(), "string" | "str")
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputFile {
  #[serde(rename = "inputName")]
  pub name: String,
  pub alias: String,
  pub is_optional: bool,
  pub format: String,
  pub schema: String,
  pub required_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputFileSet {
  #[serde(rename = "inputName")]
  pub name: String,
  pub alias: String,
  pub is_optional: bool,
  pub format: String,
  pub schema: String,
  pub required_path: String,
  /// Expected number of files in the set, `-1` when unknown.
  #[serde(rename = "fileSetSize")]
  pub size: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputFile {
  #[serde(rename = "outputName")]
  pub name: String,
  pub alias: String,
  pub format: String,
  pub schema: String,
  pub access_path: String,
}

impl OutputFile {
  /// File name the transformation writes inside its access path.
  pub fn file_name(&self) -> String {
    format!("{}.{}", self.name, self.format)
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencySpec {
  pub env_deps: Vec<EnvironmentDependency>,
  pub soft_deps: Vec<SoftwareDependency>,
  pub file_deps: Vec<FileDependency>,
}

impl DependencySpec {
  pub fn total(&self) -> usize {
    self.env_deps.len() + self.soft_deps.len() + self.file_deps.len()
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentDependency {
  #[serde(rename = "depName")]
  pub name: String,
  pub alias: String,
  #[serde(rename = "depDesc")]
  pub description: String,
  pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftwareDependency {
  #[serde(rename = "depName")]
  pub name: String,
  pub alias: String,
  #[serde(rename = "depDesc")]
  pub description: String,
  #[serde(rename = "depVersion")]
  pub version: String,
  #[serde(rename = "depPath")]
  pub path: String,
  pub commands: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileDependency {
  #[serde(rename = "depName")]
  pub name: String,
  pub alias: String,
  #[serde(rename = "depDesc")]
  pub description: String,
  #[serde(rename = "filePath")]
  pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
  #[serde(rename = "confName")]
  pub name: String,
  pub commands: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Invocations {
  #[serde(rename = "invocationsCLI")]
  pub cli: Vec<InvocationCli>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationCli {
  #[serde(rename = "invName")]
  pub name: String,
  #[serde(rename = "invDesc")]
  pub description: String,
  pub command: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRun {
  pub name: String,
  pub description: String,
  pub transformation: String,
  pub sample_input_params: Vec<SampleInputParameter>,
  pub sample_input_files: Vec<SampleInput>,
  pub sample_input_file_sets: Vec<SampleInput>,
  pub resulting_output_files: Vec<SampleOutputFile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleInputParameter {
  pub alias: String,
  pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleInput {
  pub alias: String,
  pub access_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleOutputFile {
  pub alias: String,
  pub output_path: String,
}
