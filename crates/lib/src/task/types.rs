//! Task submission payload.

use serde::{Deserialize, Deserializer, Serialize};

use crate::spec::Provider;

/// A request to run one transformation of one application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRequest {
  #[serde(rename = "appID")]
  pub app_id: String,
  #[serde(rename = "transformationID")]
  pub transformation_id: String,
  #[serde(default)]
  pub input_params: Vec<ParamValue>,
  #[serde(default)]
  pub input_files: Vec<FileLink>,
  #[serde(default)]
  pub input_file_sets: Vec<FileSetLink>,
  /// Preferred providers; the first one wins, falling back to the application's.
  #[serde(default)]
  pub providers: Vec<Provider>,
  /// Where output files are POSTed once the task succeeds. Empty to skip delivery.
  #[serde(default)]
  pub results_endpoint: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamValue {
  #[serde(rename = "paramType")]
  pub param_type: String,
  #[serde(deserialize_with = "scalar_string")]
  pub value: String,
}

impl ParamValue {
  pub fn new(param_type: &str, value: &str) -> Self {
    Self {
      param_type: param_type.to_string(),
      value: value.to_string(),
    }
  }

  /// Supplied type tags that bind to numeric parameters.
  pub fn is_numeric(&self) -> bool {
    const NUMERIC: [&str; 6] = ["int", "integer", "float", "double", "number", "numeric"];
    NUMERIC.iter().any(|t| self.param_type.eq_ignore_ascii_case(t))
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileLink {
  pub format: String,
  pub link: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSetLink {
  pub format: String,
  #[serde(rename = "linkToArchive")]
  pub link: String,
}

/// Accept strings, numbers and booleans as the text of a parameter value.
fn scalar_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
  match serde_json::Value::deserialize(deserializer)? {
    serde_json::Value::String(s) => Ok(s),
    serde_json::Value::Number(n) => Ok(n.to_string()),
    serde_json::Value::Bool(b) => Ok(b.to_string()),
    other => Err(serde::de::Error::custom(format!(
      "expected a string or number, found {}",
      other
    ))),
  }
}
