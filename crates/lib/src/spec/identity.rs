//! Deterministic application identifiers.
//!
//! The identifier doubles as the lookup key of a published application, so
//! publishing the same publisher/developers/name/version twice always lands on
//! the same record.

/// Derive the application id from its four identity fields.
///
/// Format: `<publisher>_<developers>_<name>_<version>`, where publisher, name and
/// version are lower-cased with all whitespace removed, and every developer is
/// collapsed to the first and last character of each of its words.
///
/// ```
/// use hdtapps_lib::spec::application_id;
///
/// let id = application_id("ACME Labs", &["Jane Doe".to_string()], "Mesh Tool", "1.0 beta");
/// assert_eq!(id, "acmelabs_jede_meshtool_1.0beta");
/// ```
pub fn application_id(publisher: &str, developers: &[String], name: &str, version: &str) -> String {
  let developers: String = developers.iter().map(|dev| developer_acronym(dev)).collect();
  format!(
    "{}_{}_{}_{}",
    squash(publisher),
    developers,
    squash(name),
    squash(version)
  )
}

fn squash(value: &str) -> String {
  value.chars().filter(|c| !c.is_whitespace()).collect::<String>().to_lowercase()
}

fn developer_acronym(developer: &str) -> String {
  let mut acronym = String::new();
  for part in developer.split_whitespace() {
    let mut chars = part.chars();
    if let Some(first) = chars.next() {
      acronym.push(first);
      acronym.push(chars.next_back().unwrap_or(first));
    }
  }
  acronym.to_lowercase()
}
