//! Structural signatures of transformations.
//!
//! A signature is a canonical string describing the shape of a transformation's
//! inputs and outputs, so consumers can find a compatible transformation by exact
//! string match instead of by name.
//!
//! # Format
//!
//! ```text
//! [pi:<params>][fi:<n>:<fmt>]...[fsi:<n>:<fmt>]...[fo:<n>:<fmt>]...
//! ```
//!
//! - `pi`: number of input parameters
//! - `fi`: input files per format, formats sorted ascending
//! - `fsi`: input file-sets per format, formats sorted ascending
//! - `fo`: output files per format, formats in order of first appearance
//!
//! Formats are grouped by exact, case-sensitive string equality.
//!
//! The *strict* signature counts every declared input. The *relaxed* signature
//! counts only required parameters and required file/file-set occurrences, so a
//! format whose occurrences are all optional still appears with a count of 0.

use std::collections::BTreeMap;

use crate::spec::{InputFile, InputFileSet, InputParameter, OutputFile};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signatures {
  pub strict: String,
  pub relaxed: String,
}

#[derive(Debug, Default, Clone, Copy)]
struct Counts {
  strict: usize,
  relaxed: usize,
}

/// Compute the strict and relaxed signatures of a transformation's shape.
pub fn signatures(
  params: &[InputParameter],
  files: &[InputFile],
  file_sets: &[InputFileSet],
  outputs: &[OutputFile],
) -> Signatures {
  let required_params = params.iter().filter(|p| !p.is_optional).count();
  let mut strict = format!("[pi:{}]", params.len());
  let mut relaxed = format!("[pi:{}]", required_params);

  let file_counts = count_sorted(files.iter().map(|f| (f.format.as_str(), f.is_optional)));
  for (format, counts) in &file_counts {
    strict.push_str(&token("fi", counts.strict, format));
    relaxed.push_str(&token("fi", counts.relaxed, format));
  }

  let set_counts = count_sorted(file_sets.iter().map(|f| (f.format.as_str(), f.is_optional)));
  for (format, counts) in &set_counts {
    strict.push_str(&token("fsi", counts.strict, format));
    relaxed.push_str(&token("fsi", counts.relaxed, format));
  }

  for (format, count) in count_in_order(outputs.iter().map(|o| o.format.as_str())) {
    let output = token("fo", count, format);
    strict.push_str(&output);
    relaxed.push_str(&output);
  }

  Signatures { strict, relaxed }
}

/// Build a signature from raw counts and format lists.
///
/// Used to turn a consumer's query into a signature that can be matched against
/// stored transformations. There is no strict/relaxed distinction: every listed
/// format occurrence counts.
pub fn query_signature<S: AsRef<str>>(
  param_count: usize,
  input_files: &[S],
  input_file_sets: &[S],
  output_files: &[S],
) -> String {
  let mut signature = format!("[pi:{}]", param_count);

  let files = count_sorted(input_files.iter().map(|f| (f.as_ref(), false)));
  for (format, counts) in &files {
    signature.push_str(&token("fi", counts.strict, format));
  }

  let sets = count_sorted(input_file_sets.iter().map(|f| (f.as_ref(), false)));
  for (format, counts) in &sets {
    signature.push_str(&token("fsi", counts.strict, format));
  }

  for (format, count) in count_in_order(output_files.iter().map(|f| f.as_ref())) {
    signature.push_str(&token("fo", count, format));
  }

  signature
}

fn token(kind: &str, count: usize, format: &str) -> String {
  format!("[{}:{}:{}]", kind, count, format)
}

/// Count format occurrences, keyed (and therefore sorted) by format.
fn count_sorted<'a>(formats: impl Iterator<Item = (&'a str, bool)>) -> BTreeMap<&'a str, Counts> {
  let mut counts: BTreeMap<&str, Counts> = BTreeMap::new();
  for (format, optional) in formats {
    let entry = counts.entry(format).or_default();
    entry.strict += 1;
    if !optional {
      entry.relaxed += 1;
    }
  }
  counts
}

/// Count format occurrences, keeping formats in order of first appearance.
fn count_in_order<'a>(formats: impl Iterator<Item = &'a str>) -> Vec<(&'a str, usize)> {
  let mut counts: Vec<(&str, usize)> = Vec::new();
  for format in formats {
    match counts.iter_mut().find(|(f, _)| *f == format) {
      Some((_, count)) => *count += 1,
      None => counts.push((format, 1)),
    }
  }
  counts
}
