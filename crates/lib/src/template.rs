//! Invocation command templating.
//!
//! An invocation command refers to a transformation's inputs through alias
//! tokens: whitespace-delimited words starting with `$`. Rendering replaces
//! every parameter alias with its bound value. File and file-set aliases are
//! delivered into the container instead, so their tokens stay as written.
//!
//! Matching is token-exact: `$n` matches the word `$n` but not `$n;` or `$nx`.
//! Every alias token in the command must name an input the transformation
//! declares, whether or not a value was supplied for it.
//!
//! # Example
//!
//! ```
//! use hdtapps_lib::template::{parse, Segment};
//!
//! let segments = parse("run.sh -n $n");
//! assert_eq!(segments, vec![
//!     Segment::Literal("run.sh -n ".to_string()),
//!     Segment::Alias("$n".to_string()),
//! ]);
//! ```

use std::collections::BTreeSet;

use thiserror::Error;
use tracing::debug;

use crate::consts::ALIAS_SIGIL;
use crate::materialize::Bindings;
use crate::spec::{ApplicationSpec, Transformation};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
  #[error("application declares no CLI invocation")]
  NoInvocation,

  #[error("invocation references undeclared alias(es): {}", .0.join(", "))]
  UnresolvedAliases(Vec<String>),
}

/// A segment of a parsed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
  /// Text passed through unchanged, including whitespace.
  Literal(String),

  /// An alias token, sigil included.
  Alias(String),
}

/// Split a command into literal text and alias tokens.
pub fn parse(command: &str) -> Vec<Segment> {
  let mut segments = Vec::new();
  let mut literal = String::new();
  let mut rest = command;

  while !rest.is_empty() {
    let word_start = rest.find(|c: char| !c.is_whitespace()).unwrap_or(rest.len());
    literal.push_str(&rest[..word_start]);
    rest = &rest[word_start..];

    let word_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
    let word = &rest[..word_end];
    if is_alias(word) {
      if !literal.is_empty() {
        segments.push(Segment::Literal(std::mem::take(&mut literal)));
      }
      segments.push(Segment::Alias(word.to_string()));
    } else {
      literal.push_str(word);
    }
    rest = &rest[word_end..];
  }

  if !literal.is_empty() {
    segments.push(Segment::Literal(literal));
  }
  segments
}

fn is_alias(word: &str) -> bool {
  word.len() > ALIAS_SIGIL.len_utf8() && word.starts_with(ALIAS_SIGIL)
}

/// Aliases of every parameter, file and file-set `transformation` declares.
fn declared_aliases(transformation: &Transformation) -> BTreeSet<&str> {
  let params = transformation.input_params.iter().map(|p| p.alias.as_str());
  let files = transformation.input_files.iter().map(|f| f.alias.as_str());
  let sets = transformation.input_file_sets.iter().map(|s| s.alias.as_str());
  params.chain(files).chain(sets).collect()
}

/// Substitute bound parameter values into `command`.
///
/// Fails with [`TemplateError::UnresolvedAliases`] if any alias token is not
/// declared by `transformation`. Declared file and file-set aliases, supplied or
/// not, are left as written.
pub fn render(command: &str, transformation: &Transformation, bindings: &Bindings) -> Result<String, TemplateError> {
  let segments = parse(command);
  let declared = declared_aliases(transformation);

  let unresolved: Vec<String> = segments
    .iter()
    .filter_map(|s| match s {
      Segment::Alias(alias) if !declared.contains(alias.as_str()) => Some(alias.clone()),
      _ => None,
    })
    .collect::<BTreeSet<_>>()
    .into_iter()
    .collect();
  if !unresolved.is_empty() {
    return Err(TemplateError::UnresolvedAliases(unresolved));
  }

  let mut rendered = String::with_capacity(command.len());
  for segment in &segments {
    match segment {
      Segment::Literal(text) => rendered.push_str(text),
      Segment::Alias(alias) => match bindings.params.get(alias) {
        Some(bound) => rendered.push_str(&bound.value),
        None => rendered.push_str(alias),
      },
    }
  }
  Ok(rendered)
}

/// Render the application's invocation for one task.
///
/// Only the first declared CLI invocation is used.
pub fn build_command(
  app: &ApplicationSpec,
  transformation: &Transformation,
  bindings: &Bindings,
) -> Result<String, TemplateError> {
  let invocation = app.invocation().ok_or(TemplateError::NoInvocation)?;
  let command = render(&invocation.command, transformation, bindings)?;
  debug!(invocation = %invocation.name, command = %command, "rendered invocation");
  Ok(command)
}
