//! Find command implementation.
//!
//! Looks transformations up by qualified name, by a literal signature, or by
//! the shape of their inputs and outputs.

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Args;

use hdtapps_lib::spec::Transformation;
use hdtapps_lib::store::SignatureKind;

use super::Services;
use crate::output::{print_info, print_json, symbols};

#[derive(Debug, Args)]
pub struct FindArgs {
  /// Qualified transformation name
  #[arg(long, conflicts_with_all = ["signature", "params"])]
  qname: Option<String>,

  /// Literal signature, e.g. `[pi:1][fsi:1:png][fo:1:txt]`
  #[arg(long, conflicts_with = "params")]
  signature: Option<String>,

  /// Match against relaxed signatures, which ignore optional inputs
  #[arg(long)]
  relaxed: bool,

  /// Number of input parameters
  #[arg(long)]
  params: Option<usize>,

  /// Format of an input file; repeat for each file
  #[arg(long = "input-file", value_name = "FORMAT")]
  input_files: Vec<String>,

  /// Format of an input file set; repeat for each set
  #[arg(long = "input-file-set", value_name = "FORMAT")]
  input_file_sets: Vec<String>,

  /// Format of an output file; repeat for each output
  #[arg(long = "output", value_name = "FORMAT")]
  outputs: Vec<String>,

  /// Output as JSON
  #[arg(long)]
  json: bool,
}

impl FindArgs {
  fn kind(&self) -> SignatureKind {
    if self.relaxed {
      SignatureKind::Relaxed
    } else {
      SignatureKind::Strict
    }
  }

  fn has_shape(&self) -> bool {
    self.params.is_some() || !self.input_files.is_empty() || !self.input_file_sets.is_empty() || !self.outputs.is_empty()
  }
}

pub fn cmd_find(root: Option<PathBuf>, args: &FindArgs) -> Result<()> {
  if args.qname.is_none() && args.signature.is_none() && !args.has_shape() {
    bail!("Nothing to search for. Pass --qname, --signature or an input/output shape.");
  }

  let services = Services::load(root)?;
  let found = if let Some(qname) = &args.qname {
    services.publisher.find_by_qname(qname)?
  } else if let Some(signature) = &args.signature {
    services.publisher.find_by_signature(signature, args.kind())?
  } else {
    services.publisher.find_matching(
      args.params.unwrap_or(0),
      args.input_files.as_slice(),
      args.input_file_sets.as_slice(),
      args.outputs.as_slice(),
      args.kind(),
    )?
  };

  if args.json {
    return print_json(&found);
  }
  print_matches(&found);
  Ok(())
}

fn print_matches(found: &[Transformation]) {
  if found.is_empty() {
    print_info("No matching transformations.");
    return;
  }
  for t in found {
    println!("  {} {} {} {} ({})", symbols::INFO, t.qname, symbols::ARROW, t.id, t.app_id);
  }
}
