//! Catalog model: published applications and their transformations.

mod identity;
mod parse;
mod types;

pub use identity::application_id;
pub use parse::{ParsedSpec, Rejected, SpecError};
pub use types::*;
