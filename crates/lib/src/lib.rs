//! hdtapps-lib: application repository and transformation task manager
//!
//! This crate provides the building blocks of hdtapps:
//! - `spec`: the application catalog model and its validating parser
//! - `publish`: packaging, image builds and catalog storage of applications
//! - `signature`: input/output signatures used to find transformations
//! - `task`: running a transformation in a container and reporting its status

pub mod config;
pub mod consts;
pub mod error;
pub mod execute;
pub mod fetch;
pub mod materialize;
pub mod platform;
pub mod publish;
pub mod runtime;
pub mod signature;
pub mod spec;
pub mod status;
pub mod store;
pub mod task;
pub mod template;

#[cfg(test)]
mod util;

pub use error::{Error, ErrorKind};
