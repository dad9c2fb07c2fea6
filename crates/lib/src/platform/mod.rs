//! Platform-specific paths.

pub mod paths;
