//! Test support shared across modules.

pub mod testutil;
