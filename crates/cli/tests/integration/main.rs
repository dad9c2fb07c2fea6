mod catalog_tests;
mod common;
mod submit_tests;
