//! Common test utilities for csv-image-dl integration tests

#[allow(dead_code)]
pub mod fixtures;

pub use fixtures::*;
