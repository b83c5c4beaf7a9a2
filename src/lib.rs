//! stylelens library crate
//!
//! Exposes the check pipeline so the binary and integration tests can drive
//! it with any host tree and any reply generator.

pub mod cache;
pub mod check;
pub mod config;
pub mod host;
pub mod llm;
pub mod prompt;
pub mod sources;
pub mod util;
