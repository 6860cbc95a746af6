//! Core utilities and types for the flare template generator.
//!
//! This crate provides fundamental types and utilities used across
//! the generator: content hashing, atomic file output and naming helpers.

mod file;
mod hash;
mod utils;

// File operations
pub use file::{OutputFile, WriteResult, list_files, remove_empty_dirs, write_atomic};
// Hashing
pub use hash::{ContentHash, Fingerprint};
// String utilities
pub use utils::{capitalize, to_camel_case, to_pascal_case, to_snake_case};
