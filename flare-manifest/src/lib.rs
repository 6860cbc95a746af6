//! Configuration and variant data for the flare template generator.
//!
//! Two inputs are parsed here: the `flare-templates.toml` build configuration
//! ([`Manifest`]) and the YAML variant tables its template sets reference
//! ([`VariantTable`]).

// Miette's derive macro generates code that triggers these warnings
#![allow(unused_assignments)]

mod error;
mod manifest;
mod variants;

pub use error::{Error, Result, SourceContext};
pub use manifest::{
    DEFAULT_CONFIG_FILE, Manifest, ManifestFile, ParseContext, ProjectConfig, SourceSetConfig,
    TemplateSetConfig,
};
pub use variants::{ID_KEY, Value, VariantRow, VariantTable, VariantTableCache};
