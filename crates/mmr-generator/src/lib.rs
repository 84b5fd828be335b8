//! Generation runs for mmr.
//!
//! This crate ties the per-document pieces of `mmr-diagrams` into a run over
//! a whole docs tree:
//!
//! - [`DocumentWalker`] discovers markdown documents in a stable order
//! - [`Generator`] renders every mermaid block, rewrites documents and keeps
//!   going past per-diagram failures
//! - [`GenerationManifest`] is the JSON report written at the end of a run
//!
//! # Example
//!
//! ```ignore
//! use mmr_config::Config;
//! use mmr_generator::Generator;
//!
//! let config = Config::load(None, None)?;
//! let summary = Generator::new(&config).run()?;
//! println!("{} images", summary.manifest.generated_images);
//! ```

mod generator;
mod manifest;
mod walker;

pub use generator::{
    GenerateError, GenerateErrorKind, GenerationSummary, Generator, Phase, render_settings,
};
pub use manifest::{GenerationManifest, ManifestError, REPORT_FILENAME, RenderResult};
pub use walker::{DOCUMENT_EXTENSION, DocumentWalker, Documents, WalkError};
