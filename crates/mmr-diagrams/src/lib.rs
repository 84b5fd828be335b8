//! Mermaid diagram extraction, rendering and document rewriting for mmr.
//!
//! This crate provides the per-document building blocks of a generation run:
//! - [`extract_blocks`] finds fenced mermaid blocks in markdown text
//! - [`derive_base_name`] computes a stable, filesystem-safe image name
//! - [`DiagramRenderer`] turns diagram source into an image file;
//!   [`BrowserEngine`] implements it with headless Chrome
//! - [`Replacements`] swaps rendered blocks for image references
//!
//! # Architecture
//!
//! The crate is organized into modules:
//! - [`extract`]: `DiagramBlock` and the fence scanner
//! - [`naming`]: output filename derivation
//! - [`rewrite`]: single-pass block substitution and reference formatting
//! - [`render`]: `DiagramRenderer` trait, `RenderSettings`, errors
//! - [`page`]: the standalone HTML page mermaid runs in
//! - [`engine`]: `BrowserEngine` on top of `headless_chrome`
//!
//! # Example
//!
//! ```
//! use mmr_diagrams::{Replacements, embed_reference, extract_blocks};
//!
//! let markdown = "Intro\n```mermaid\ngraph TD\n  A --> B\n```\n";
//! let blocks = extract_blocks(markdown);
//!
//! let mut replacements = Replacements::new();
//! replacements.add(&blocks[0], embed_reference("assets/mermaid/intro-0.png"));
//!
//! let rewritten = replacements.apply(markdown).unwrap();
//! assert_eq!(rewritten, "Intro\n![Diagram](assets/mermaid/intro-0.png)\n");
//! ```

mod consts;
pub mod engine;
pub mod extract;
pub mod naming;
pub mod page;
pub mod render;
pub mod rewrite;

pub use consts::DEFAULT_TIMEOUT;
pub use engine::{BrowserEngine, EngineError};
pub use extract::{DiagramBlock, extract_blocks};
pub use naming::derive_base_name;
pub use render::{DiagramFormat, DiagramRenderer, RenderError, RenderSettings, RenderedImage};
pub use rewrite::{Replacements, RewriteError, embed_reference, image_link};
