//! Markdown Format Converter
//!
//! Converts Markdown source text into three representations, entirely in
//! process and without I/O:
//!
//! - sanitized HTML, packaged as a complete document
//! - a typed JSON document tree
//! - normalized plain text
//!
//! # Architecture
//!
//! Data flows one way: source text → document nodes → rendered output →
//! packaged [`ConversionResult`].
//!
//! - `security`: input guards, filename/URL sanitization, malicious-source detection
//! - `parser`: line-oriented block scanner producing [`DocumentNode`]s
//! - `inline`: inline span tokenizer used by the renderers
//! - `html_renderer` / `html_sanitizer`: markup generation and the html5ever allow-list pass
//! - `tree_renderer`: JSON document tree
//! - `text_renderer`: plain-text rendition
//! - `converter`: per-format orchestration and packaging
//! - `rate_limit`: sliding-window request gate for callers
//! - `content_hash`, `stats`: BLAKE3 fingerprints and document statistics
//! - `charset`: byte decoding for file input
//! - `config`: TOML configuration
//!
//! # Example
//!
//! ```rust
//! use markdown_format_converter::{ConversionOptions, OutputFormat, convert};
//!
//! let result = convert(
//!     "# Title\n\nSome *text*",
//!     OutputFormat::Html,
//!     &ConversionOptions::default(),
//! );
//! assert!(result.success);
//! assert!(result.content.contains("<em>text</em>"));
//! ```

pub mod charset;
pub mod config;
pub mod content_hash;
pub mod converter;
pub mod document;
pub mod error;
pub mod html_renderer;
pub mod html_sanitizer;
pub mod inline;
#[cfg(feature = "cli")]
pub mod logging;
pub mod parser;
pub mod rate_limit;
pub mod security;
pub mod stats;
pub mod text_renderer;
pub mod tree_renderer;

pub use converter::{
    ConversionOptions, ConversionResult, FormatConverter, OutputFormat, convert,
};
pub use document::{DocumentNode, ListItem, ParsedDocument};
pub use error::{ConversionError, ValidationError};
pub use parser::parse_document;
pub use rate_limit::RateLimiter;
