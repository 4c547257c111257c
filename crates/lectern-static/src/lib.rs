//! Build steps that produce a deck's static bundle.
//!
//! - [`DocumentConverter`] renders the source document to one markup page.
//! - [`StylePipeline`] compiles Sass sources, vendor-prefixes and minifies.
//! - [`Packager`] zips the finished bundle.

pub mod converter;
pub mod fsutil;
pub mod package;
pub mod styles;

pub use converter::{ConvertConfig, ConvertError, ConvertResult, DocumentConverter};
pub use fsutil::{expand_globs, GlobError};
pub use package::{PackageConfig, PackageError, PackageResult, Packager};
pub use styles::{CompiledStyle, StyleConfig, StyleError, StylePipeline};
