//! Slide source documents.
//!
//! A source document is Markdown with an optional YAML front-matter block.
//! This crate loads it, resolves `include::` directives under a safe-mode
//! sandbox, builds the conversion attribute set and segments the body into a
//! [`Deck`] of horizontal and vertical slides.

pub mod attributes;
mod blocks;
pub mod deck;
pub mod document;
pub mod frontmatter;
pub mod include;

pub use attributes::{AttributeSet, AttributeValue};
pub use deck::{segment, Deck, Slide};
pub use document::{ParseError, SourceDocument};
pub use frontmatter::{extract_frontmatter, Frontmatter, FrontmatterError};
pub use include::{IncludeError, IncludeResolver, SafeMode, MAX_INCLUDE_DEPTH};
