//! Loading source documents from disk.

use std::fs;
use std::path::{Path, PathBuf};

use crate::attributes::AttributeSet;
use crate::deck::{segment, Deck};
use crate::frontmatter::{extract_frontmatter, Frontmatter, FrontmatterError};
use crate::include::{IncludeError, IncludeResolver, SafeMode};

/// A loaded source document with includes already expanded.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Path the document was read from
    pub path: PathBuf,

    /// Parsed front-matter (default when absent)
    pub frontmatter: Frontmatter,

    /// Body with includes expanded
    pub body: String,
}

/// Errors that can occur when loading a document.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Source document not found: {0}")]
    NotFound(String),

    #[error("Failed to read {path}: {message}")]
    Read { path: String, message: String },

    #[error("Front-matter error: {0}")]
    Frontmatter(#[from] FrontmatterError),

    #[error("Include error: {0}")]
    Include(#[from] IncludeError),
}

impl SourceDocument {
    /// Read and parse a document, resolving includes under `mode`.
    ///
    /// The base directory of the include sandbox is the document's directory.
    pub fn load(path: &Path, mode: SafeMode) -> Result<Self, ParseError> {
        if !path.is_file() {
            return Err(ParseError::NotFound(path.display().to_string()));
        }

        let source = fs::read_to_string(path).map_err(|e| ParseError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let base_dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        Self::parse(&source, path, &base_dir, mode)
    }

    /// Parse document text as if it had been read from `path`.
    pub fn parse(
        source: &str,
        path: &Path,
        base_dir: &Path,
        mode: SafeMode,
    ) -> Result<Self, ParseError> {
        let (frontmatter, content) = extract_frontmatter(source)?;
        let resolver = IncludeResolver::new(base_dir, mode)?;
        let body = resolver.resolve(content, base_dir)?;

        Ok(Self {
            path: path.to_path_buf(),
            frontmatter: frontmatter.unwrap_or_default(),
            body,
        })
    }

    /// Front-matter attributes, with title, subtitle and author included.
    pub fn attributes(&self) -> AttributeSet {
        let fm = &self.frontmatter;
        let mut attrs = fm.attributes.clone();
        if let Some(title) = &fm.title {
            attrs.set("doctitle", title.as_str());
        }
        if let Some(subtitle) = &fm.subtitle {
            attrs.set("subtitle", subtitle.as_str());
        }
        if let Some(author) = &fm.author {
            attrs.set("author", author.as_str());
        }
        attrs
    }

    /// Substitute attribute references and segment the body into slides.
    pub fn to_deck(&self, attributes: &AttributeSet) -> Deck {
        let body = attributes.substitute(&self.body);
        let (preamble, slides) = segment(&body);

        Deck {
            title: self.frontmatter.title.clone(),
            subtitle: self.frontmatter.subtitle.clone(),
            author: self.frontmatter.author.clone(),
            preamble,
            slides,
        }
    }
}
