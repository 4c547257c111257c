//! Source document to markup conversion.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use lectern_backends::{BackendError, BackendRegistry, DEFAULT_BACKEND};
use lectern_doc::{AttributeSet, ParseError, SafeMode, SourceDocument};

/// Configuration for converting a document.
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    /// Source document
    pub source: PathBuf,

    /// Output markup file, overwritten on every run
    pub output: PathBuf,

    /// Backend used when the document does not name one
    pub backend: Option<String>,

    /// Include sandbox profile
    pub safe_mode: SafeMode,

    /// Attribute overrides, applied after front-matter
    pub attributes: AttributeSet,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::from("slides.md"),
            output: PathBuf::from("index.html"),
            backend: None,
            safe_mode: SafeMode::Safe,
            attributes: AttributeSet::new(),
        }
    }
}

/// Result of a conversion.
#[derive(Debug)]
pub struct ConvertResult {
    /// Backend that rendered the page
    pub backend: &'static str,

    /// Number of slides, title slide included
    pub slides: usize,

    /// Total conversion time in milliseconds
    pub duration_ms: u64,

    /// Output file
    pub output: PathBuf,
}

/// Errors that can occur during conversion.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("Failed to load document: {0}")]
    Document(#[from] ParseError),

    #[error("Failed to render document: {0}")]
    Backend(#[from] BackendError),

    #[error("Failed to write output {path}: {message}")]
    WriteError { path: String, message: String },
}

/// Converts one source document into one markup page.
pub struct DocumentConverter {
    config: ConvertConfig,
    registry: BackendRegistry,
}

impl DocumentConverter {
    /// Create a converter with the built-in backends.
    pub fn new(config: ConvertConfig) -> Self {
        Self::with_registry(config, BackendRegistry::with_defaults())
    }

    pub fn with_registry(config: ConvertConfig, registry: BackendRegistry) -> Self {
        Self { config, registry }
    }

    pub fn config(&self) -> &ConvertConfig {
        &self.config
    }

    /// Convert the document and write the output file.
    pub fn convert(&self) -> Result<ConvertResult, ConvertError> {
        let start = Instant::now();

        let doc = SourceDocument::load(&self.config.source, self.config.safe_mode)?;

        let backend_name = doc
            .frontmatter
            .backend
            .as_deref()
            .or(self.config.backend.as_deref())
            .unwrap_or(DEFAULT_BACKEND);
        let backend = self.registry.get(backend_name)?;

        // Backend defaults, then front-matter, then project overrides.
        let mut attributes = backend.default_attributes();
        attributes.merge(&doc.attributes());
        attributes.merge(&self.config.attributes);
        attributes.set("backend", backend.name());
        attributes.set("safe-mode-name", self.config.safe_mode.to_string());

        let deck = doc.to_deck(&attributes);
        let html = backend.render(&deck, &attributes)?;

        if let Some(parent) = self.config.output.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.write_error(e))?;
            }
        }
        fs::write(&self.config.output, html).map_err(|e| self.write_error(e))?;

        tracing::info!(
            "Converted {} -> {} ({} backend, {} slides)",
            self.config.source.display(),
            self.config.output.display(),
            backend.name(),
            deck.slide_count()
        );

        Ok(ConvertResult {
            backend: backend.name(),
            slides: deck.slide_count(),
            duration_ms: start.elapsed().as_millis() as u64,
            output: self.config.output.clone(),
        })
    }

    fn write_error(&self, e: std::io::Error) -> ConvertError {
        ConvertError::WriteError {
            path: self.config.output.display().to_string(),
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const DECK: &str = r#"---
title: Modeling Patterns
author: Sam Speaker
revealjs_theme: night
---

## Algebraic data types

Sums and products.

### Sealed interfaces

Exhaustive `switch`.
"#;

    fn converter(dir: &std::path::Path, attributes: AttributeSet) -> DocumentConverter {
        DocumentConverter::new(ConvertConfig {
            source: dir.join("slides.md"),
            output: dir.join("index.html"),
            attributes,
            ..Default::default()
        })
    }

    #[test]
    fn converts_document_to_revealjs() {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join("slides.md"), DECK).unwrap();

        let result = converter(temp.path(), AttributeSet::new()).convert().unwrap();

        assert_eq!(result.backend, "revealjs");
        assert_eq!(result.slides, 3);
        let html = std::fs::read_to_string(temp.path().join("index.html")).unwrap();
        assert!(html.contains("Algebraic data types"));
        assert!(html.contains("dist/theme/night.css"));
    }

    #[test]
    fn conversion_is_idempotent() {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join("slides.md"), DECK).unwrap();
        let converter = converter(temp.path(), AttributeSet::new());

        converter.convert().unwrap();
        let first = std::fs::read(temp.path().join("index.html")).unwrap();
        converter.convert().unwrap();
        let second = std::fs::read(temp.path().join("index.html")).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn overrides_beat_frontmatter() {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join("slides.md"), DECK).unwrap();
        let overrides = AttributeSet::new().with("revealjs_theme", "solarized");

        converter(temp.path(), overrides).convert().unwrap();

        let html = std::fs::read_to_string(temp.path().join("index.html")).unwrap();
        assert!(html.contains("dist/theme/solarized.css"));
    }

    #[test]
    fn missing_document_fails() {
        let temp = tempdir().unwrap();

        let result = converter(temp.path(), AttributeSet::new()).convert();

        assert!(matches!(
            result,
            Err(ConvertError::Document(ParseError::NotFound(_)))
        ));
        assert!(!temp.path().join("index.html").exists());
    }

    #[test]
    fn unknown_backend_fails() {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join("slides.md"), "---\nbackend: pptx\n---\n## One\n").unwrap();

        let result = converter(temp.path(), AttributeSet::new()).convert();

        assert!(matches!(
            result,
            Err(ConvertError::Backend(BackendError::Unknown { .. }))
        ));
    }

    #[test]
    fn overwrites_previous_output() {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join("slides.md"), DECK).unwrap();
        std::fs::write(temp.path().join("index.html"), "stale").unwrap();

        converter(temp.path(), AttributeSet::new()).convert().unwrap();

        let html = std::fs::read_to_string(temp.path().join("index.html")).unwrap();
        assert!(!html.contains("stale"));
    }
}
